use std::time::Duration;

const MIB: u64 = 1024 * 1024;

/// Configuration for asset uploads
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Payloads at or below this size go through the proxied single request;
    /// anything larger uses a pre-signed direct PUT
    pub direct_upload_threshold_bytes: u64,

    /// Audio/video above this size gets a best-effort compression pass
    pub compression_threshold_bytes: u64,

    /// Image resize/re-encode rules
    pub image: ImageConfig,

    /// Folder prefix prepended to every storage folder (e.g. an environment name)
    pub folder_prefix: Option<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            direct_upload_threshold_bytes: 30 * MIB,
            compression_threshold_bytes: 20 * MIB,
            image: ImageConfig::default(),
            folder_prefix: None,
        }
    }
}

impl UploadConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `LAMAH_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            direct_upload_threshold_bytes: env_megabytes_or(
                "LAMAH_DIRECT_UPLOAD_THRESHOLD_MB",
                defaults.direct_upload_threshold_bytes,
            ),
            compression_threshold_bytes: env_megabytes_or(
                "LAMAH_COMPRESSION_THRESHOLD_MB",
                defaults.compression_threshold_bytes,
            ),
            image: ImageConfig {
                quality: env_var_or("LAMAH_IMAGE_QUALITY", defaults.image.quality),
                ..defaults.image
            },
            folder_prefix: std::env::var("LAMAH_FOLDER_PREFIX").ok(),
        }
    }

    /// Set the proxied/pre-signed threshold
    pub fn with_direct_upload_threshold(mut self, bytes: u64) -> Self {
        self.direct_upload_threshold_bytes = bytes;
        self
    }

    /// Set the audio/video compression threshold
    pub fn with_compression_threshold(mut self, bytes: u64) -> Self {
        self.compression_threshold_bytes = bytes;
        self
    }

    /// Set image rules
    pub fn with_image(mut self, image: ImageConfig) -> Self {
        self.image = image;
        self
    }

    /// Prefix every storage folder
    pub fn with_folder_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.folder_prefix = Some(prefix.into());
        self
    }
}

/// Image resize and re-encode rules
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// JPEG quality (1-100) used for every re-encoded image
    pub quality: u8,

    /// Bounding box for question/answer images ("contain", never upscaled)
    pub max_width: u32,
    pub max_height: u32,

    /// Fixed box for thumbnail roles ("cover", cropped to fill)
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            quality: 85,
            max_width: 1280,
            max_height: 1280,
            thumbnail_width: 400,
            thumbnail_height: 400,
        }
    }
}

impl ImageConfig {
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    pub fn with_max_box(mut self, width: u32, height: u32) -> Self {
        self.max_width = width;
        self.max_height = height;
        self
    }

    pub fn with_thumbnail_box(mut self, width: u32, height: u32) -> Self {
        self.thumbnail_width = width;
        self.thumbnail_height = height;
        self
    }
}

/// Configuration for the HTTP control plane client
#[derive(Debug, Clone)]
pub struct HttpControlPlaneConfig {
    pub base_url: String,
    pub upload_path: String,
    pub presign_path: String,
    pub delete_path: String,
    pub request_timeout: Duration,
}

impl HttpControlPlaneConfig {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            upload_path: "/api/upload".to_string(),
            presign_path: "/api/upload/presign".to_string(),
            delete_path: "/api/upload/delete".to_string(),
            request_timeout: Duration::from_secs(300),
        }
    }

    /// `LAMAH_CONTROL_PLANE_URL` is required, the rest fall back to defaults
    pub fn from_env() -> Result<Self, crate::UploadError> {
        let base_url = std::env::var("LAMAH_CONTROL_PLANE_URL").map_err(|_| {
            crate::UploadError::invalid("LAMAH_CONTROL_PLANE_URL environment variable required")
        })?;
        let defaults = Self::new(base_url);
        Ok(Self {
            request_timeout: Duration::from_secs(env_var_or(
                "LAMAH_CONTROL_PLANE_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
            ..defaults
        })
    }

    pub fn with_paths<S: Into<String>>(mut self, upload: S, presign: S, delete: S) -> Self {
        self.upload_path = upload.into();
        self.presign_path = presign.into();
        self.delete_path = delete.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Read an environment variable, falling back to `default` when it is
/// missing or does not parse
pub fn env_var_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

/// Byte size configured in whole megabytes; saturates instead of overflowing
pub fn env_megabytes_or(key: &str, default_bytes: u64) -> u64 {
    env_var_or(key, default_bytes / MIB).saturating_mul(MIB)
}
