use std::path::PathBuf;
use std::time::Duration;

use lamah_blob::{env_megabytes_or, env_var_or};

use crate::{ImportError, ImportResult};

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Upper bound for `ImportConfig::upload_concurrency`
pub const MAX_UPLOAD_CONCURRENCY: usize = 5;

/// Configuration for archive extraction
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Archives larger than this are rejected before any byte is read
    pub max_archive_bytes: u64,

    /// Archives larger than this are spooled to a temporary file in chunks
    pub streaming_threshold_bytes: u64,

    /// Chunk size for the spooling reader
    pub chunk_size_bytes: usize,

    /// Directory for the spool file; the system temp dir when unset
    pub spool_dir: Option<PathBuf>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_archive_bytes: 2 * GIB,
            streaming_threshold_bytes: 100 * MIB,
            chunk_size_bytes: 8 * MIB as usize,
            spool_dir: None,
        }
    }
}

impl ExtractorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_archive_bytes: env_megabytes_or("LAMAH_MAX_ARCHIVE_MB", defaults.max_archive_bytes),
            streaming_threshold_bytes: env_megabytes_or(
                "LAMAH_STREAMING_THRESHOLD_MB",
                defaults.streaming_threshold_bytes,
            ),
            chunk_size_bytes: defaults.chunk_size_bytes,
            spool_dir: std::env::var("LAMAH_IMPORT_SPOOL_DIR").ok().map(PathBuf::from),
        }
    }

    /// Reject settings the extractor cannot honour
    pub fn validate(&self) -> ImportResult<()> {
        if self.max_archive_bytes == 0 {
            return Err(ImportError::config("max_archive_bytes must be greater than zero"));
        }
        if self.streaming_threshold_bytes > self.max_archive_bytes {
            return Err(ImportError::config(format!(
                "streaming threshold ({} bytes) exceeds the archive limit ({} bytes)",
                self.streaming_threshold_bytes, self.max_archive_bytes
            )));
        }
        if self.chunk_size_bytes == 0 {
            return Err(ImportError::config("chunk_size_bytes must be greater than zero"));
        }
        Ok(())
    }

    pub fn with_max_archive_bytes(mut self, bytes: u64) -> Self {
        self.max_archive_bytes = bytes;
        self
    }

    pub fn with_streaming_threshold(mut self, bytes: u64) -> Self {
        self.streaming_threshold_bytes = bytes;
        self
    }

    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size_bytes = bytes.max(1);
        self
    }

    pub fn with_spool_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.spool_dir = Some(dir.into());
        self
    }
}

/// Configuration for a batch import run
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Records between forced pauses
    pub batch_size: usize,

    /// Length of the pause after each batch
    pub batch_pause: Duration,

    /// Uploads in flight per record (1 = sequential)
    pub upload_concurrency: usize,

    /// Capacity of the parsed-record channel
    pub channel_capacity: usize,

    pub extractor: ExtractorConfig,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_pause: Duration::from_millis(100),
            upload_concurrency: 1,
            channel_capacity: 16,
            extractor: ExtractorConfig::default(),
        }
    }
}

impl ImportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `LAMAH_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self::default()
            .with_batch_size(env_var_or("LAMAH_IMPORT_BATCH_SIZE", defaults.batch_size))
            .with_batch_pause(Duration::from_millis(env_var_or(
                "LAMAH_IMPORT_BATCH_PAUSE_MS",
                defaults.batch_pause.as_millis() as u64,
            )))
            .with_upload_concurrency(env_var_or(
                "LAMAH_IMPORT_UPLOAD_CONCURRENCY",
                defaults.upload_concurrency,
            ))
            .with_extractor(ExtractorConfig::from_env())
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause = pause;
        self
    }

    /// Clamped to `1..=5`
    pub fn with_upload_concurrency(mut self, concurrency: usize) -> Self {
        self.upload_concurrency = concurrency.clamp(1, MAX_UPLOAD_CONCURRENCY);
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn with_extractor(mut self, extractor: ExtractorConfig) -> Self {
        self.extractor = extractor;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ImportConfig::default();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.batch_pause, Duration::from_millis(100));
        assert_eq!(config.upload_concurrency, 1);
        assert_eq!(config.extractor.max_archive_bytes, 2 * 1024 * 1024 * 1024);
        assert_eq!(config.extractor.streaming_threshold_bytes, 100 * 1024 * 1024);
        assert_eq!(config.extractor.chunk_size_bytes, 8 * 1024 * 1024);
    }

    #[test]
    fn test_upload_concurrency_is_clamped() {
        assert_eq!(ImportConfig::new().with_upload_concurrency(0).upload_concurrency, 1);
        assert_eq!(ImportConfig::new().with_upload_concurrency(3).upload_concurrency, 3);
        assert_eq!(ImportConfig::new().with_upload_concurrency(64).upload_concurrency, 5);
    }

    #[test]
    fn test_zero_sizes_are_bumped() {
        let config = ImportConfig::new().with_batch_size(0).with_channel_capacity(0);
        assert_eq!((config.batch_size, config.channel_capacity), (1, 1));
        assert_eq!(ExtractorConfig::new().with_chunk_size(0).chunk_size_bytes, 1);
    }

    #[test]
    fn test_extractor_validation() {
        assert!(ExtractorConfig::default().validate().is_ok());

        let inverted = ExtractorConfig::default()
            .with_max_archive_bytes(10 * MIB)
            .with_streaming_threshold(20 * MIB);
        assert!(matches!(inverted.validate(), Err(ImportError::Config { .. })));

        let mut zero_chunk = ExtractorConfig::default();
        zero_chunk.chunk_size_bytes = 0;
        assert!(matches!(zero_chunk.validate(), Err(ImportError::Config { .. })));

        let no_limit = ExtractorConfig::default().with_max_archive_bytes(0).with_streaming_threshold(0);
        assert!(matches!(no_limit.validate(), Err(ImportError::Config { .. })));
    }
}
