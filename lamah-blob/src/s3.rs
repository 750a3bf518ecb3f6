use std::env;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::{presigning::PresigningConfig, primitives::ByteStream, Client};
use bytes::Bytes;
use tracing::debug;

use crate::{
    store::{ControlPlane, PresignRequest, PresignedUpload, ProxiedUpload},
    Credential, UploadError, UploadResult,
};

/// S3-compatible storage settings
#[derive(Debug, Clone)]
pub struct S3ControlPlaneConfig {
    pub bucket: String,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Public URLs are `<public_base_url>/<key>`
    pub public_base_url: String,
    pub presign_expiry: Duration,
    pub force_path_style: bool,
}

impl S3ControlPlaneConfig {
    pub fn new<S: Into<String>>(bucket: S, region: S, public_base_url: S) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            endpoint_url: None,
            access_key_id: String::new(),
            secret_access_key: String::new(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            presign_expiry: Duration::from_secs(15 * 60),
            force_path_style: false,
        }
    }

    pub fn from_env() -> UploadResult<Self> {
        fn get_env(key: &str) -> UploadResult<String> {
            env::var(key).map_err(|_| UploadError::invalid(format!("{} environment variable required", key)))
        }

        let bucket = get_env("LAMAH_S3_BUCKET")?;
        let region = get_env("LAMAH_S3_REGION")?;
        let public_base_url = env::var("LAMAH_S3_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("https://{}.s3.{}.amazonaws.com", bucket, region));

        let mut config = Self::new(bucket, region, public_base_url).with_credentials(
            get_env("LAMAH_S3_ACCESS_KEY_ID")?,
            get_env("LAMAH_S3_SECRET_ACCESS_KEY")?,
        );
        if let Ok(endpoint) = env::var("LAMAH_S3_ENDPOINT_URL") {
            config = config.with_endpoint(endpoint);
        }
        Ok(config)
    }

    pub fn with_credentials<S: Into<String>>(mut self, access_key_id: S, secret_access_key: S) -> Self {
        self.access_key_id = access_key_id.into();
        self.secret_access_key = secret_access_key.into();
        self
    }

    /// Custom endpoint for S3-compatible stores; switches to path-style addressing
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint_url: S) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self.force_path_style = true;
        self
    }

    pub fn with_presign_expiry(mut self, expiry: Duration) -> Self {
        self.presign_expiry = expiry;
        self
    }

    /// Public URL of an object key
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    /// Object key behind a public URL, if it belongs to this bucket
    pub fn key_from_url(&self, url: &str) -> Option<String> {
        let key = url
            .strip_prefix(&self.public_base_url)?
            .trim_start_matches('/')
            .split(['?', '#'])
            .next()?;
        if key.is_empty() {
            None
        } else {
            Some(key.to_string())
        }
    }
}

/// Control plane talking to S3 directly, for trusted back-office runs.
/// Credentials presented by callers are not checked here.
#[derive(Clone)]
pub struct S3ControlPlane {
    client: Client,
    http: reqwest::Client,
    config: S3ControlPlaneConfig,
}

impl S3ControlPlane {
    pub async fn new(config: S3ControlPlaneConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "lamah",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint.clone());
        }
        let aws_config = loader.load().await;

        let client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(config.force_path_style)
                .build(),
        );

        Self {
            client,
            http: reqwest::Client::new(),
            config,
        }
    }

    pub async fn from_env() -> UploadResult<Self> {
        Ok(Self::new(S3ControlPlaneConfig::from_env()?).await)
    }

    pub fn config(&self) -> &S3ControlPlaneConfig {
        &self.config
    }

    fn key(folder: &str, file_name: &str) -> String {
        format!("{}/{}", folder.trim_matches('/'), file_name)
    }
}

#[async_trait]
impl ControlPlane for S3ControlPlane {
    async fn upload(&self, request: ProxiedUpload, _credential: &Credential) -> UploadResult<String> {
        let key = Self::key(&request.folder, &request.file_name);
        debug!(bucket = %self.config.bucket, %key, "put_object");
        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .content_type(&request.mime_type)
            .body(ByteStream::from(request.data))
            .send()
            .await
            .map_err(UploadError::backend)?;
        Ok(self.config.public_url(&key))
    }

    async fn presign(&self, request: PresignRequest, _credential: &Credential) -> UploadResult<PresignedUpload> {
        let key = Self::key(&request.folder, &request.file_name);
        let presigning = PresigningConfig::expires_in(self.config.presign_expiry).map_err(UploadError::backend)?;
        let presigned = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .content_type(&request.mime_type)
            .presigned(presigning)
            .await
            .map_err(UploadError::backend)?;
        Ok(PresignedUpload {
            upload_url: presigned.uri().to_string(),
            final_url: self.config.public_url(&key),
        })
    }

    async fn put_presigned(&self, upload_url: &str, mime_type: &str, data: Bytes) -> UploadResult<()> {
        let response = self
            .http
            .put(upload_url)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(data)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::rejected(status.as_u16(), body.trim().to_string()));
        }
        Ok(())
    }

    async fn delete(&self, url: &str, _credential: &Credential) -> UploadResult<()> {
        let key = self
            .config
            .key_from_url(url)
            .ok_or_else(|| UploadError::invalid(format!("{} is not an object of this bucket", url)))?;
        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .send()
            .await
            .map_err(UploadError::backend)?;
        Ok(())
    }
}
