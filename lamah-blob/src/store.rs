use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{mime::MediaKind, Credential, MediaRole, UploadResult};

/// Storage control plane: the only component that talks to object storage
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Single proxied request carrying the bytes; returns the durable URL
    async fn upload(&self, request: ProxiedUpload, credential: &Credential) -> UploadResult<String>;

    /// Ask for a pre-signed direct-upload URL
    async fn presign(&self, request: PresignRequest, credential: &Credential) -> UploadResult<PresignedUpload>;

    /// PUT bytes to a pre-signed URL. The URL itself carries the authorization.
    async fn put_presigned(&self, upload_url: &str, mime_type: &str, data: Bytes) -> UploadResult<()>;

    /// Remove a previously uploaded object by its public URL
    async fn delete(&self, url: &str, credential: &Credential) -> UploadResult<()>;
}

/// Payload of a proxied upload
#[derive(Debug, Clone)]
pub struct ProxiedUpload {
    pub folder: String,
    pub file_name: String,
    pub mime_type: String,
    pub data: Bytes,
}

/// Body of a pre-signed URL request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignRequest {
    pub file_name: String,
    pub folder: String,
    pub mime_type: String,
}

/// Pre-signed upload target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUpload {
    pub upload_url: String,
    pub final_url: String,
}

/// How the bytes reach storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStrategy {
    Proxied,
    Presigned,
}

impl UploadStrategy {
    /// Decided from the final payload size alone
    pub fn for_size(size: u64, direct_upload_threshold: u64) -> Self {
        if size <= direct_upload_threshold {
            Self::Proxied
        } else {
            Self::Presigned
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proxied => "proxied",
            Self::Presigned => "presigned",
        }
    }
}

/// Storage naming: the caller never controls the object key
pub trait FileNameStrategy: Send + Sync {
    /// Folder an asset of `role` is stored under
    fn folder(&self, role: MediaRole, kind: Option<MediaKind>) -> String;

    /// Fresh filename with the given extension (no dot)
    fn file_name(&self, role: MediaRole, extension: &str) -> String;
}

/// `<role-prefix>_<unix-millis>_<8-char token>.<ext>` under
/// `questions/{images,audio,video}` or `categories/images`
#[derive(Debug, Clone, Default)]
pub struct DefaultNameStrategy {
    folder_prefix: Option<String>,
}

impl DefaultNameStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_folder_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_matches('/');
        self.folder_prefix = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }
}

impl FileNameStrategy for DefaultNameStrategy {
    fn folder(&self, role: MediaRole, kind: Option<MediaKind>) -> String {
        let folder = match (role, kind) {
            (MediaRole::CategoryImage, _) => "categories/images",
            (_, Some(MediaKind::Audio)) => "questions/audio",
            (_, Some(MediaKind::Video)) => "questions/video",
            (MediaRole::QuestionAudio | MediaRole::AnswerAudio, None) => "questions/audio",
            (MediaRole::QuestionVideo | MediaRole::AnswerVideo, None) => "questions/video",
            _ => "questions/images",
        };
        match &self.folder_prefix {
            Some(prefix) => format!("{}/{}", prefix, folder),
            None => folder.to_string(),
        }
    }

    fn file_name(&self, role: MediaRole, extension: &str) -> String {
        let millis = chrono::Utc::now().timestamp_millis();
        let token = uuid::Uuid::new_v4().simple().to_string();
        format!("{}_{}_{}.{}", role.file_prefix(), millis, &token[..8], extension)
    }
}
