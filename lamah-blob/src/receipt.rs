use serde::{Deserialize, Serialize};

use crate::{store::UploadStrategy, MediaRole};

/// Receipt returned after successfully storing an asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub url: String,
    pub role: MediaRole,
    /// Name the asset had in the archive
    pub source_filename: String,
    /// Generated storage filename
    pub stored_filename: String,
    pub folder: String,
    pub mime_type: String,
    pub strategy: UploadStrategy,
    pub original_size: u64,
    pub final_size: u64,
    pub processing: ProcessingInfo,
}

/// What happened to the bytes before upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ProcessingInfo {
    /// Uploaded as extracted
    Untouched,
    /// Image resized and re-encoded to JPEG
    Reencoded { width: u32, height: u32 },
    /// Audio/video compressed
    Compressed,
    /// Processing was attempted but the original bytes were kept
    Fallback { reason: String },
}

/// Outcome of one (record, role) media reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum UploadOutcome {
    Uploaded { url: String },
    Missing { filename: String },
    Failed { filename: String, reason: String },
}

impl UploadOutcome {
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Uploaded { url } => Some(url),
            _ => None,
        }
    }

    pub fn is_uploaded(&self) -> bool {
        matches!(self, Self::Uploaded { .. })
    }
}

impl From<UploadReceipt> for UploadOutcome {
    fn from(receipt: UploadReceipt) -> Self {
        Self::Uploaded { url: receipt.url }
    }
}
