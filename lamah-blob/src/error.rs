use thiserror::Error;

/// Result type for upload operations
pub type UploadResult<T> = Result<T, UploadError>;

/// Errors that can occur while preparing or uploading a media asset
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Invalid request: {message}")]
    Invalid { message: String },

    #[error("Operation not supported: {message}")]
    Unsupported { message: String },

    #[error("Control plane rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Upload failed: {reason}")]
    UploadFailed { reason: String },

    #[error("Compression failed: {reason}")]
    Compression { reason: String },

    #[error("Image processing failed: {source}")]
    Image {
        #[from]
        source: image::ImageError,
    },

    #[error("HTTP error: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl UploadError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    /// Create an invalid request error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create an unsupported operation error
    pub fn unsupported<S: Into<String>>(message: S) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Create an error for a non-2xx control-plane response
    pub fn rejected<S: Into<String>>(status: u16, message: S) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Create an upload failed error
    pub fn upload_failed<S: Into<String>>(reason: S) -> Self {
        Self::UploadFailed {
            reason: reason.into(),
        }
    }

    /// Create a compression error
    pub fn compression<S: Into<String>>(reason: S) -> Self {
        Self::Compression {
            reason: reason.into(),
        }
    }
}
