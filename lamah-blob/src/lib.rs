//! # lamah-blob: media upload infrastructure for trivia content
//!
//! `lamah-blob` turns an extracted media file into a durable public URL. It
//! owns everything between "we have some bytes and a filename" and "the
//! object lives in storage":
//!
//! - **Pre-processing**: images are resized and re-encoded to JPEG, large
//!   audio/video gets a best-effort compression pass
//! - **Strategy selection**: small payloads go through one proxied request,
//!   large ones through a pre-signed direct PUT
//! - **Naming**: storage keys are always generated, never caller-controlled
//! - **Control planes**: an HTTP client for the upload API and a direct S3
//!   implementation, both behind [`ControlPlane`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lamah_blob::prelude::*;
//!
//! # async fn run() -> UploadResult<()> {
//! let control_plane = HttpControlPlane::new(HttpControlPlaneConfig::new("https://admin.lamah.app"))?;
//! let uploader = AssetUploader::new(control_plane, UploadConfig::default())
//!     .with_compressor(FfmpegCompressor::new());
//!
//! let asset = MediaAsset::new("lion.jpg", std::fs::read("lion.jpg")?);
//! let ctx = RecordContext::new(Credential::bearer("token"));
//!
//! match uploader.upload(&asset, MediaRole::QuestionImage, &ctx).await {
//!     UploadOutcome::Uploaded { url } => println!("stored at {}", url),
//!     other => println!("not stored: {:?}", other),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Upload failures never escape [`AssetUploader::upload`]; they come back as
//! [`UploadOutcome::Failed`] so one bad file cannot sink a batch.

mod cache;
mod compress;
mod config;
mod error;
mod http;
mod imaging;
pub mod mime;
mod receipt;
mod s3;
pub mod store;
mod types;
mod uploader;

pub use cache::{CacheConfig, CacheStats, MediaFetcher, MediaUrlCache};
pub use compress::{compress_or_original, Compression, FfmpegCompressor, MediaCompressor, NoCompression};
pub use config::{env_megabytes_or, env_var_or, HttpControlPlaneConfig, ImageConfig, UploadConfig};
pub use error::{UploadError, UploadResult};
pub use http::HttpControlPlane;
pub use imaging::{prepare_image, reencode, ImageProcessing, ImageProfile, ProcessedImage, REENCODED_MIME};
pub use mime::{MediaKind, MimeTable};
pub use receipt::{ProcessingInfo, UploadOutcome, UploadReceipt};
pub use s3::{S3ControlPlane, S3ControlPlaneConfig};
pub use store::{
    ControlPlane, DefaultNameStrategy, FileNameStrategy, PresignRequest, PresignedUpload, ProxiedUpload,
    UploadStrategy,
};
pub use types::{Credential, MediaAsset, MediaRole, RecordContext};
pub use uploader::AssetUploader;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        AssetUploader, ControlPlane, Credential, FfmpegCompressor, HttpControlPlane, HttpControlPlaneConfig,
        MediaAsset, MediaCompressor, MediaKind, MediaRole, MediaUrlCache, NoCompression, RecordContext,
        UploadConfig, UploadError, UploadOutcome, UploadResult,
    };
}
