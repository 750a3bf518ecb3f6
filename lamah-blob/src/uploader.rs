use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, instrument, warn};

use crate::{
    cache::MediaUrlCache,
    compress::{compress_or_original, Compression, MediaCompressor, NoCompression},
    imaging::{prepare_image, ImageProcessing, ImageProfile, REENCODED_MIME},
    mime::{self, MimeTable},
    receipt::{ProcessingInfo, UploadOutcome, UploadReceipt},
    store::{ControlPlane, DefaultNameStrategy, FileNameStrategy, PresignRequest, ProxiedUpload, UploadStrategy},
    Credential, MediaAsset, MediaRole, RecordContext, UploadConfig, UploadError, UploadResult,
};

/// Final bytes of an asset after pre-processing
struct Payload {
    data: Bytes,
    mime_type: String,
    extension: String,
    processing: ProcessingInfo,
}

/// Turns extracted media into durable URLs
pub struct AssetUploader {
    control_plane: Arc<dyn ControlPlane>,
    compressor: Arc<dyn MediaCompressor>,
    names: Arc<dyn FileNameStrategy>,
    cache: Option<Arc<MediaUrlCache>>,
    config: UploadConfig,
}

impl AssetUploader {
    /// Create an uploader without compression
    pub fn new<C: ControlPlane + 'static>(control_plane: C, config: UploadConfig) -> Self {
        Self::from_arc(Arc::new(control_plane), config)
    }

    /// Create an uploader over a shared control plane
    pub fn from_arc(control_plane: Arc<dyn ControlPlane>, config: UploadConfig) -> Self {
        let names = match &config.folder_prefix {
            Some(prefix) => DefaultNameStrategy::new().with_folder_prefix(prefix.clone()),
            None => DefaultNameStrategy::new(),
        };
        Self {
            control_plane,
            compressor: Arc::new(NoCompression),
            names: Arc::new(names),
            cache: None,
            config,
        }
    }

    pub fn with_compressor<M: MediaCompressor + 'static>(mut self, compressor: M) -> Self {
        self.compressor = Arc::new(compressor);
        self
    }

    pub fn with_name_strategy<N: FileNameStrategy + 'static>(mut self, names: N) -> Self {
        self.names = Arc::new(names);
        self
    }

    /// Share a media cache; deleted URLs are evicted from it
    pub fn with_cache(mut self, cache: Arc<MediaUrlCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Upload one asset for one role. Never fails: errors become
    /// `UploadOutcome::Failed` carrying the underlying message.
    #[instrument(skip(self, asset, ctx), fields(filename = %asset.filename, role = %role, record = ?ctx.record_index))]
    pub async fn upload(&self, asset: &MediaAsset, role: MediaRole, ctx: &RecordContext) -> UploadOutcome {
        match self.try_upload(asset, role, ctx).await {
            Ok(receipt) => UploadOutcome::from(receipt),
            Err(e) => {
                warn!(error = %e, "media upload failed");
                UploadOutcome::Failed {
                    filename: asset.filename.clone(),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Upload one asset, returning the full receipt
    pub async fn try_upload(
        &self,
        asset: &MediaAsset,
        role: MediaRole,
        ctx: &RecordContext,
    ) -> UploadResult<UploadReceipt> {
        let payload = self.prepare(asset, role).await?;
        let final_size = payload.data.len() as u64;
        let strategy = UploadStrategy::for_size(final_size, self.config.direct_upload_threshold_bytes);
        let folder = self.names.folder(role, asset.kind);
        let stored_filename = self.names.file_name(role, &payload.extension);

        debug!(
            strategy = strategy.as_str(),
            %folder,
            %stored_filename,
            original_size = asset.size(),
            final_size,
            "uploading media asset"
        );

        let url = match strategy {
            UploadStrategy::Proxied => {
                self.control_plane
                    .upload(
                        ProxiedUpload {
                            folder: folder.clone(),
                            file_name: stored_filename.clone(),
                            mime_type: payload.mime_type.clone(),
                            data: payload.data,
                        },
                        &ctx.credential,
                    )
                    .await?
            }
            UploadStrategy::Presigned => {
                let presigned = self
                    .control_plane
                    .presign(
                        PresignRequest {
                            file_name: stored_filename.clone(),
                            folder: folder.clone(),
                            mime_type: payload.mime_type.clone(),
                        },
                        &ctx.credential,
                    )
                    .await?;
                self.control_plane
                    .put_presigned(&presigned.upload_url, &payload.mime_type, payload.data)
                    .await?;
                presigned.final_url
            }
        };

        if url.is_empty() {
            return Err(UploadError::upload_failed("control plane returned an empty URL"));
        }

        info!(%url, strategy = strategy.as_str(), "media asset uploaded");
        Ok(UploadReceipt {
            url,
            role,
            source_filename: asset.filename.clone(),
            stored_filename,
            folder,
            mime_type: payload.mime_type,
            strategy,
            original_size: asset.size(),
            final_size,
            processing: payload.processing,
        })
    }

    /// Best-effort delete of a stored asset; failures are logged, never returned
    #[instrument(skip(self, credential))]
    pub async fn delete(&self, url: &str, credential: &Credential) {
        if let Some(cache) = &self.cache {
            cache.remove(url);
        }
        match self.control_plane.delete(url, credential).await {
            Ok(()) => debug!("media asset deleted"),
            Err(e) => warn!(error = %e, "failed to delete media asset"),
        }
    }

    async fn prepare(&self, asset: &MediaAsset, role: MediaRole) -> UploadResult<Payload> {
        if asset.is_image() {
            return self.prepare_image(asset, role).await;
        }

        let (data, processing) =
            match compress_or_original(self.compressor.as_ref(), asset, self.config.compression_threshold_bytes).await {
                Compression::Compressed { data, .. } => (data, ProcessingInfo::Compressed),
                Compression::Original { reason: Some(reason) } => {
                    (asset.data.clone(), ProcessingInfo::Fallback { reason })
                }
                Compression::Original { reason: None } => (asset.data.clone(), ProcessingInfo::Untouched),
            };
        Ok(Payload {
            data,
            mime_type: asset.mime_type.clone(),
            extension: Self::original_extension(asset),
            processing,
        })
    }

    async fn prepare_image(&self, asset: &MediaAsset, role: MediaRole) -> UploadResult<Payload> {
        let profile = ImageProfile::for_role(role, &self.config.image);
        let quality = self.config.image.quality;
        let source = asset.data.clone();

        let processed = tokio::task::spawn_blocking(move || prepare_image(&source, profile, quality))
            .await
            .map_err(UploadError::backend)?;

        Ok(match processed {
            ImageProcessing::Reencoded(image) => Payload {
                processing: ProcessingInfo::Reencoded {
                    width: image.width,
                    height: image.height,
                },
                data: Bytes::from(image.data),
                mime_type: REENCODED_MIME.to_string(),
                extension: "jpg".to_string(),
            },
            ImageProcessing::Original { reason } => {
                warn!(filename = %asset.filename, %reason, "image processing failed, uploading original bytes");
                Payload {
                    data: asset.data.clone(),
                    mime_type: asset.mime_type.clone(),
                    extension: Self::original_extension(asset),
                    processing: ProcessingInfo::Fallback { reason },
                }
            }
        })
    }

    fn original_extension(asset: &MediaAsset) -> String {
        mime::extension(&asset.filename)
            .or_else(|| MimeTable::extension_for(&asset.mime_type).map(str::to_string))
            .unwrap_or_else(|| "bin".to_string())
    }
}
