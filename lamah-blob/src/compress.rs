use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::{mime, MediaAsset, UploadError, UploadResult};

/// Best-effort audio/video compression
#[async_trait]
pub trait MediaCompressor: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Produce a smaller encoding of the asset in the same container format.
    /// Errors are never fatal to an upload.
    async fn compress(&self, asset: &MediaAsset) -> UploadResult<Bytes>;
}

/// Outcome of the compression step
#[derive(Debug, Clone)]
pub enum Compression {
    Compressed { data: Bytes, original_size: u64 },
    /// Upload the original bytes. `reason` is `None` when compression was
    /// not attempted at all.
    Original { reason: Option<String> },
}

impl Compression {
    pub fn is_compressed(&self) -> bool {
        matches!(self, Self::Compressed { .. })
    }
}

/// Compress audio/video above `threshold_bytes`, falling back to the
/// original bytes when the compressor fails or does not shrink the payload
pub async fn compress_or_original(
    compressor: &dyn MediaCompressor,
    asset: &MediaAsset,
    threshold_bytes: u64,
) -> Compression {
    if !asset.is_audio_or_video() || asset.size() <= threshold_bytes {
        return Compression::Original { reason: None };
    }

    match compressor.compress(asset).await {
        Ok(data) if (data.len() as u64) < asset.size() => {
            debug!(
                compressor = compressor.name(),
                filename = %asset.filename,
                before = asset.size(),
                after = data.len(),
                "compressed media asset"
            );
            Compression::Compressed {
                data,
                original_size: asset.size(),
            }
        }
        Ok(data) => Compression::Original {
            reason: Some(format!(
                "compressed output ({} bytes) is not smaller than the original ({} bytes)",
                data.len(),
                asset.size()
            )),
        },
        Err(e) => {
            warn!(
                compressor = compressor.name(),
                filename = %asset.filename,
                error = %e,
                "compression failed, uploading original bytes"
            );
            Compression::Original {
                reason: Some(e.to_string()),
            }
        }
    }
}

/// Compressor that never compresses
#[derive(Debug, Clone, Default)]
pub struct NoCompression;

#[async_trait]
impl MediaCompressor for NoCompression {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn compress(&self, _asset: &MediaAsset) -> UploadResult<Bytes> {
        Err(UploadError::unsupported("compression disabled"))
    }
}

/// Compressor backed by an external `ffmpeg` binary
#[derive(Debug, Clone)]
pub struct FfmpegCompressor {
    binary: PathBuf,
    audio_bitrate: String,
    video_crf: u8,
}

impl Default for FfmpegCompressor {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
            audio_bitrate: "96k".to_string(),
            video_crf: 30,
        }
    }
}

impl FfmpegCompressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary<P: Into<PathBuf>>(mut self, binary: P) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_audio_bitrate<S: Into<String>>(mut self, bitrate: S) -> Self {
        self.audio_bitrate = bitrate.into();
        self
    }

    pub fn with_video_crf(mut self, crf: u8) -> Self {
        self.video_crf = crf;
        self
    }

    /// Encoder arguments for an extension; the container stays the same so
    /// the asset's MIME type is still valid afterwards
    pub fn codec_args(&self, ext: &str) -> UploadResult<Vec<String>> {
        let args: Vec<&str> = match ext {
            "mp4" | "mov" | "mkv" => vec![
                "-c:v",
                "libx264",
                "-preset",
                "veryfast",
                "-crf",
                "CRF",
                "-c:a",
                "aac",
                "-b:a",
                "BITRATE",
            ],
            "mp3" => vec!["-c:a", "libmp3lame", "-b:a", "BITRATE"],
            "m4a" | "aac" => vec!["-c:a", "aac", "-b:a", "BITRATE"],
            "ogg" => vec!["-c:a", "libvorbis", "-b:a", "BITRATE"],
            other => {
                return Err(UploadError::unsupported(format!(
                    "no ffmpeg profile for .{} files",
                    other
                )))
            }
        };
        let crf = self.video_crf.to_string();
        Ok(args
            .into_iter()
            .map(|arg| match arg {
                "CRF" => crf.clone(),
                "BITRATE" => self.audio_bitrate.clone(),
                other => other.to_string(),
            })
            .collect())
    }
}

#[async_trait]
impl MediaCompressor for FfmpegCompressor {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn compress(&self, asset: &MediaAsset) -> UploadResult<Bytes> {
        let ext = mime::extension(&asset.filename)
            .ok_or_else(|| UploadError::unsupported("asset has no file extension"))?;
        let codec_args = self.codec_args(&ext)?;

        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join(format!("input.{}", ext));
        let output = scratch.path().join(format!("output.{}", ext));
        tokio::fs::write(&input, &asset.data).await?;

        let result = tokio::process::Command::new(&self.binary)
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-y")
            .arg("-i")
            .arg(&input)
            .args(&codec_args)
            .arg(&output)
            .output()
            .await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(UploadError::compression(format!(
                "ffmpeg exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }

        let data = tokio::fs::read(&output).await?;
        Ok(Bytes::from(data))
    }
}
