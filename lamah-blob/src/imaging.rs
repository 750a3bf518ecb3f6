use std::io::Cursor;

use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageOutputFormat};

use crate::{config::ImageConfig, MediaRole, UploadResult};

/// MIME type of every re-encoded image
pub const REENCODED_MIME: &str = "image/jpeg";

/// How an image is fitted to its target box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageProfile {
    /// Crop to fill a fixed box (thumbnail roles)
    Cover { width: u32, height: u32 },
    /// Fit inside a bounding box: no upscale, no crop, aspect ratio kept
    Contain { max_width: u32, max_height: u32 },
}

impl ImageProfile {
    pub fn for_role(role: MediaRole, config: &ImageConfig) -> Self {
        if role.is_thumbnail() {
            Self::Cover {
                width: config.thumbnail_width,
                height: config.thumbnail_height,
            }
        } else {
            Self::Contain {
                max_width: config.max_width,
                max_height: config.max_height,
            }
        }
    }

    /// Output dimensions for a source of `width` x `height`. Never larger
    /// than the source in either direction.
    pub fn target_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        match *self {
            Self::Contain { max_width, max_height } => {
                if width <= max_width && height <= max_height {
                    return (width, height);
                }
                let scale = f64::min(
                    max_width as f64 / width as f64,
                    max_height as f64 / height as f64,
                );
                (scaled(width, scale), scaled(height, scale))
            }
            Self::Cover { width: box_w, height: box_h } => {
                // Shrink the box (keeping its aspect) until it fits the source
                let scale = f64::min(
                    1.0,
                    f64::min(width as f64 / box_w as f64, height as f64 / box_h as f64),
                );
                (scaled(box_w, scale), scaled(box_h, scale))
            }
        }
    }
}

fn scaled(value: u32, scale: f64) -> u32 {
    ((value as f64 * scale).round() as u32).max(1)
}

/// A successfully re-encoded image
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub original_width: u32,
    pub original_height: u32,
}

/// Outcome of image pre-processing
#[derive(Debug, Clone)]
pub enum ImageProcessing {
    Reencoded(ProcessedImage),
    /// Decoding or encoding failed; the original bytes should be uploaded
    Original { reason: String },
}

/// Resize and re-encode, falling back to the original bytes on any error.
/// CPU-bound: call from `spawn_blocking`.
pub fn prepare_image(data: &[u8], profile: ImageProfile, quality: u8) -> ImageProcessing {
    match reencode(data, profile, quality) {
        Ok(processed) => ImageProcessing::Reencoded(processed),
        Err(e) => ImageProcessing::Original {
            reason: e.to_string(),
        },
    }
}

/// Decode, fit to `profile` and encode as JPEG at `quality`
pub fn reencode(data: &[u8], profile: ImageProfile, quality: u8) -> UploadResult<ProcessedImage> {
    let img = image::load_from_memory(data)?;
    let (original_width, original_height) = img.dimensions();
    let (width, height) = profile.target_dimensions(original_width, original_height);

    let fitted = match profile {
        ImageProfile::Contain { .. } if (width, height) == (original_width, original_height) => img,
        ImageProfile::Contain { .. } => img.resize_exact(width, height, FilterType::Triangle),
        ImageProfile::Cover { .. } => img.resize_to_fill(width, height, FilterType::Triangle),
    };

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(fitted.to_rgb8());
    let mut buffer = Cursor::new(Vec::new());
    rgb.write_to(&mut buffer, ImageOutputFormat::Jpeg(quality))?;

    Ok(ProcessedImage {
        data: buffer.into_inner(),
        width: rgb.width(),
        height: rgb.height(),
        original_width,
        original_height,
    })
}
