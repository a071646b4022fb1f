use std::io::Cursor;

use image::imageops::FilterType;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageProxyError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Blocked host: {0}")]
    BlockedHost(String),

    #[error("Image conversion error: {0}")]
    ConversionError(String),
}

/// Requests at or below this width take the thumbnail path: no fetch timeout,
/// a higher quality ceiling and a fixed balanced encoder effort.
pub const THUMBNAIL_MAX_WIDTH: u32 = 100;

pub const THUMBNAIL_QUALITY_CEILING: u8 = 95;
pub const STANDARD_QUALITY_CEILING: u8 = 90;
pub const DEFAULT_QUALITY: u8 = 80;
pub const THUMBNAIL_ENCODE_EFFORT: i32 = 4;

// Refuse to decode anything over 50 megapixels
const MAX_INPUT_PIXELS: u64 = 50_000_000;

pub fn is_thumbnail(width: Option<u32>) -> bool {
    matches!(width, Some(w) if w <= THUMBNAIL_MAX_WIDTH)
}

/// Clamp the requested quality to the ceiling of the processing path.
pub fn effective_quality(quality: u8, thumbnail: bool) -> u8 {
    let ceiling = if thumbnail {
        THUMBNAIL_QUALITY_CEILING
    } else {
        STANDARD_QUALITY_CEILING
    };
    quality.clamp(1, ceiling)
}

/// Decode `data`, resize to `width` if given (aspect ratio preserved, never
/// upscaled), and re-encode as lossy WebP at `quality` with the given encoder
/// effort (0-6).
pub fn transform_to_webp(
    data: &[u8],
    width: Option<u32>,
    quality: u8,
    effort: i32,
) -> Result<Vec<u8>, ImageProxyError> {
    let reader = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageProxyError::ConversionError(format!("Failed to read image: {}", e)))?;

    let (src_width, src_height) = reader
        .into_dimensions()
        .map_err(|e| ImageProxyError::ConversionError(format!("Failed to read image dimensions: {}", e)))?;

    if src_width as u64 * src_height as u64 > MAX_INPUT_PIXELS {
        return Err(ImageProxyError::ConversionError(format!(
            "Image too large: {}x{}",
            src_width, src_height
        )));
    }

    let img = image::load_from_memory(data)
        .map_err(|e| ImageProxyError::ConversionError(format!("Failed to decode image: {}", e)))?;

    let img = resize_image(img, width);

    encode_webp(&img, quality, effort)
}

fn resize_image(img: DynamicImage, width: Option<u32>) -> DynamicImage {
    let target = match width {
        Some(w) if w > 0 && w < img.width() => w,
        // Absent or at least as wide as the source: serve as-is
        _ => return img,
    };

    let ratio = target as f64 / img.width() as f64;
    let target_height = ((img.height() as f64 * ratio).round() as u32).max(1);

    img.resize_exact(target, target_height, FilterType::Lanczos3)
}

fn encode_webp(img: &DynamicImage, quality: u8, effort: i32) -> Result<Vec<u8>, ImageProxyError> {
    // The webp encoder only accepts raw RGB8/RGBA8 pixels
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let encoder = webp::Encoder::from_rgba(rgba.as_raw(), width, height);

    let mut config = webp::WebPConfig::new()
        .map_err(|_| ImageProxyError::ConversionError("Failed to initialize WebP config".to_string()))?;
    config.quality = quality as f32;
    config.method = effort.clamp(0, 6);

    let encoded = encoder
        .encode_advanced(&config)
        .map_err(|e| ImageProxyError::ConversionError(format!("WebP encoding failed: {:?}", e)))?;

    Ok(encoded.to_vec())
}
