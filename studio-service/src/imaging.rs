//! Post-processing for generated images: center-crop to the requested aspect
//! ratio, then resize to its exact pixel dimensions.
//!
//! Everything here is synchronous and CPU-bound; async callers go through
//! `tokio::task::spawn_blocking`.

use crate::catalog::{self, AspectRatio};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImagingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),
}

/// Region of the source image kept by the center crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Compute the centered crop that gives `source` the aspect ratio of `target`.
///
/// A wider source loses symmetric margins on the left and right, a taller one
/// on the top and bottom. Matching aspects keep the full frame.
pub fn crop_window(source: (u32, u32), target: (u32, u32)) -> CropWindow {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        let width = ((src_h as f64 * tgt_aspect) as u32).clamp(1, src_w);
        CropWindow {
            x: (src_w - width) / 2,
            y: 0,
            width,
            height: src_h,
        }
    } else if src_aspect < tgt_aspect {
        let height = ((src_w as f64 / tgt_aspect) as u32).clamp(1, src_h);
        CropWindow {
            x: 0,
            y: (src_h - height) / 2,
            width: src_w,
            height,
        }
    } else {
        CropWindow {
            x: 0,
            y: 0,
            width: src_w,
            height: src_h,
        }
    }
}

/// Crop and resize an in-memory image to `ratio`, returning an RGB image.
pub fn fit_image(img: DynamicImage, ratio: &AspectRatio) -> DynamicImage {
    let img = match img {
        DynamicImage::ImageRgb8(_) => img,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    };

    let window = crop_window((img.width(), img.height()), (ratio.width, ratio.height));
    let cropped = if window.width == img.width() && window.height == img.height() {
        img
    } else {
        img.crop_imm(window.x, window.y, window.width, window.height)
    };

    cropped.resize_exact(ratio.width, ratio.height, FilterType::Lanczos3)
}

/// Rewrite the PNG at `path` in place so it matches the aspect-ratio `key`
/// (unknown keys mean 1:1, 1024×1024). Returns the final dimensions.
pub fn fit_file_to_aspect_ratio(path: &Path, key: &str) -> Result<(u32, u32), ImagingError> {
    let ratio = catalog::aspect_ratio(key);

    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| ImagingError::Decode(format!("{}: {}", path.display(), e)))?;

    let fitted = fit_image(img, &ratio);
    fitted
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| ImagingError::Encode(format!("{}: {}", path.display(), e)))?;

    tracing::info!(
        width = ratio.width,
        height = ratio.height,
        aspect_ratio = %ratio.key,
        "Image resized to target aspect ratio"
    );

    Ok((fitted.width(), fitted.height()))
}

/// Decode any supported raster format and re-encode it as PNG.
pub fn to_png(bytes: &[u8]) -> Result<Vec<u8>, ImagingError> {
    let img = image::load_from_memory(bytes).map_err(|e| ImagingError::Decode(e.to_string()))?;
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(|e| ImagingError::Encode(e.to_string()))?;
    Ok(out.into_inner())
}
