/// Pixel-budget guard: keeps bitmaps under platform pixel ceilings.

use crate::rendering::Bitmap;
use image::imageops::{self, FilterType};
use log::warn;

/// Some mobile engines fail reading pixel data above this size.
pub const MAX_CANVAS_PIXELS: u64 = 4096 * 4096;

/// Blob conversion is unreliable above this size on mobile engines.
pub const MAX_BLOB_PIXELS: u64 = 2048 * 2048;

/// Dimensions that fit `width * height` under `ceiling` with the same aspect.
///
/// Returns the input when it is already within budget. Each side is floored
/// and clamped to at least one pixel; when clamping one side would push the
/// product over `ceiling`, the other side gives way.
pub fn fit_within(width: u32, height: u32, ceiling: u64) -> (u32, u32) {
    let pixels = u64::from(width) * u64::from(height);
    if width == 0 || height == 0 || pixels <= ceiling {
        return (width, height);
    }
    let scale = (ceiling as f64 / pixels as f64).sqrt();
    let w = ((f64::from(width) * scale).floor() as u32).max(1);
    let h = ((f64::from(height) * scale).floor() as u32).max(1);
    let h = h.min(side_budget(ceiling, w));
    let w = w.min(side_budget(ceiling, h));
    (w, h)
}

/// Longest side that keeps `other * side` within `ceiling` (at least 1).
fn side_budget(ceiling: u64, other: u32) -> u32 {
    u32::try_from((ceiling / u64::from(other)).max(1)).unwrap_or(u32::MAX)
}

/// Downsample `bitmap` with a single resample when it exceeds `ceiling`.
pub fn ensure_within_limit(bitmap: Bitmap, ceiling: u64) -> Bitmap {
    let (w, h) = (bitmap.width(), bitmap.height());
    let (new_w, new_h) = fit_within(w, h, ceiling);
    if (new_w, new_h) == (w, h) {
        return bitmap;
    }
    warn!("Downsampling {}x{} capture to {}x{} (ceiling {} px)", w, h, new_w, new_h, ceiling);
    Bitmap::from_image(imageops::resize(bitmap.as_image(), new_w, new_h, FilterType::Triangle))
}

/// Resample to an arbitrary pixel density (used by capture backends).
pub fn scale_by(bitmap: Bitmap, factor: f32) -> Bitmap {
    if bitmap.is_empty() || (factor - 1.0).abs() < f32::EPSILON || factor <= 0.0 {
        return bitmap;
    }
    let w = ((bitmap.width() as f32 * factor).round() as u32).max(1);
    let h = ((bitmap.height() as f32 * factor).round() as u32).max(1);
    Bitmap::from_image(imageops::resize(bitmap.as_image(), w, h, FilterType::Nearest))
}
