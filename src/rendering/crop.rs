//! Background-aware cropping.
//!
//! A capture of a scaled preview usually carries empty margins around the
//! document. The cropper scans the bitmap once, finds the tight bounding box
//! of pixels that differ from the background, and trims the rest.

use crate::rendering::{Bitmap, Rgb};
use image::{imageops, Rgba};
use log::debug;

/// Per-channel tolerance for treating a pixel as background (absorbs
/// anti-aliasing fringes).
pub const BG_TOLERANCE: u8 = 5;

/// Pixels with alpha below this are background regardless of color.
pub const ALPHA_THRESHOLD: u8 = 128;

/// Inclusive pixel rectangle containing all foreground pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

/// Classifies pixels as background or foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundMatcher {
    pub color: Rgb,
    pub tolerance: u8,
}

impl BackgroundMatcher {
    pub fn new(color: Rgb) -> Self {
        Self { color, tolerance: BG_TOLERANCE }
    }

    pub fn with_tolerance(mut self, tolerance: u8) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn is_background(&self, px: Rgba<u8>) -> bool {
        let [r, g, b, a] = px.0;
        a < ALPHA_THRESHOLD
            || (r.abs_diff(self.color.r) <= self.tolerance
                && g.abs_diff(self.color.g) <= self.tolerance
                && b.abs_diff(self.color.b) <= self.tolerance)
    }
}

/// Bounding box of non-background pixels, or `None` for an all-background bitmap.
pub fn content_bounds(bitmap: &Bitmap, matcher: &BackgroundMatcher) -> Option<BoundingBox> {
    let mut bounds: Option<BoundingBox> = None;
    for (x, y, px) in bitmap.as_image().enumerate_pixels() {
        if matcher.is_background(*px) {
            continue;
        }
        bounds = Some(match bounds {
            None => BoundingBox { min_x: x, min_y: y, max_x: x, max_y: y },
            Some(b) => BoundingBox {
                min_x: b.min_x.min(x),
                min_y: b.min_y.min(y),
                max_x: b.max_x.max(x),
                max_y: b.max_y.max(y),
            },
        });
    }
    bounds
}

/// Crop to content. A blank capture is returned unchanged rather than
/// reduced to nothing.
pub fn crop_to_content(bitmap: Bitmap, matcher: &BackgroundMatcher) -> Bitmap {
    let Some(bounds) = content_bounds(&bitmap, matcher) else {
        debug!("No foreground pixels in {}x{} capture; skipping crop", bitmap.width(), bitmap.height());
        return bitmap;
    };
    if bounds.width() == bitmap.width() && bounds.height() == bitmap.height() {
        return bitmap;
    }
    debug!(
        "Cropping {}x{} capture to {}x{} at ({}, {})",
        bitmap.width(),
        bitmap.height(),
        bounds.width(),
        bounds.height(),
        bounds.min_x,
        bounds.min_y
    );
    let view = imageops::crop_imm(bitmap.as_image(), bounds.min_x, bounds.min_y, bounds.width(), bounds.height());
    Bitmap::from_image(view.to_image())
}
