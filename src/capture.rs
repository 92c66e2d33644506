//! Capture backends: render a preview subtree into a [`Bitmap`].

use crate::rendering::raster::scale_by;
use crate::rendering::Bitmap;
use crate::{CaptureOptions, Error, Result};
use log::debug;
use std::collections::HashMap;
use std::path::Path;

/// Identifies the root of the subtree to capture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaptureTarget {
    /// CSS selector (or key) of the preview root
    pub selector: String,
}

impl CaptureTarget {
    pub fn new(selector: impl Into<String>) -> Self {
        Self { selector: selector.into() }
    }
}

/// Core trait for capture backends.
///
/// Implementations render the target at `options.pixel_ratio` and flatten
/// transparent regions over `options.background_color`. A target that cannot
/// be resolved fails with [`Error::PreviewNotReady`].
pub trait Capturer {
    fn capture(&self, target: &CaptureTarget, options: &CaptureOptions) -> Result<Bitmap>;

    /// Whether this backend can capture at all in the current environment.
    fn is_available(&self) -> bool {
        true
    }
}

/// Backend serving pre-rendered 1x bitmaps keyed by selector.
#[derive(Debug, Clone, Default)]
pub struct MemoryCapturer {
    mounted: HashMap<String, Bitmap>,
}

impl MemoryCapturer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a rendered preview under `selector`.
    pub fn mount(&mut self, selector: impl Into<String>, bitmap: Bitmap) {
        self.mounted.insert(selector.into(), bitmap);
    }

    pub fn unmount(&mut self, selector: &str) -> Option<Bitmap> {
        self.mounted.remove(selector)
    }

    /// Convenience: mount a PNG or JPEG file.
    pub fn mount_file(&mut self, selector: impl Into<String>, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| Error::CaptureFailed(format!("Failed to read {}: {}", path.display(), e)))?;
        self.mount(selector, Bitmap::decode(&bytes)?);
        Ok(())
    }
}

impl Capturer for MemoryCapturer {
    fn capture(&self, target: &CaptureTarget, options: &CaptureOptions) -> Result<Bitmap> {
        let source = self.mounted.get(&target.selector).ok_or(Error::PreviewNotReady)?;
        if source.is_empty() {
            return Err(Error::CaptureFailed(format!("'{}' rendered with no area", target.selector)));
        }
        debug!(
            "Capturing '{}' ({}x{}) at {}x",
            target.selector,
            source.width(),
            source.height(),
            options.pixel_ratio
        );
        let scaled = scale_by(source.clone(), options.pixel_ratio);
        Ok(scaled.flatten_onto(options.background_color))
    }
}
