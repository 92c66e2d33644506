//! Bio-data Export
//!
//! Turns a rendered bio-data preview into a downloadable PNG, JPEG or A4 PDF
//! without any server round trip.
//!
//! # Pipeline
//!
//! - **Capture**: render the preview subtree to a bitmap ([`capture::Capturer`])
//! - **Guard**: downsample bitmaps above the platform pixel ceiling
//! - **Crop**: trim everything outside the bounding box of visible content
//! - **Encode**: PNG/JPEG with a data-URL fallback when the primary path yields nothing
//! - **Paginate**: lay the image over one or more A4 pages
//!
//! # Example
//!
//! ```no_run
//! use biodata_export::capture::{CaptureTarget, MemoryCapturer};
//! use biodata_export::download::DirectorySink;
//! use biodata_export::{ExportConfig, Exporter, ImageMime};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut capturer = MemoryCapturer::new();
//! capturer.mount_file("#preview", "preview.png")?;
//!
//! let exporter = Exporter::new(capturer, DirectorySink::new("out"), ExportConfig::default());
//! let target = CaptureTarget::new("#preview");
//! let outcome = exporter.export_to_pdf(Some(&target), Some("biodata-document.pdf"));
//! assert!(outcome.success, "{:?}", outcome.error);
//! let outcome = exporter.export_to_image(Some(&target), ImageMime::Png, None);
//! assert!(outcome.success);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod error;
pub use error::{Error, Result};

pub mod capture;

// Headless Chrome capture backend
#[cfg(feature = "cdp")]
pub mod cdp;

pub mod download;
pub mod export;
pub mod pdf;
pub mod platform;
pub mod print;
pub mod rendering;

pub use export::Exporter;
pub use pdf::PageGeometry;
pub use platform::{PlatformProfile, SettleTiming};
pub use rendering::encode::ImageMime;
pub use rendering::{Bitmap, Rgb};

/// Options for a single capture call
///
/// Built from [`ExportConfig::capture_options`]; the pixel ratio comes from
/// the active [`PlatformProfile`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureOptions {
    /// Target quality in 0..=1; below 1 a backend may capture lossily
    pub quality: f32,
    /// Color painted behind transparent regions and treated as background when cropping
    pub background_color: Rgb,
    /// Device pixels per CSS pixel
    pub pixel_ratio: f32,
    /// Bypass cached resources while capturing
    pub cache_bust: bool,
}

impl CaptureOptions {
    /// JPEG quality (1..=100) for backends that can capture lossily, or
    /// `None` when `quality` asks for a lossless capture.
    pub fn lossy_quality(&self) -> Option<u8> {
        if self.quality >= 1.0 {
            None
        } else {
            Some(rendering::encode::jpeg_quality(Some(self.quality)))
        }
    }
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self { quality: 1.0, background_color: Rgb::WHITE, pixel_ratio: 1.0, cache_bust: true }
    }
}

/// Viewport dimensions used by browser-backed capturers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1280, height: 2000 }
    }
}

/// Configuration for the export pipeline
///
/// Every field has a default, so a JSON file only needs the keys it changes:
///
/// ```
/// let cfg: biodata_export::ExportConfig =
///     serde_json::from_str(r##"{"background_color": "#fafafa"}"##).unwrap();
/// assert_eq!(cfg.jpeg_quality, 0.95);
/// assert_eq!(cfg.background_color.to_string(), "#fafafa");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Capture quality in 0..=1
    pub quality: f32,
    /// Background color of the preview
    pub background_color: Rgb,
    /// Bypass cached resources while capturing
    pub cache_bust: bool,
    /// Density and pixel ceilings of the target platform
    pub profile: PlatformProfile,
    /// Physical page size for PDF exports
    pub page: PageGeometry,
    /// JPEG quality in 0..=1 for PDF pages and JPEG images
    pub jpeg_quality: f32,
    /// Per-channel tolerance when matching the background color
    pub tolerance: u8,
    /// Wait applied after switching the preview to full zoom
    pub settle: SettleTiming,
    /// Viewport for browser-backed capturers
    pub viewport: Viewport,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            quality: 1.0,
            background_color: Rgb::WHITE,
            cache_bust: true,
            profile: PlatformProfile::default(),
            page: PageGeometry::a4(),
            jpeg_quality: 0.95,
            tolerance: rendering::crop::BG_TOLERANCE,
            settle: SettleTiming::default(),
            viewport: Viewport::default(),
        }
    }
}

impl ExportConfig {
    /// Defaults with the platform profile chosen from a user agent string.
    pub fn for_user_agent(user_agent: &str) -> Self {
        Self { profile: PlatformProfile::from_user_agent(user_agent), ..Default::default() }
    }

    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("Failed to read {}: {}", path.display(), e)))?;
        let cfg: ExportConfig = serde_json::from_str(&text)
            .map_err(|e| Error::ConfigError(format!("Failed to parse {}: {}", path.display(), e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.quality) {
            return Err(Error::ConfigError(format!("quality must be within 0..=1, got {}", self.quality)));
        }
        if !(self.jpeg_quality > 0.0 && self.jpeg_quality <= 1.0) {
            return Err(Error::ConfigError(format!("jpeg_quality must be within (0, 1], got {}", self.jpeg_quality)));
        }
        if !(self.profile.pixel_ratio.is_finite() && self.profile.pixel_ratio > 0.0) {
            return Err(Error::ConfigError(format!("pixel_ratio must be positive, got {}", self.profile.pixel_ratio)));
        }
        if self.profile.canvas_pixel_ceiling == 0 || self.profile.blob_pixel_ceiling == Some(0) {
            return Err(Error::ConfigError("pixel ceilings must be non-zero".into()));
        }
        if !(self.page.width_mm > 0.0 && self.page.height_mm > 0.0) {
            return Err(Error::ConfigError("page dimensions must be positive".into()));
        }
        Ok(())
    }

    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            quality: self.quality,
            background_color: self.background_color,
            pixel_ratio: self.profile.pixel_ratio,
            cache_bust: self.cache_bust,
        }
    }
}

/// Result reported to the caller of an export; never an `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExportOutcome {
    pub fn ok() -> Self {
        Self { success: true, error: None }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, error: Some(message.into()) }
    }
}
