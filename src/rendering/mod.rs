//! Raster post-processing: pixel budgets, content cropping and encoding

pub mod crop;
pub mod encode;
pub mod raster;

use crate::{Error, Result};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An opaque RGB color, written as `#rrggbb` in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb { r: 255, g: 255, b: 255 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Rgb::WHITE
    }
}

impl FromStr for Rgb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::ConfigError(format!("invalid hex color '{}'", s)));
        }
        let v = u32::from_str_radix(hex, 16)
            .map_err(|e| Error::ConfigError(format!("invalid hex color '{}': {}", s, e)))?;
        Ok(Rgb::new((v >> 16) as u8, (v >> 8) as u8, v as u8))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A captured RGBA bitmap in device pixels.
///
/// Every pipeline stage consumes a `Bitmap` and returns a new one; pixels
/// are never edited in place once a capture has been produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    image: RgbaImage,
}

impl Bitmap {
    /// A bitmap filled with a single color.
    pub fn filled(width: u32, height: u32, color: Rgba<u8>) -> Self {
        Self { image: RgbaImage::from_pixel(width, height, color) }
    }

    /// Wrap raw RGBA bytes; `None` when the buffer does not match the dimensions.
    pub fn from_raw(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(width, height, rgba).map(Self::from_image)
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Decode a PNG or JPEG byte stream.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| Error::CaptureFailed(format!("Failed to decode capture: {}", e)))?;
        Ok(Self::from_image(img.to_rgba8()))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Total pixel count, computed without overflow.
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.image.get_pixel(x, y)
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Composite this bitmap over an opaque background, producing a fully
    /// opaque copy.
    pub fn flatten_onto(&self, background: Rgb) -> Bitmap {
        let mut out = RgbaImage::from_pixel(self.width(), self.height(), background.to_rgba());
        for (dst, src) in out.pixels_mut().zip(self.image.pixels()) {
            let a = u32::from(src[3]);
            let blend = |fg: u8, bg: u8| ((u32::from(fg) * a + u32::from(bg) * (255 - a) + 127) / 255) as u8;
            *dst = Rgba([
                blend(src[0], background.r),
                blend(src[1], background.g),
                blend(src[2], background.b),
                255,
            ]);
        }
        Bitmap::from_image(out)
    }
}
