//! Bitmap encoding with a data-URL fallback path.
//!
//! The primary path produces binary data directly. Some platforms return no
//! data for large bitmaps on that path, so [`encode_bitmap`] falls back to a
//! textual data URL and decodes it back into bytes.

use crate::rendering::Bitmap;
use crate::{Error, Result};
use base64::Engine as Base64Engine;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// A data URL shorter than this is treated as a silent encoding failure.
pub const MIN_DATA_URL_LEN: usize = 100;

/// Output image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageMime {
    #[default]
    Png,
    Jpeg,
}

impl ImageMime {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    /// Quality used by image exports: lossless PNG, 0.95 JPEG.
    pub fn default_quality(self) -> f32 {
        match self {
            Self::Png => 1.0,
            Self::Jpeg => 0.95,
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            _ => None,
        }
    }
}

/// An encoded image ready to be written out or embedded.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub mime: ImageMime,
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn to_data_url(&self) -> String {
        data_url(self.mime, &self.bytes)
    }
}

/// Platform encoding surface. Either method may return `None` when the
/// platform fails without reporting an error.
pub trait BitmapEncoder: Send + Sync {
    /// Encode straight to binary data.
    fn to_blob(&self, bitmap: &Bitmap, mime: ImageMime, quality: Option<f32>) -> Option<Vec<u8>>;

    /// Encode to a `data:<mime>;base64,...` URL.
    fn to_data_url(&self, bitmap: &Bitmap, mime: ImageMime, quality: Option<f32>) -> Option<String> {
        self.to_blob(bitmap, mime, quality).map(|bytes| data_url(mime, &bytes))
    }
}

/// Encoder backed by the `image` crate codecs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEncoder;

impl BitmapEncoder for NativeEncoder {
    fn to_blob(&self, bitmap: &Bitmap, mime: ImageMime, quality: Option<f32>) -> Option<Vec<u8>> {
        match encode_raw(bitmap, mime, quality) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("{} encode of {}x{} bitmap failed: {}", mime.as_str(), bitmap.width(), bitmap.height(), e);
                None
            }
        }
    }
}

/// Map a 0..=1 quality onto the JPEG encoder's 1..=100 scale.
pub fn jpeg_quality(quality: Option<f32>) -> u8 {
    let q = quality.unwrap_or(0.92).clamp(0.0, 1.0);
    ((q * 100.0).round() as u8).max(1)
}

fn encode_raw(bitmap: &Bitmap, mime: ImageMime, quality: Option<f32>) -> std::result::Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    match mime {
        ImageMime::Png => {
            let img = bitmap.as_image();
            PngEncoder::new(&mut buf).write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgba8)?;
        }
        ImageMime::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgba8(bitmap.as_image().clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut buf, jpeg_quality(quality)).write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )?;
        }
    }
    Ok(buf)
}

/// Build a base64 data URL.
pub fn data_url(mime: ImageMime, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime.as_str(),
        Base64Engine::encode(&base64::engine::general_purpose::STANDARD, bytes)
    )
}

/// Decode a base64 data URL back into its MIME type and bytes.
pub fn decode_data_url(url: &str) -> Result<EncodedImage> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| Error::ImageEncodingFailed("not a data URL".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::ImageEncodingFailed("data URL has no payload".into()))?;
    let mime_str = header
        .strip_suffix(";base64")
        .ok_or_else(|| Error::ImageEncodingFailed("data URL is not base64".into()))?;
    let mime = ImageMime::from_mime(mime_str)
        .ok_or_else(|| Error::ImageEncodingFailed(format!("unsupported data URL type '{}'", mime_str)))?;
    let bytes = Base64Engine::decode(&base64::engine::general_purpose::STANDARD, payload)
        .map_err(|e| Error::ImageEncodingFailed(format!("invalid base64 payload: {}", e)))?;
    Ok(EncodedImage { mime, bytes })
}

/// Encode through the primary path, falling back to a data-URL round trip.
pub fn encode_bitmap(
    encoder: &dyn BitmapEncoder,
    bitmap: &Bitmap,
    mime: ImageMime,
    quality: Option<f32>,
) -> Result<EncodedImage> {
    if let Some(bytes) = encoder.to_blob(bitmap, mime, quality).filter(|b| !b.is_empty()) {
        debug!("Encoded {}x{} bitmap as {} ({} bytes)", bitmap.width(), bitmap.height(), mime.as_str(), bytes.len());
        return Ok(EncodedImage { mime, bytes });
    }

    warn!("Primary {} encode returned no data; trying data URL fallback", mime.as_str());
    let url = encoder
        .to_data_url(bitmap, mime, quality)
        .filter(|u| u.len() >= MIN_DATA_URL_LEN)
        .ok_or_else(|| Error::ImageEncodingFailed(format!("{} encoder produced no data", mime.as_str())))?;
    let decoded = decode_data_url(&url)?;
    if decoded.mime != mime {
        return Err(Error::ImageEncodingFailed(format!(
            "requested {} but the encoder produced {}",
            mime.as_str(),
            decoded.mime.as_str()
        )));
    }
    if decoded.bytes.is_empty() {
        return Err(Error::ImageEncodingFailed("data URL decoded to nothing".into()));
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    struct NoBlob;

    impl BitmapEncoder for NoBlob {
        fn to_blob(&self, _: &Bitmap, _: ImageMime, _: Option<f32>) -> Option<Vec<u8>> {
            None
        }

        fn to_data_url(&self, bitmap: &Bitmap, mime: ImageMime, quality: Option<f32>) -> Option<String> {
            NativeEncoder.to_data_url(bitmap, mime, quality)
        }
    }

    /// Falls back to PNG whatever was asked for.
    struct PngOnly;

    impl BitmapEncoder for PngOnly {
        fn to_blob(&self, _: &Bitmap, _: ImageMime, _: Option<f32>) -> Option<Vec<u8>> {
            None
        }

        fn to_data_url(&self, bitmap: &Bitmap, _: ImageMime, quality: Option<f32>) -> Option<String> {
            NativeEncoder.to_data_url(bitmap, ImageMime::Png, quality)
        }
    }

    struct Broken;

    impl BitmapEncoder for Broken {
        fn to_blob(&self, _: &Bitmap, _: ImageMime, _: Option<f32>) -> Option<Vec<u8>> {
            None
        }

        fn to_data_url(&self, _: &Bitmap, _: ImageMime, _: Option<f32>) -> Option<String> {
            Some("data:,".to_string())
        }
    }

    fn sample() -> Bitmap {
        let mut img = image::RgbaImage::from_pixel(40, 30, Rgba([255, 255, 255, 255]));
        img.put_pixel(5, 5, Rgba([200, 0, 0, 255]));
        Bitmap::from_image(img)
    }

    #[test]
    fn primary_path_emits_png_signature() {
        let out = encode_bitmap(&NativeEncoder, &sample(), ImageMime::Png, None).unwrap();
        assert_eq!(&out.bytes[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(Bitmap::decode(&out.bytes).unwrap(), sample());
    }

    #[test]
    fn fallback_recovers_when_blob_is_missing() {
        let out = encode_bitmap(&NoBlob, &sample(), ImageMime::Jpeg, Some(0.95)).unwrap();
        assert_eq!(out.mime, ImageMime::Jpeg);
        assert_eq!(&out.bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn short_data_url_is_an_encoding_failure() {
        let err = encode_bitmap(&Broken, &sample(), ImageMime::Png, None).unwrap_err();
        assert!(matches!(err, Error::ImageEncodingFailed(_)));
    }

    #[test]
    fn fallback_of_another_type_is_rejected() {
        let err = encode_bitmap(&PngOnly, &sample(), ImageMime::Jpeg, Some(0.95)).unwrap_err();
        assert!(matches!(err, Error::ImageEncodingFailed(ref m) if m.contains("image/png")), "{}", err);
        assert!(encode_bitmap(&PngOnly, &sample(), ImageMime::Png, None).is_ok());
    }

    #[test]
    fn decode_data_url_rejects_garbage() {
        assert!(decode_data_url("http://example.com/a.png").is_err());
        assert!(decode_data_url("data:image/png;base64").is_err());
        assert!(decode_data_url("data:text/plain;base64,aGk=").is_err());
        let ok = decode_data_url("data:image/png;base64,aGk=").unwrap();
        assert_eq!(ok.bytes, b"hi");
    }

    #[test]
    fn quality_maps_onto_jpeg_scale() {
        assert_eq!(jpeg_quality(Some(0.95)), 95);
        assert_eq!(jpeg_quality(Some(0.0)), 1);
        assert_eq!(jpeg_quality(Some(3.0)), 100);
    }
}
