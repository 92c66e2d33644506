//! Export orchestration: capture → guard → crop → encode → download.
//!
//! Both public operations report an [`ExportOutcome`] instead of failing, log
//! the reason on failure, and leave the captured source untouched. Each call
//! runs the whole pipeline on its own; nothing is cached between calls.

use crate::capture::{CaptureTarget, Capturer};
use crate::download::{default_filename, DownloadSink};
use crate::pdf::{assemble_pdf, image_dimensions, plan_pages, PagePlan};
use crate::platform::{settle, ZoomController, ZoomGuard, FULL_ZOOM};
use crate::rendering::crop::{crop_to_content, BackgroundMatcher};
use crate::rendering::encode::{encode_bitmap, BitmapEncoder, EncodedImage, ImageMime, NativeEncoder};
use crate::rendering::raster::ensure_within_limit;
use crate::rendering::Bitmap;
use crate::{Error, ExportConfig, ExportOutcome, Result};
use log::{debug, error, info};

pub const PDF_MIME: &str = "application/pdf";

/// A finished PDF along with its page layout.
#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub plan: PagePlan,
}

/// Runs exports against a capture backend and hands results to a sink.
pub struct Exporter<C: Capturer> {
    capturer: C,
    sink: Box<dyn DownloadSink>,
    encoder: Box<dyn BitmapEncoder>,
    config: ExportConfig,
}

impl<C: Capturer> Exporter<C> {
    pub fn new(capturer: C, sink: impl DownloadSink + 'static, config: ExportConfig) -> Self {
        Self { capturer, sink: Box::new(sink), encoder: Box::new(NativeEncoder), config }
    }

    /// Replace the platform encoder (e.g. one that mimics a flaky blob API).
    pub fn with_encoder(mut self, encoder: impl BitmapEncoder + 'static) -> Self {
        self.encoder = Box::new(encoder);
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn capturer(&self) -> &C {
        &self.capturer
    }

    /// Whether the capture backend can run here.
    pub fn is_export_supported(&self) -> bool {
        self.capturer.is_available()
    }

    /// Capture the target, keep it under the canvas ceiling and crop it to content.
    pub fn capture_cropped(&self, target: Option<&CaptureTarget>) -> Result<Bitmap> {
        let target = target.ok_or(Error::PreviewNotReady)?;
        let options = self.config.capture_options();
        let captured = self.capturer.capture(target, &options)?;
        debug!("Captured '{}' at {}x{}", target.selector, captured.width(), captured.height());

        let guarded = ensure_within_limit(captured, self.config.profile.canvas_pixel_ceiling);
        let matcher = BackgroundMatcher::new(options.background_color).with_tolerance(self.config.tolerance);
        Ok(crop_to_content(guarded, &matcher))
    }

    /// Produce the encoded image without saving it.
    pub fn render_image(&self, target: Option<&CaptureTarget>, format: ImageMime) -> Result<EncodedImage> {
        let mut bitmap = self.capture_cropped(target)?;
        if let Some(ceiling) = self.config.profile.blob_pixel_ceiling {
            bitmap = ensure_within_limit(bitmap, ceiling);
        }
        let quality = match format {
            ImageMime::Png => format.default_quality(),
            ImageMime::Jpeg => self.config.jpeg_quality,
        };
        encode_bitmap(self.encoder.as_ref(), &bitmap, format, Some(quality))
    }

    /// Produce the PDF without saving it.
    pub fn render_pdf(&self, target: Option<&CaptureTarget>) -> Result<RenderedPdf> {
        let bitmap = self.capture_cropped(target)?;
        let jpeg = encode_bitmap(self.encoder.as_ref(), &bitmap, ImageMime::Jpeg, Some(self.config.jpeg_quality))?;
        let (width, height) = image_dimensions(&jpeg)?;
        let plan = plan_pages(width, height, self.config.page)?;
        let bytes = assemble_pdf(&jpeg, width, height, &plan)?;
        Ok(RenderedPdf { bytes, plan })
    }

    /// Export the target as a PNG or JPEG download.
    ///
    /// `filename` defaults to `bio-data.<ext>`.
    pub fn export_to_image(&self, target: Option<&CaptureTarget>, format: ImageMime, filename: Option<&str>) -> ExportOutcome {
        let filename = filename.map(str::to_string).unwrap_or_else(|| default_filename(format.extension()));
        let result = self
            .render_image(target, format)
            .and_then(|image| self.sink.save(&filename, format.as_str(), &image.bytes));
        report("image", &filename, result)
    }

    /// Export the target as an A4 PDF download.
    ///
    /// `filename` defaults to `bio-data.pdf`.
    pub fn export_to_pdf(&self, target: Option<&CaptureTarget>, filename: Option<&str>) -> ExportOutcome {
        let filename = filename.map(str::to_string).unwrap_or_else(|| default_filename("pdf"));
        let result = self.render_pdf(target).and_then(|pdf| {
            debug!("PDF has {} page(s)", pdf.plan.page_count());
            self.sink.save(&filename, PDF_MIME, &pdf.bytes)
        });
        report("PDF", &filename, result)
    }

    /// Switch the preview to 100%, let it settle, export the image, then
    /// restore the previous zoom whatever the outcome.
    pub async fn export_image_at_full_zoom(
        &self,
        zoom: &dyn ZoomController,
        target: Option<&CaptureTarget>,
        format: ImageMime,
        filename: Option<&str>,
    ) -> ExportOutcome {
        if target.is_none() {
            return report("image", filename.unwrap_or_default(), Err(Error::PreviewNotReady));
        }
        let _guard = ZoomGuard::engage(zoom, FULL_ZOOM);
        settle(self.config.settle).await;
        self.export_to_image(target, format, filename)
    }

    /// PDF counterpart of [`Exporter::export_image_at_full_zoom`].
    pub async fn export_pdf_at_full_zoom(
        &self,
        zoom: &dyn ZoomController,
        target: Option<&CaptureTarget>,
        filename: Option<&str>,
    ) -> ExportOutcome {
        if target.is_none() {
            return report("PDF", filename.unwrap_or_default(), Err(Error::PreviewNotReady));
        }
        let _guard = ZoomGuard::engage(zoom, FULL_ZOOM);
        settle(self.config.settle).await;
        self.export_to_pdf(target, filename)
    }
}

fn report(kind: &str, filename: &str, result: Result<()>) -> ExportOutcome {
    match result {
        Ok(()) => {
            info!("Exported {} {}", kind, filename);
            ExportOutcome::ok()
        }
        Err(e) => {
            error!("Error exporting to {}: {}", kind, e);
            ExportOutcome::failure(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::MemoryCapturer;
    use crate::download::MemorySink;
    use crate::platform::{PlatformProfile, PreviewZoom, SettleTiming};
    use image::{Rgba, RgbaImage};
    use std::sync::Arc;

    fn preview() -> Bitmap {
        let mut img = RgbaImage::from_pixel(120, 80, Rgba([255, 255, 255, 255]));
        for y in 20..50 {
            for x in 30..90 {
                img.put_pixel(x, y, Rgba([30, 60, 90, 255]));
            }
        }
        Bitmap::from_image(img)
    }

    fn exporter(profile: PlatformProfile) -> (Exporter<MemoryCapturer>, Arc<MemorySink>) {
        let mut cap = MemoryCapturer::new();
        cap.mount("#preview", preview());
        let sink = Arc::new(MemorySink::new());
        let config = ExportConfig {
            profile,
            settle: SettleTiming { frames: 2, frame_ms: 1, delay_ms: 1 },
            ..Default::default()
        };
        (Exporter::new(cap, sink.clone(), config), sink)
    }

    #[test]
    fn image_export_crops_at_pixel_ratio() {
        let (ex, sink) = exporter(PlatformProfile::desktop());
        let outcome = ex.export_to_image(Some(&CaptureTarget::new("#preview")), ImageMime::Png, None);
        assert_eq!(outcome, ExportOutcome::ok());
        let dl = sink.last().unwrap();
        assert_eq!(dl.filename, "bio-data.png");
        assert_eq!(dl.mime, "image/png");
        let bmp = Bitmap::decode(&dl.bytes).unwrap();
        assert_eq!((bmp.width(), bmp.height()), (120, 60));
    }

    #[test]
    fn mobile_profile_applies_blob_ceiling() {
        let profile = PlatformProfile { blob_pixel_ceiling: Some(100), ..PlatformProfile::mobile() };
        let (ex, _) = exporter(profile);
        let img = ex.render_image(Some(&CaptureTarget::new("#preview")), ImageMime::Png).unwrap();
        let bmp = Bitmap::decode(&img.bytes).unwrap();
        assert!(bmp.pixel_count() <= 100);
    }

    #[test]
    fn missing_target_reports_preview_not_ready() {
        let (ex, sink) = exporter(PlatformProfile::desktop());
        let outcome = ex.export_to_pdf(None, Some("x.pdf"));
        assert!(!outcome.success);
        assert_eq!(outcome.error, Some(Error::PreviewNotReady.to_string()));
        assert!(sink.downloads().is_empty());
    }

    #[test]
    fn pdf_export_uses_default_name() {
        let (ex, sink) = exporter(PlatformProfile::mobile());
        let outcome = ex.export_to_pdf(Some(&CaptureTarget::new("#preview")), None);
        assert!(outcome.success, "{:?}", outcome.error);
        let dl = sink.last().unwrap();
        assert_eq!(dl.filename, "bio-data.pdf");
        assert!(dl.bytes.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn full_zoom_export_restores_zoom_after_failure() {
        let (ex, _) = exporter(PlatformProfile::desktop());
        let zoom = PreviewZoom::new(50);
        let outcome = ex
            .export_image_at_full_zoom(&zoom, Some(&CaptureTarget::new("#missing")), ImageMime::Png, None)
            .await;
        assert!(!outcome.success);
        assert_eq!(zoom.zoom(), 50);
    }

    #[tokio::test]
    async fn full_zoom_export_skips_zoom_without_target() {
        struct Watch(PreviewZoom, std::sync::atomic::AtomicUsize);
        impl ZoomController for Watch {
            fn zoom(&self) -> u32 {
                self.0.zoom()
            }
            fn set_zoom(&self, percent: u32) {
                self.1.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                self.0.set_zoom(percent);
            }
        }
        let (ex, _) = exporter(PlatformProfile::desktop());
        let watch = Watch(PreviewZoom::new(50), Default::default());
        let outcome = ex.export_pdf_at_full_zoom(&watch, None, None).await;
        assert!(!outcome.success);
        assert_eq!(watch.1.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
