//! Zoom-aware exports: the preview goes to 100% for the capture and always
//! comes back to where it was.

use biodata_export::capture::{CaptureTarget, Capturer, MemoryCapturer};
use biodata_export::download::MemorySink;
use biodata_export::platform::{PreviewZoom, ZoomController};
use biodata_export::{Bitmap, CaptureOptions, Error, ExportConfig, Exporter, ImageMime, SettleTiming};
use image::Rgba;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Records the zoom level seen at capture time.
struct ZoomAwareCapturer {
    inner: MemoryCapturer,
    zoom: Arc<PreviewZoom>,
    seen: std::sync::Mutex<Vec<u32>>,
}

impl Capturer for ZoomAwareCapturer {
    fn capture(&self, target: &CaptureTarget, options: &CaptureOptions) -> biodata_export::Result<Bitmap> {
        self.seen.lock().unwrap().push(self.zoom.zoom());
        self.inner.capture(target, options)
    }
}

fn setup(settle: SettleTiming) -> (Exporter<ZoomAwareCapturer>, Arc<PreviewZoom>, Arc<MemorySink>) {
    let zoom = Arc::new(PreviewZoom::new(50));
    let mut inner = MemoryCapturer::new();
    inner.mount("#preview", Bitmap::filled(60, 80, Rgba([10, 10, 10, 255])));
    let capturer = ZoomAwareCapturer { inner, zoom: zoom.clone(), seen: Default::default() };
    let sink = Arc::new(MemorySink::new());
    let config = ExportConfig { settle, ..Default::default() };
    (Exporter::new(capturer, sink.clone(), config), zoom, sink)
}

#[tokio::test]
async fn capture_happens_at_full_zoom_and_zoom_is_restored() {
    let (exporter, zoom, sink) = setup(SettleTiming { frames: 2, frame_ms: 1, delay_ms: 1 });
    let outcome = exporter
        .export_pdf_at_full_zoom(zoom.as_ref(), Some(&CaptureTarget::new("#preview")), Some("biodata-x.pdf"))
        .await;
    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(*exporter.capturer().seen.lock().unwrap(), vec![100]);
    assert_eq!(zoom.zoom(), 50);
    assert_eq!(sink.downloads().len(), 1);
}

#[tokio::test]
async fn export_waits_for_settle_delay() {
    let settle = SettleTiming { frames: 2, frame_ms: 5, delay_ms: 40 };
    let (exporter, zoom, _) = setup(settle);
    let started = Instant::now();
    let outcome = exporter
        .export_image_at_full_zoom(zoom.as_ref(), Some(&CaptureTarget::new("#preview")), ImageMime::Png, None)
        .await;
    assert!(outcome.success);
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[tokio::test]
async fn failed_export_still_restores_zoom() {
    let (exporter, zoom, sink) = setup(SettleTiming { frames: 0, frame_ms: 0, delay_ms: 0 });
    zoom.set_zoom(70);
    let outcome = exporter
        .export_image_at_full_zoom(zoom.as_ref(), Some(&CaptureTarget::new("#unmounted")), ImageMime::Png, None)
        .await;
    assert_eq!(outcome.error, Some(Error::PreviewNotReady.to_string()));
    assert_eq!(zoom.zoom(), 70);
    assert!(sink.downloads().is_empty());
}

#[tokio::test]
async fn missing_target_never_touches_zoom() {
    let (exporter, zoom, _) = setup(SettleTiming::default());
    let outcome = exporter.export_pdf_at_full_zoom(zoom.as_ref(), None, None).await;
    assert!(!outcome.success);
    assert!(exporter.capturer().seen.lock().unwrap().is_empty());
    assert_eq!(zoom.zoom(), 50);
}
