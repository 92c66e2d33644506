/// Preview zoom control around captures
///
/// The preview is normally shown scaled down. Captures must happen at 100%
/// after layout and paint have settled, and the previous zoom must come back
/// whatever the export outcome.

use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;

pub const FULL_ZOOM: u32 = 100;
pub const MIN_ZOOM: u32 = 30;
pub const DEFAULT_ZOOM: u32 = 50;
pub const ZOOM_STEP: u32 = 10;

pub trait ZoomController: Send + Sync {
    fn zoom(&self) -> u32;
    fn set_zoom(&self, percent: u32);
}

/// Zoom state of a preview panel, clamped to `MIN_ZOOM..=FULL_ZOOM`.
pub struct PreviewZoom {
    level: Mutex<u32>,
}

impl PreviewZoom {
    pub fn new(percent: u32) -> Self {
        PreviewZoom { level: Mutex::new(percent.clamp(MIN_ZOOM, FULL_ZOOM)) }
    }

    pub fn zoom_in(&self) -> u32 {
        let next = (self.zoom() + ZOOM_STEP).min(FULL_ZOOM);
        self.set_zoom(next);
        next
    }

    pub fn zoom_out(&self) -> u32 {
        let next = self.zoom().saturating_sub(ZOOM_STEP).max(MIN_ZOOM);
        self.set_zoom(next);
        next
    }

    /// CSS scale factor for the current zoom.
    pub fn scale(&self) -> f32 {
        self.zoom() as f32 / 100.0
    }
}

impl Default for PreviewZoom {
    fn default() -> Self {
        Self::new(DEFAULT_ZOOM)
    }
}

impl ZoomController for PreviewZoom {
    fn zoom(&self) -> u32 {
        *self.level.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_zoom(&self, percent: u32) {
        let mut g = self.level.lock().unwrap_or_else(|p| p.into_inner());
        *g = percent.clamp(MIN_ZOOM, FULL_ZOOM);
    }
}

/// Holds the preview at a temporary zoom; restores the prior level on drop.
pub struct ZoomGuard<'a> {
    controller: &'a dyn ZoomController,
    prior: u32,
}

impl<'a> ZoomGuard<'a> {
    pub fn engage(controller: &'a dyn ZoomController, percent: u32) -> Self {
        let prior = controller.zoom();
        controller.set_zoom(percent);
        debug!("Preview zoom {}% -> {}%", prior, percent);
        ZoomGuard { controller, prior }
    }

    pub fn prior(&self) -> u32 {
        self.prior
    }
}

impl Drop for ZoomGuard<'_> {
    fn drop(&mut self) {
        self.controller.set_zoom(self.prior);
        debug!("Preview zoom restored to {}%", self.prior);
    }
}

/// How long to wait after a zoom change before capturing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleTiming {
    pub frames: u32,
    pub frame_ms: u64,
    pub delay_ms: u64,
}

impl SettleTiming {
    pub fn total(&self) -> Duration {
        Duration::from_millis(u64::from(self.frames) * self.frame_ms + self.delay_ms)
    }
}

impl Default for SettleTiming {
    fn default() -> Self {
        Self { frames: 2, frame_ms: 16, delay_ms: 350 }
    }
}

/// Wait for the frame ticks and then the fixed settle delay.
pub async fn settle(timing: SettleTiming) {
    for _ in 0..timing.frames {
        tokio::time::sleep(Duration::from_millis(timing.frame_ms)).await;
    }
    tokio::time::sleep(Duration::from_millis(timing.delay_ms)).await;
}
