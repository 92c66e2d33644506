//! Chrome DevTools Protocol capture backend

use crate::capture::{CaptureTarget, Capturer};
use crate::rendering::Bitmap;
use crate::{CaptureOptions, Error, Result, Viewport};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::{Network, Page};
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

/// CDP-based capturer (uses the `headless_chrome` crate)
///
/// Launches a headless Chrome instance with a single tab. The page holding
/// the preview is loaded once with [`CdpCapturer::load_url`]; each capture
/// then clips a screenshot to the target element's border box.
///
/// With the network cache disabled, `load_url` fetches every resource fresh.
/// A capture asking for `cache_bust` on a page loaded with the cache enabled
/// reloads it, bypassing the cache, before taking the screenshot.
pub struct CdpCapturer {
    _browser: Browser,
    tab: Arc<Tab>,
    settle: Duration,
    cache_disabled: bool,
}

impl CdpCapturer {
    /// Launch Chrome with a window of `viewport` size.
    pub fn launch(viewport: Viewport) -> Result<Self> {
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((viewport.width, viewport.height)))
            .build()
            .map_err(|e| Error::CaptureFailed(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::CaptureFailed(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::CaptureFailed(format!("Failed to create tab: {}", e)))?;

        Ok(Self { _browser: browser, tab, settle: Duration::from_millis(350), cache_disabled: false })
    }

    /// Delay after navigation before the page counts as painted.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Disable the network cache for every subsequent navigation.
    pub fn with_cache_disabled(mut self, disabled: bool) -> Self {
        self.cache_disabled = disabled;
        self
    }

    pub fn cache_disabled(&self) -> bool {
        self.cache_disabled
    }

    /// Load the page holding the preview and wait for it to stabilize.
    pub fn load_url(&self, url: &str) -> Result<()> {
        if self.cache_disabled {
            if let Err(e) = self.tab.call_method(Network::SetCacheDisabled { cache_disabled: true }) {
                warn!("Failed to disable network cache: {}", e);
            }
        }
        self.tab
            .navigate_to(url)
            .map_err(|e| Error::CaptureFailed(format!("Navigation failed: {}", e)))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::CaptureFailed(format!("Wait for navigation failed: {}", e)))?;
        std::thread::sleep(self.settle);
        Ok(())
    }

    fn reload_bypassing_cache(&self) -> Result<()> {
        debug!("Reloading page without cache before capture");
        self.tab
            .reload(true, None)
            .map_err(|e| Error::CaptureFailed(format!("Reload failed: {}", e)))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::CaptureFailed(format!("Wait for reload failed: {}", e)))?;
        std::thread::sleep(self.settle);
        Ok(())
    }
}

impl Capturer for CdpCapturer {
    fn capture(&self, target: &CaptureTarget, options: &CaptureOptions) -> Result<Bitmap> {
        if options.cache_bust && !self.cache_disabled {
            self.reload_bypassing_cache()?;
        }

        let element = self.tab.find_element(&target.selector).map_err(|e| {
            debug!("Selector '{}' not found: {}", target.selector, e);
            Error::PreviewNotReady
        })?;

        let mut clip = element
            .get_box_model()
            .map_err(|e| Error::CaptureFailed(format!("Failed to measure '{}': {}", target.selector, e)))?
            .border_viewport();
        if clip.width <= 0.0 || clip.height <= 0.0 {
            return Err(Error::PreviewNotReady);
        }
        clip.scale = f64::from(options.pixel_ratio);

        let format = match options.lossy_quality() {
            Some(_) => Page::CaptureScreenshotFormatOption::Jpeg,
            None => Page::CaptureScreenshotFormatOption::Png,
        };
        let data = self
            .tab
            .capture_screenshot(format, options.lossy_quality().map(u32::from), Some(clip), true)
            .map_err(|e| Error::CaptureFailed(format!("Screenshot failed: {}", e)))?;

        Ok(Bitmap::decode(&data)?.flatten_onto(options.background_color))
    }
}
