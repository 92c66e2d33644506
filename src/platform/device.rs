/// Platform profiles: capture density and pixel ceilings per device class

use crate::rendering::raster::{MAX_BLOB_PIXELS, MAX_CANVAS_PIXELS};
use serde::{Deserialize, Serialize};

const MOBILE_UA_TOKENS: &[&str] = &["android", "webos", "iphone", "ipad", "ipod", "blackberry", "iemobile", "opera mini"];

/// Whether a user agent string identifies a mobile browser.
pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    MOBILE_UA_TOKENS.iter().any(|token| ua.contains(token))
}

/// Thresholds chosen once per export call.
///
/// Constrained (mobile) profiles capture at 1x and add a second, smaller
/// ceiling applied before image encoding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformProfile {
    pub pixel_ratio: f32,
    pub canvas_pixel_ceiling: u64,
    pub blob_pixel_ceiling: Option<u64>,
}

impl PlatformProfile {
    pub fn desktop() -> Self {
        Self { pixel_ratio: 2.0, canvas_pixel_ceiling: MAX_CANVAS_PIXELS, blob_pixel_ceiling: None }
    }

    pub fn mobile() -> Self {
        Self { pixel_ratio: 1.0, canvas_pixel_ceiling: MAX_CANVAS_PIXELS, blob_pixel_ceiling: Some(MAX_BLOB_PIXELS) }
    }

    pub fn from_user_agent(user_agent: &str) -> Self {
        if is_mobile_user_agent(user_agent) {
            Self::mobile()
        } else {
            Self::desktop()
        }
    }

    pub fn is_constrained(&self) -> bool {
        self.blob_pixel_ceiling.is_some()
    }
}

impl Default for PlatformProfile {
    fn default() -> Self {
        Self::desktop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_mobile_agents() {
        assert!(is_mobile_user_agent("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)"));
        assert!(is_mobile_user_agent("Mozilla/5.0 (Linux; Android 14; Pixel 8)"));
        assert!(is_mobile_user_agent("Opera/9.80 (J2ME/MIDP; Opera Mini/9.80)"));
        assert!(!is_mobile_user_agent("Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/115.0"));
    }

    #[test]
    fn profiles_differ_in_density_and_blob_ceiling() {
        let d = PlatformProfile::from_user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64)");
        assert_eq!(d, PlatformProfile::desktop());
        assert_eq!(d.pixel_ratio, 2.0);
        assert!(!d.is_constrained());

        let m = PlatformProfile::from_user_agent("Mozilla/5.0 (iPad; CPU OS 16_0)");
        assert_eq!(m.pixel_ratio, 1.0);
        assert_eq!(m.blob_pixel_ceiling, Some(2048 * 2048));
    }
}
