//! Platform surface: device profiles and preview zoom control
//!
//! Platform-conditional behaviour is captured in a [`PlatformProfile`] value
//! chosen once per export, so the pipeline itself stays platform-agnostic and
//! can be exercised with either profile in tests.

pub mod device;
pub mod zoom;

pub use device::{is_mobile_user_agent, PlatformProfile};
pub use zoom::{settle, PreviewZoom, SettleTiming, ZoomController, ZoomGuard, FULL_ZOOM};
