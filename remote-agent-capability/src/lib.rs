//! Platform capability traits and runtime-selected backends.
//!
//! Grounded on `original_source/agent/control/input_base.py` (the abstract
//! `InputControllerBase`) and `original_source/agent/control/screen.py` (the
//! capture pipeline), generalized into platform capability polymorphism: a
//! capability trait with per-target implementations, selected once at
//! startup by `select_input_capability`/`select_screen_capability`.

mod input;
mod null;
mod screen;

pub use input::{InputCapability, InputOutcome};
pub use null::{NullInputCapability, NullScreenCapability};
pub use screen::{CapturedFrame, ScreenCapability};

#[cfg(feature = "desktop")]
mod enigo_input;
#[cfg(feature = "desktop")]
mod xcap_screen;

use std::sync::Arc;

use tracing::warn;

/// Constructs the concrete input backend for this platform, falling back to
/// a `NullInputCapability` (which fails every call with `ServiceUnavailable`)
/// if none is available: a runtime selector constructs the concrete
/// capability at startup and reports an error object if none is available —
/// here the "error object" is the null backend's per-call error.
pub fn select_input_capability() -> Arc<dyn InputCapability> {
    #[cfg(feature = "desktop")]
    {
        match enigo_input::EnigoInputCapability::new() {
            Ok(cap) => return Arc::new(cap),
            Err(e) => warn!(error = %e, "input capability unavailable, falling back to null backend"),
        }
    }
    Arc::new(NullInputCapability)
}

pub fn select_screen_capability() -> Arc<dyn ScreenCapability> {
    #[cfg(feature = "desktop")]
    {
        return Arc::new(xcap_screen::XcapScreenCapability);
    }
    #[cfg(not(feature = "desktop"))]
    {
        Arc::new(NullScreenCapability)
    }
}
