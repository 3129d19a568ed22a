use remote_agent_common::model::{MouseButton, WindowInfo};

use crate::input::{InputCapability, InputOutcome};
use crate::screen::{CapturedFrame, ScreenCapability};

/// Stand-in used when no platform backend is available (headless build, or
/// the concrete backend failed to initialize). Every call fails with a
/// descriptive error rather than panicking, matching the
/// `ServiceUnavailable` ("input or screen capability unavailable").
pub struct NullInputCapability;

const UNAVAILABLE: &str = "input capability unavailable on this platform";

impl InputCapability for NullInputCapability {
    fn move_to(&self, _x: i32, _y: i32) -> InputOutcome {
        InputOutcome::failed(UNAVAILABLE)
    }

    fn click(&self, _x: i32, _y: i32, _button: MouseButton, _count: u32) -> InputOutcome {
        InputOutcome::failed(UNAVAILABLE)
    }

    fn drag(
        &self,
        _start_x: i32,
        _start_y: i32,
        _end_x: i32,
        _end_y: i32,
        _button: MouseButton,
        _duration_secs: f64,
        _steps: i32,
    ) -> InputOutcome {
        InputOutcome::failed(UNAVAILABLE)
    }

    fn scroll(
        &self,
        _delta: i32,
        _x: Option<i32>,
        _y: Option<i32>,
        _horizontal: bool,
    ) -> InputOutcome {
        InputOutcome::failed(UNAVAILABLE)
    }

    fn key_down(&self, _key: &str) -> InputOutcome {
        InputOutcome::failed(UNAVAILABLE)
    }

    fn key_up(&self, _key: &str) -> InputOutcome {
        InputOutcome::failed(UNAVAILABLE)
    }

    fn key_press(&self, _key: &str) -> InputOutcome {
        InputOutcome::failed(UNAVAILABLE)
    }

    fn hotkey(&self, _keys: &[String]) -> InputOutcome {
        InputOutcome::failed(UNAVAILABLE)
    }

    fn type_text(&self, _text: &str, _interval_secs: f64, _use_unicode: bool) -> InputOutcome {
        InputOutcome::failed(UNAVAILABLE)
    }

    fn cursor_position(&self) -> (i32, i32) {
        (0, 0)
    }

    fn screen_size(&self) -> (i32, i32) {
        (0, 0)
    }

    fn foreground_window_info(&self) -> Option<WindowInfo> {
        None
    }
}

pub struct NullScreenCapability;

impl ScreenCapability for NullScreenCapability {
    fn capture(&self, _monitor_index: usize) -> anyhow::Result<CapturedFrame> {
        Err(anyhow::anyhow!("screen capability unavailable on this platform"))
    }

    fn monitor_count(&self) -> anyhow::Result<usize> {
        Err(anyhow::anyhow!("screen capability unavailable on this platform"))
    }
}
