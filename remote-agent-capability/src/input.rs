use remote_agent_common::model::{MouseButton, WindowInfo};

/// Result of a single capability call, mirroring the original `InputResult`
/// dataclass (`success`, `events_sent`, `error`).
#[derive(Debug, Clone)]
pub struct InputOutcome {
    pub success: bool,
    pub events_sent: u32,
    pub error: Option<String>,
}

impl InputOutcome {
    pub fn ok(events_sent: u32) -> Self {
        Self {
            success: true,
            events_sent,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            events_sent: 0,
            error: Some(error.into()),
        }
    }
}

/// Synthetic mouse/keyboard input plus the state-inspection calls the
/// executor needs for read-back verification. Implementations run
/// synchronous, possibly-blocking platform syscalls; callers dispatch them
/// through `tokio::task::spawn_blocking`.
pub trait InputCapability: Send + Sync {
    fn move_to(&self, x: i32, y: i32) -> InputOutcome;
    fn click(&self, x: i32, y: i32, button: MouseButton, count: u32) -> InputOutcome;
    #[allow(clippy::too_many_arguments)]
    fn drag(
        &self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        button: MouseButton,
        duration_secs: f64,
        steps: i32,
    ) -> InputOutcome;
    fn scroll(&self, delta: i32, x: Option<i32>, y: Option<i32>, horizontal: bool) -> InputOutcome;
    fn key_down(&self, key: &str) -> InputOutcome;
    fn key_up(&self, key: &str) -> InputOutcome;
    fn key_press(&self, key: &str) -> InputOutcome;
    fn hotkey(&self, keys: &[String]) -> InputOutcome;
    fn type_text(&self, text: &str, interval_secs: f64, use_unicode: bool) -> InputOutcome;

    fn cursor_position(&self) -> (i32, i32);
    fn screen_size(&self) -> (i32, i32);
    fn foreground_window_info(&self) -> Option<WindowInfo>;
}
