//! Command Executor: translates a validated `CommandParams` into capability
//! calls and composes a `CommandResult` with read-back verification.
//! Grounded on `original_source/agent/control/input_base.py` (capability
//! shape) and `verify_base.py` (`±5px` cursor tolerance check).

use std::sync::Arc;

use chrono::Utc;
use remote_agent_capability::InputCapability;
use remote_agent_common::keys::normalize_key_name;
use remote_agent_common::model::{CommandParams, CommandResult};
use serde_json::json;

/// Manhattan per-axis cursor tolerance for move/drag read-back, per the
/// §4.4 and the original `VerifierBase.verify_cursor_position`.
const CURSOR_TOLERANCE_PX: i32 = 5;

pub struct CommandExecutor {
    input: Arc<dyn InputCapability>,
}

impl CommandExecutor {
    pub fn new(input: Arc<dyn InputCapability>) -> Self {
        Self { input }
    }

    /// Runs the (possibly blocking) capability calls on the blocking pool
    /// and produces the terminal `CommandResult`. Never panics; capability
    /// failures and unknown keys become `CommandResult { success: false, .. }`.
    pub async fn execute(&self, params: CommandParams) -> CommandResult {
        let input = self.input.clone();
        let outcome = tokio::task::spawn_blocking(move || run(&*input, &params))
            .await
            .unwrap_or_else(|e| CommandResult {
                success: false,
                data: None,
                error: Some(format!("executor panicked: {e}")),
                completed_at: Utc::now(),
            });
        outcome
    }
}

fn run(input: &dyn InputCapability, params: &CommandParams) -> CommandResult {
    match params {
        CommandParams::Move { x, y } => {
            let outcome = input.move_to(*x, *y);
            verify_cursor_result(input, outcome, *x, *y)
        }
        CommandParams::Drag {
            end_x,
            end_y,
            start_x,
            start_y,
            button,
            duration,
            steps,
        } => {
            let outcome = input.drag(
                *start_x, *start_y, *end_x, *end_y, *button, *duration, *steps,
            );
            verify_cursor_result(input, outcome, *end_x, *end_y)
        }
        CommandParams::Click { x, y, button } => {
            let outcome = input.click(*x, *y, *button, 1);
            generic_result(input, outcome)
        }
        CommandParams::DoubleClick { x, y } => {
            let outcome = input.click(*x, *y, Default::default(), 2);
            generic_result(input, outcome)
        }
        CommandParams::RightClick { x, y } => {
            let outcome = input.click(*x, *y, remote_agent_common::model::MouseButton::Right, 1);
            generic_result(input, outcome)
        }
        CommandParams::Scroll {
            delta,
            x,
            y,
            horizontal,
        } => {
            let outcome = input.scroll(*delta, *x, *y, *horizontal);
            generic_result(input, outcome)
        }
        CommandParams::Type { text, interval } => {
            let outcome = input.type_text(text, *interval, true);
            generic_result(input, outcome)
        }
        CommandParams::Hotkey { keys } => {
            let normalized: Vec<String> = keys.iter().map(|k| normalize_key_name(k)).collect();
            let outcome = input.hotkey(&normalized);
            generic_result(input, outcome)
        }
        CommandParams::KeyDown { key } => {
            let outcome = input.key_down(&normalize_key_name(key));
            generic_result(input, outcome)
        }
        CommandParams::KeyUp { key } => {
            let outcome = input.key_up(&normalize_key_name(key));
            generic_result(input, outcome)
        }
        CommandParams::KeyPress { key } => {
            let outcome = input.key_press(&normalize_key_name(key));
            generic_result(input, outcome)
        }
    }
}

fn verify_cursor_result(
    input: &dyn InputCapability,
    outcome: remote_agent_capability::InputOutcome,
    target_x: i32,
    target_y: i32,
) -> CommandResult {
    if !outcome.success {
        return CommandResult {
            success: false,
            data: None,
            error: outcome.error,
            completed_at: Utc::now(),
        };
    }
    let (cx, cy) = input.cursor_position();
    let within_tolerance =
        (cx - target_x).abs() <= CURSOR_TOLERANCE_PX && (cy - target_y).abs() <= CURSOR_TOLERANCE_PX;
    if !within_tolerance {
        return CommandResult {
            success: false,
            data: Some(json!({ "cursor_position": [cx, cy] })),
            error: Some(format!(
                "cursor at ({cx}, {cy}) did not land within {CURSOR_TOLERANCE_PX}px of ({target_x}, {target_y})"
            )),
            completed_at: Utc::now(),
        };
    }
    CommandResult {
        success: true,
        data: Some(json!({ "cursor_position": [cx, cy] })),
        error: None,
        completed_at: Utc::now(),
    }
}

fn generic_result(
    input: &dyn InputCapability,
    outcome: remote_agent_capability::InputOutcome,
) -> CommandResult {
    if !outcome.success {
        return CommandResult {
            success: false,
            data: None,
            error: outcome.error,
            completed_at: Utc::now(),
        };
    }
    let (cx, cy) = input.cursor_position();
    let window_title = input
        .foreground_window_info()
        .map(|w| w.title)
        .unwrap_or_default();
    CommandResult {
        success: true,
        data: Some(json!({
            "cursor_position": [cx, cy],
            "foreground_window_title": window_title,
        })),
        error: None,
        completed_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remote_agent_common::model::WindowInfo;
    use std::sync::atomic::{AtomicI32, Ordering};

    struct FakeInput {
        cursor_x: AtomicI32,
        cursor_y: AtomicI32,
    }

    impl InputCapability for FakeInput {
        fn move_to(&self, x: i32, y: i32) -> remote_agent_capability::InputOutcome {
            self.cursor_x.store(x, Ordering::SeqCst);
            self.cursor_y.store(y, Ordering::SeqCst);
            remote_agent_capability::InputOutcome::ok(1)
        }
        fn click(
            &self,
            _x: i32,
            _y: i32,
            _button: remote_agent_common::model::MouseButton,
            _count: u32,
        ) -> remote_agent_capability::InputOutcome {
            remote_agent_capability::InputOutcome::ok(2)
        }
        fn drag(
            &self,
            _sx: i32,
            _sy: i32,
            ex: i32,
            ey: i32,
            _b: remote_agent_common::model::MouseButton,
            _d: f64,
            _s: i32,
        ) -> remote_agent_capability::InputOutcome {
            self.cursor_x.store(ex, Ordering::SeqCst);
            self.cursor_y.store(ey, Ordering::SeqCst);
            remote_agent_capability::InputOutcome::ok(3)
        }
        fn scroll(
            &self,
            _delta: i32,
            _x: Option<i32>,
            _y: Option<i32>,
            _h: bool,
        ) -> remote_agent_capability::InputOutcome {
            remote_agent_capability::InputOutcome::ok(1)
        }
        fn key_down(&self, _key: &str) -> remote_agent_capability::InputOutcome {
            remote_agent_capability::InputOutcome::ok(1)
        }
        fn key_up(&self, _key: &str) -> remote_agent_capability::InputOutcome {
            remote_agent_capability::InputOutcome::ok(1)
        }
        fn key_press(&self, _key: &str) -> remote_agent_capability::InputOutcome {
            remote_agent_capability::InputOutcome::ok(1)
        }
        fn hotkey(&self, _keys: &[String]) -> remote_agent_capability::InputOutcome {
            remote_agent_capability::InputOutcome::ok(1)
        }
        fn type_text(&self, text: &str, _i: f64, _u: bool) -> remote_agent_capability::InputOutcome {
            remote_agent_capability::InputOutcome::ok(text.len() as u32)
        }
        fn cursor_position(&self) -> (i32, i32) {
            (self.cursor_x.load(Ordering::SeqCst), self.cursor_y.load(Ordering::SeqCst))
        }
        fn screen_size(&self) -> (i32, i32) {
            (1920, 1080)
        }
        fn foreground_window_info(&self) -> Option<WindowInfo> {
            None
        }
    }

    #[tokio::test]
    async fn move_within_tolerance_succeeds() {
        let input: Arc<dyn InputCapability> = Arc::new(FakeInput {
            cursor_x: AtomicI32::new(0),
            cursor_y: AtomicI32::new(0),
        });
        let executor = CommandExecutor::new(input);
        let result = executor
            .execute(CommandParams::Move { x: 100, y: 200 })
            .await;
        assert!(result.success);
    }
}
