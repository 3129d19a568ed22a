use std::sync::Mutex;
use std::thread::sleep;
use std::time::Duration;

use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};
use remote_agent_common::model::{MouseButton, WindowInfo};

use crate::input::{InputCapability, InputOutcome};

/// Timing constants fixed by the keystroke/hold timing contract, kept on the concrete backend
/// (not the executor) per `original_source/agent/control/input_base.py`'s
/// placement of `KEY_PRESS_DELAY` et al. on `InputControllerBase`.
const KEY_PRESS_DELAY: Duration = Duration::from_millis(10);
const KEY_CHORD_DELAY: Duration = Duration::from_millis(20);
const TYPE_CHAR_DELAY_DEFAULT: Duration = Duration::from_millis(10);
const CLICK_DELAY: Duration = Duration::from_millis(20);
const DOUBLE_CLICK_DELAY: Duration = Duration::from_millis(50);

/// enigo's `Enigo` handle is not `Sync`; commands are dispatched one at a
/// time from the single queue worker, so a `std::sync::Mutex` (never held
/// across an await — the holder is inside `spawn_blocking`) is sufficient.
pub struct EnigoInputCapability {
    enigo: Mutex<Enigo>,
}

impl EnigoInputCapability {
    pub fn new() -> anyhow::Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| anyhow::anyhow!("failed to initialize input backend: {e}"))?;
        Ok(Self {
            enigo: Mutex::new(enigo),
        })
    }

    fn with_enigo<R>(&self, f: impl FnOnce(&mut Enigo) -> R) -> R {
        let mut guard = self.enigo.lock().expect("enigo mutex poisoned");
        f(&mut guard)
    }
}

fn to_enigo_button(button: MouseButton) -> Button {
    match button {
        MouseButton::Left => Button::Left,
        MouseButton::Right => Button::Right,
        MouseButton::Middle => Button::Middle,
        MouseButton::X1 => Button::Back,
        MouseButton::X2 => Button::Forward,
    }
}

/// Maps a normalized key name (post `keys::normalize_key_name`) to an enigo
/// `Key`. Single characters and unrecognized multi-character names fall back
/// to `Key::Unicode`, matching the original's permissive `type_text`/`key_*`
/// handling for anything not in `KEY_NAME_ALIASES`.
fn to_enigo_key(normalized: &str) -> Option<Key> {
    Some(match normalized {
        "control" => Key::Control,
        "alt" => Key::Alt,
        "shift" => Key::Shift,
        "super" => Key::Meta,
        "return" => Key::Return,
        "escape" => Key::Escape,
        "back" => Key::Backspace,
        "delete" => Key::Delete,
        "insert" => Key::Insert,
        "tab" => Key::Tab,
        "space" => Key::Space,
        "prior" => Key::PageUp,
        "next" => Key::PageDown,
        "home" => Key::Home,
        "end" => Key::End,
        "up" => Key::UpArrow,
        "down" => Key::DownArrow,
        "left" => Key::LeftArrow,
        "right" => Key::RightArrow,
        "caps_lock" => Key::CapsLock,
        "num_lock" => Key::Numlock,
        "print_screen" => Key::PrintScr,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        "volume_mute" => Key::VolumeMute,
        "volume_down" => Key::VolumeDown,
        "volume_up" => Key::VolumeUp,
        "media_next" => Key::MediaNextTrack,
        "media_prev" => Key::MediaPrevTrack,
        "media_stop" => Key::MediaStop,
        "media_play_pause" => Key::MediaPlayPause,
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Unicode(c),
                _ => return None,
            }
        }
    })
}

impl InputCapability for EnigoInputCapability {
    fn move_to(&self, x: i32, y: i32) -> InputOutcome {
        match self.with_enigo(|e| e.move_mouse(x, y, Coordinate::Abs)) {
            Ok(()) => InputOutcome::ok(1),
            Err(e) => InputOutcome::failed(e.to_string()),
        }
    }

    fn click(&self, x: i32, y: i32, button: MouseButton, count: u32) -> InputOutcome {
        let move_result = self.move_to(x, y);
        if !move_result.success {
            return move_result;
        }
        let btn = to_enigo_button(button);
        let mut events_sent = move_result.events_sent;
        for i in 0..count {
            if let Err(e) = self.with_enigo(|e| e.button(btn, Direction::Press)) {
                return InputOutcome::failed(e.to_string());
            }
            sleep(CLICK_DELAY);
            if let Err(e) = self.with_enigo(|e| e.button(btn, Direction::Release)) {
                return InputOutcome::failed(e.to_string());
            }
            events_sent += 2;
            if count > 1 && i + 1 < count {
                sleep(DOUBLE_CLICK_DELAY);
            }
        }
        InputOutcome::ok(events_sent)
    }

    fn drag(
        &self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        button: MouseButton,
        duration_secs: f64,
        steps: i32,
    ) -> InputOutcome {
        if let Err(e) = self.with_enigo(|e| e.move_mouse(start_x, start_y, Coordinate::Abs)) {
            return InputOutcome::failed(e.to_string());
        }
        let btn = to_enigo_button(button);
        if let Err(e) = self.with_enigo(|e| e.button(btn, Direction::Press)) {
            return InputOutcome::failed(e.to_string());
        }
        let mut events_sent = 2;
        if steps <= 0 {
            if let Err(e) = self.with_enigo(|e| e.move_mouse(end_x, end_y, Coordinate::Abs)) {
                return InputOutcome::failed(e.to_string());
            }
            events_sent += 1;
        } else {
            let step_delay = Duration::from_secs_f64((duration_secs / steps as f64).max(0.0));
            for i in 1..=steps {
                let t = i as f64 / steps as f64;
                let ix = start_x + ((end_x - start_x) as f64 * t).round() as i32;
                let iy = start_y + ((end_y - start_y) as f64 * t).round() as i32;
                if let Err(e) = self.with_enigo(|e| e.move_mouse(ix, iy, Coordinate::Abs)) {
                    return InputOutcome::failed(e.to_string());
                }
                events_sent += 1;
                sleep(step_delay);
            }
        }
        if let Err(e) = self.with_enigo(|e| e.button(btn, Direction::Release)) {
            return InputOutcome::failed(e.to_string());
        }
        events_sent += 1;
        InputOutcome::ok(events_sent)
    }

    fn scroll(&self, delta: i32, x: Option<i32>, y: Option<i32>, horizontal: bool) -> InputOutcome {
        if let (Some(x), Some(y)) = (x, y) {
            if let Err(e) = self.with_enigo(|e| e.move_mouse(x, y, Coordinate::Abs)) {
                return InputOutcome::failed(e.to_string());
            }
        }
        let axis = if horizontal {
            enigo::Axis::Horizontal
        } else {
            enigo::Axis::Vertical
        };
        match self.with_enigo(|e| e.scroll(delta, axis)) {
            Ok(()) => InputOutcome::ok(1),
            Err(e) => InputOutcome::failed(e.to_string()),
        }
    }

    fn key_down(&self, key: &str) -> InputOutcome {
        match to_enigo_key(key) {
            None => InputOutcome::failed(format!("Unknown key: {key}")),
            Some(k) => match self.with_enigo(|e| e.key(k, Direction::Press)) {
                Ok(()) => {
                    sleep(KEY_PRESS_DELAY);
                    InputOutcome::ok(1)
                }
                Err(e) => InputOutcome::failed(e.to_string()),
            },
        }
    }

    fn key_up(&self, key: &str) -> InputOutcome {
        match to_enigo_key(key) {
            None => InputOutcome::failed(format!("Unknown key: {key}")),
            Some(k) => match self.with_enigo(|e| e.key(k, Direction::Release)) {
                Ok(()) => InputOutcome::ok(1),
                Err(e) => InputOutcome::failed(e.to_string()),
            },
        }
    }

    fn key_press(&self, key: &str) -> InputOutcome {
        match to_enigo_key(key) {
            None => InputOutcome::failed(format!("Unknown key: {key}")),
            Some(k) => match self.with_enigo(|e| e.key(k, Direction::Click)) {
                Ok(()) => {
                    sleep(KEY_PRESS_DELAY);
                    InputOutcome::ok(1)
                }
                Err(e) => InputOutcome::failed(e.to_string()),
            },
        }
    }

    fn hotkey(&self, keys: &[String]) -> InputOutcome {
        let mut resolved = Vec::with_capacity(keys.len());
        for key in keys {
            match to_enigo_key(key) {
                Some(k) => resolved.push(k),
                None => return InputOutcome::failed(format!("Unknown key: {key}")),
            }
        }
        let mut events_sent = 0u32;
        for k in &resolved {
            if let Err(e) = self.with_enigo(|e| e.key(*k, Direction::Press)) {
                return InputOutcome::failed(e.to_string());
            }
            events_sent += 1;
            sleep(KEY_CHORD_DELAY);
        }
        for k in resolved.iter().rev() {
            if let Err(e) = self.with_enigo(|e| e.key(*k, Direction::Release)) {
                return InputOutcome::failed(e.to_string());
            }
            events_sent += 1;
        }
        InputOutcome::ok(events_sent)
    }

    fn type_text(&self, text: &str, interval_secs: f64, use_unicode: bool) -> InputOutcome {
        let _ = use_unicode; // enigo always types via Unicode input on this backend
        // `interval_secs <= 0.0` still types one character at a time, at the
        // fixed `TYPE_CHAR_DELAY_DEFAULT` per-character delay — a caller
        // passing 0 (the default) doesn't get a single bulk `text()` call.
        let delay = Duration::from_secs_f64(interval_secs.max(0.0));
        let mut events_sent = 0u32;
        for c in text.chars() {
            if let Err(e) = self.with_enigo(|e| e.key(Key::Unicode(c), Direction::Click)) {
                return InputOutcome::failed(e.to_string());
            }
            events_sent += 1;
            sleep(delay.max(TYPE_CHAR_DELAY_DEFAULT));
        }
        InputOutcome::ok(events_sent)
    }

    fn cursor_position(&self) -> (i32, i32) {
        self.with_enigo(|e| e.location().unwrap_or((0, 0)))
    }

    fn screen_size(&self) -> (i32, i32) {
        self.with_enigo(|e| e.main_display().unwrap_or((0, 0)))
    }

    fn foreground_window_info(&self) -> Option<WindowInfo> {
        // enigo has no window-inspection API; foreground window info is
        // best-effort and platform-specific. Left unimplemented here since
        // no portable crate in the workspace covers it — callers treat
        // `None` as "unknown", not an error.
        None
    }
}
