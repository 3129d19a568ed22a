//! Shared data model: the record types every crate in the workspace passes
//! across API/queue/event-bus boundaries, with
//! `WindowInfo` / `VerificationState` supplemented from
//! `original_source/agent/control/verify_base.py` and `AuditEvent`
//! supplemented from `original_source/agent/audit/logger.py`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ClientId = String;
pub type SessionId = String;
pub type CommandId = String;

/// A client that has completed the pairing handshake and holds a bearer
/// credential. Mutated only by re-pairing (replace) or unpair (delete).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairedClient {
    pub client_id: ClientId,
    pub client_name: String,
    pub public_key_pem: String,
    /// Hex-encoded SHA-256 digest of the bearer token. The plaintext token
    /// is returned to the client exactly once and never stored.
    pub token_hash: String,
    pub paired_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingState {
    Pending,
    Approved,
    Rejected,
    Expired,
}

/// Transient record created on `/pair/request`, consumed on `/pair/confirm`
/// or garbage-collected past `expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingPairing {
    pub client_id: ClientId,
    pub client_name: String,
    pub public_key_pem: String,
    /// 32 bytes of cryptographic randomness, hex-encoded.
    pub challenge: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub state: PairingState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Ended,
}

/// Invariant: at most one `Active` session per `client_id`; a session is
/// `Active` iff `ended_at.is_none() && started_at + max_duration > now`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub client_id: ClientId,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub state: SessionState,
    pub command_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    X1,
    X2,
}

impl Default for MouseButton {
    fn default() -> Self {
        MouseButton::Left
    }
}

/// The validated parameter shape of a command, post per-type validation.
/// Dynamic dispatch on a string `type` field (the original shape) is
/// resolved once at submission time into this tagged variant rather than
/// carried as a generic property bag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandParams {
    Click {
        x: i32,
        y: i32,
        #[serde(default)]
        button: MouseButton,
    },
    DoubleClick {
        x: i32,
        y: i32,
    },
    RightClick {
        x: i32,
        y: i32,
    },
    Move {
        x: i32,
        y: i32,
    },
    Drag {
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        #[serde(default)]
        button: MouseButton,
        #[serde(default = "default_drag_duration")]
        duration: f64,
        #[serde(default = "default_drag_steps")]
        steps: i32,
    },
    Type {
        text: String,
        #[serde(default)]
        interval: f64,
    },
    Hotkey {
        keys: Vec<String>,
    },
    KeyDown {
        key: String,
    },
    KeyUp {
        key: String,
    },
    KeyPress {
        key: String,
    },
    Scroll {
        delta: i32,
        #[serde(default)]
        x: Option<i32>,
        #[serde(default)]
        y: Option<i32>,
        #[serde(default)]
        horizontal: bool,
    },
}

fn default_drag_duration() -> f64 {
    0.5
}

fn default_drag_steps() -> i32 {
    20
}

impl CommandParams {
    /// The wire-level type name, as used in the command-type table.
    pub fn type_name(&self) -> &'static str {
        match self {
            CommandParams::Click { .. } => "click",
            CommandParams::DoubleClick { .. } => "double_click",
            CommandParams::RightClick { .. } => "right_click",
            CommandParams::Move { .. } => "move",
            CommandParams::Drag { .. } => "drag",
            CommandParams::Type { .. } => "type",
            CommandParams::Hotkey { .. } => "hotkey",
            CommandParams::KeyDown { .. } => "key_down",
            CommandParams::KeyUp { .. } => "key_up",
            CommandParams::KeyPress { .. } => "key_press",
            CommandParams::Scroll { .. } => "scroll",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

/// Invariants: identifiers are globally unique within the process;
/// transitions are monotone (`Queued` -> `Running` -> terminal).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub id: CommandId,
    pub session_id: SessionId,
    pub client_id: ClientId,
    pub params: CommandParams,
    pub state: CommandState,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<CommandResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Process-wide singleton. `active` gates `session/start` and command
/// submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KillSwitchState {
    pub active: bool,
    pub activated_at: Option<DateTime<Utc>>,
    pub activated_by: Option<ClientId>,
    pub reason: Option<String>,
}

/// Structured shape behind `foreground_window_info()`, supplemented from
/// `original_source/agent/control/verify_base.py`'s `WindowInfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowInfo {
    pub handle: i64,
    pub title: String,
    pub class_name: String,
    pub process_id: u32,
    /// `(left, top, right, bottom)`.
    pub rect: Option<(i32, i32, i32, i32)>,
}

/// Snapshot the executor diffs before/after a move or drag, supplemented
/// from `verify_base.py`'s `VerificationState`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationState {
    pub timestamp: DateTime<Utc>,
    pub cursor: (i32, i32),
    pub foreground_window: Option<WindowInfo>,
}

/// Tagged audit event, one serialized per line (JSONL) by the audit sink.
/// Taxonomy supplemented from `original_source/agent/audit/logger.py`;
/// Detailed analysis tooling over the sink itself (not this taxonomy) is out of scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    PairRequested {
        client_id: ClientId,
        timestamp: DateTime<Utc>,
    },
    PairConfirmed {
        client_id: ClientId,
        timestamp: DateTime<Utc>,
    },
    Unpaired {
        client_id: ClientId,
        timestamp: DateTime<Utc>,
    },
    SessionStarted {
        client_id: ClientId,
        session_id: SessionId,
        timestamp: DateTime<Utc>,
    },
    SessionEnded {
        client_id: ClientId,
        session_id: SessionId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    CommandQueued {
        client_id: ClientId,
        command_id: CommandId,
        timestamp: DateTime<Utc>,
    },
    CommandCompleted {
        client_id: ClientId,
        command_id: CommandId,
        success: bool,
        timestamp: DateTime<Utc>,
    },
    KillSwitchActivated {
        by: ClientId,
        timestamp: DateTime<Utc>,
    },
    KillSwitchDeactivated {
        timestamp: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_params_round_trip_type_name() {
        let p = CommandParams::Click {
            x: 1,
            y: 2,
            button: MouseButton::Left,
        };
        assert_eq!(p.type_name(), "click");
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["type"], "click");
    }

    #[test]
    fn drag_defaults_are_sane() {
        let json = serde_json::json!({
            "type": "drag",
            "start_x": 0,
            "start_y": 0,
            "end_x": 10,
            "end_y": 10
        });
        let params: CommandParams = serde_json::from_value(json).unwrap();
        match params {
            CommandParams::Drag {
                duration, steps, ..
            } => {
                assert_eq!(duration, 0.5);
                assert_eq!(steps, 20);
            }
            _ => panic!("expected drag"),
        }
    }
}
