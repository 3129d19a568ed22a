//! The wire-level event taxonomy fanned out over `/events`. Distinct from
//! `remote_agent_common::model::AuditEvent` (the append-only audit record);
//! this is the live, best-effort broadcast the event bus describes.

use remote_agent_common::model::{ClientId, CommandId, CommandResult, CommandState};

#[derive(Debug, Clone)]
pub enum CoreEvent {
    CommandDone {
        id: CommandId,
        status: CommandState,
        result: Option<CommandResult>,
        error: Option<String>,
    },
    KillSwitch {
        activated: bool,
        activated_by: Option<ClientId>,
        reason: Option<String>,
    },
    Frame {
        data_base64: String,
        timestamp_ms: i64,
        quality: u8,
        size_bytes: usize,
    },
}

pub type EventHub = remote_agent_common::eventhub::EventHub<CoreEvent>;
pub type EventSender = remote_agent_common::eventhub::EventSender<CoreEvent>;
pub type EventSubscription = remote_agent_common::eventhub::EventSubscription<CoreEvent>;

/// Filter matching only command-lifecycle events for `session_id`'s owner
/// is the caller's responsibility (commands don't carry a session id here);
/// subscribers that only want `frame` events use this filter.
pub fn is_frame(event: &CoreEvent) -> bool {
    matches!(event, CoreEvent::Frame { .. })
}

pub fn is_not_frame(event: &CoreEvent) -> bool {
    !is_frame(event)
}
