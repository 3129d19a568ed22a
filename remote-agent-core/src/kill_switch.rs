//! Kill Switch Coordinator: the process-wide emergency gate consulted by
//! `session/start` and command submission.

use chrono::Utc;
use remote_agent_common::model::{ClientId, KillSwitchState};
use tokio::sync::Mutex;

use crate::events::{CoreEvent, EventSender};
use crate::queue::CommandQueue;
use crate::session::SessionManager;

pub struct KillSwitchCoordinator {
    state: Mutex<KillSwitchState>,
}

pub struct ActivateOutcome {
    pub terminated_count: usize,
}

pub struct DeactivateOutcome {
    pub was_active: bool,
}

impl KillSwitchCoordinator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(KillSwitchState::default()),
        }
    }

    pub async fn is_active(&self) -> bool {
        self.state.lock().await.active
    }

    pub async fn snapshot(&self) -> KillSwitchState {
        self.state.lock().await.clone()
    }

    /// Captures the active-session snapshot, cancels queued commands for
    /// each of those sessions, force-ends all sessions, flips the state,
    /// then broadcasts `kill_switch`. Ordering: the
    /// broadcast happens after sessions are Ended and their queued commands
    /// are cancelled.
    pub async fn activate(
        &self,
        activating_client: ClientId,
        reason: String,
        sessions: &SessionManager,
        queue: &CommandQueue,
        events: &EventSender,
    ) -> ActivateOutcome {
        let active_sessions = sessions.get_active().await;
        for session in &active_sessions {
            queue.cancel_for_session(&session.id).await;
        }
        let terminated_count = sessions.force_end_all().await;

        let mut state = self.state.lock().await;
        state.active = true;
        state.activated_at = Some(Utc::now());
        state.activated_by = Some(activating_client.clone());
        state.reason = Some(reason.clone());
        drop(state);

        events
            .send(CoreEvent::KillSwitch {
                activated: true,
                activated_by: Some(activating_client),
                reason: Some(reason),
            })
            .await;

        ActivateOutcome { terminated_count }
    }

    pub async fn deactivate(&self, events: &EventSender) -> DeactivateOutcome {
        let mut state = self.state.lock().await;
        let was_active = state.active;
        *state = KillSwitchState::default();
        drop(state);

        events
            .send(CoreEvent::KillSwitch {
                activated: false,
                activated_by: None,
                reason: None,
            })
            .await;

        DeactivateOutcome { was_active }
    }
}

impl Default for KillSwitchCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventHub;
    use std::sync::Arc;

    #[tokio::test]
    async fn activate_then_deactivate_restores_session_start() {
        let coordinator = KillSwitchCoordinator::new();
        let sessions = SessionManager::new(3600);
        let queue = Arc::new(CommandQueue::new(1000, 30));
        let (_hub, events) = EventHub::setup();

        sessions.start("c-1".to_string()).await.unwrap();
        assert!(!coordinator.is_active().await);

        let outcome = coordinator
            .activate(
                "c-admin".to_string(),
                "kill_switch".to_string(),
                &sessions,
                &queue,
                &events,
            )
            .await;
        assert_eq!(outcome.terminated_count, 1);
        assert!(coordinator.is_active().await);

        let deactivate = coordinator.deactivate(&events).await;
        assert!(deactivate.was_active);
        assert!(!coordinator.is_active().await);

        // Session start works again after deactivation.
        sessions.start("c-1".to_string()).await.unwrap();
    }
}
