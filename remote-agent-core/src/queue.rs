//! Command Queue: bounded FIFO, single-worker dispatch, per-command timeout.
//! Grounded on `original_source/agent/api/commands.py`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use remote_agent_common::error::{AgentError, AgentResult};
use remote_agent_common::model::{
    AuditEvent, ClientId, Command, CommandId, CommandParams, CommandState, SessionId,
};
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::audit::AuditSink;
use crate::events::{CoreEvent, EventSender};
use crate::executor::CommandExecutor;

/// Raw, not-yet-validated command as received over the wire.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawCommand {
    pub id: CommandId,
    #[serde(flatten)]
    pub params: CommandParams,
}

struct Inner {
    directory: HashMap<CommandId, Command>,
}

pub struct CommandQueue {
    inner: Mutex<Inner>,
    sender: Sender<CommandId>,
    receiver: Mutex<Option<Receiver<CommandId>>>,
    capacity: usize,
    command_timeout: Duration,
    worker: Mutex<Option<JoinHandle<()>>>,
    stopping: Arc<AtomicBool>,
}

impl CommandQueue {
    pub fn new(capacity: usize, command_timeout_secs: u64) -> Self {
        let (sender, receiver) = channel(capacity);
        Self {
            inner: Mutex::new(Inner {
                directory: HashMap::new(),
            }),
            sender,
            receiver: Mutex::new(Some(receiver)),
            capacity,
            command_timeout: Duration::from_secs(command_timeout_secs),
            worker: Mutex::new(None),
            stopping: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Validates and queues a whole batch atomically: the entire batch is
    /// rejected on the first validation failure or duplicate id, and on
    /// queue-full, before any command in it is accepted.
    pub async fn submit(
        &self,
        session_id: &SessionId,
        client_id: &ClientId,
        batch: Vec<RawCommand>,
    ) -> AgentResult<Vec<CommandId>> {
        let mut inner = self.inner.lock().await;

        let mut seen_in_batch = std::collections::HashSet::new();
        for raw in &batch {
            if raw.id.is_empty() {
                return Err(AgentError::InvalidArgument("command id is required".to_string()));
            }
            if inner.directory.contains_key(&raw.id) || !seen_in_batch.insert(raw.id.clone()) {
                return Err(AgentError::InvalidArgument(format!(
                    "duplicate command id: {}",
                    raw.id
                )));
            }
            if let CommandParams::Hotkey { keys } = &raw.params {
                if keys.is_empty() {
                    return Err(AgentError::InvalidArgument(
                        "hotkey requires a non-empty keys list".to_string(),
                    ));
                }
            }
        }

        let pending_count = inner
            .directory
            .values()
            .filter(|c| matches!(c.state, CommandState::Queued | CommandState::Running))
            .count();
        if pending_count + batch.len() > self.capacity {
            return Err(AgentError::ServiceUnavailable(
                "Command queue is full".to_string(),
            ));
        }

        let mut accepted = Vec::with_capacity(batch.len());
        let now = Utc::now();
        for raw in batch {
            let command = Command {
                id: raw.id.clone(),
                session_id: session_id.clone(),
                client_id: client_id.clone(),
                params: raw.params,
                state: CommandState::Queued,
                created_at: now,
                started_at: None,
                completed_at: None,
                result: None,
            };
            inner.directory.insert(raw.id.clone(), command);
            accepted.push(raw.id);
        }
        drop(inner);

        for id in &accepted {
            if self.sender.send(id.clone()).await.is_err() {
                warn!("command worker channel closed while submitting");
                break;
            }
        }

        Ok(accepted)
    }

    pub async fn get_status(&self, id: &str) -> AgentResult<Command> {
        self.inner
            .lock()
            .await
            .directory
            .get(id)
            .cloned()
            .ok_or_else(|| AgentError::NotFound(format!("command {id}")))
    }

    /// Transitions every Queued command belonging to `session_id` to Failed
    /// with reason "Session ended"; Running commands are NOT preempted
    /// (an explicit open-question decision, preserved as documented in DESIGN.md).
    pub async fn cancel_for_session(&self, session_id: &str) -> usize {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let mut count = 0;
        for command in inner.directory.values_mut() {
            if command.session_id == session_id && command.state == CommandState::Queued {
                command.state = CommandState::Failed;
                command.completed_at = Some(now);
                command.result = Some(remote_agent_common::model::CommandResult {
                    success: false,
                    data: None,
                    error: Some("Session ended".to_string()),
                    completed_at: now,
                });
                count += 1;
            }
        }
        count
    }

    pub async fn clear_completed(&self, max_age: Duration) {
        let mut inner = self.inner.lock().await;
        let cutoff = Utc::now() - chrono::Duration::from_std(max_age).unwrap_or_default();
        inner.directory.retain(|_, command| {
            !matches!(command.state, CommandState::Succeeded | CommandState::Failed)
                || command.completed_at.map(|t| t > cutoff).unwrap_or(true)
        });
    }

    pub async fn start_processing(
        self: &Arc<Self>,
        executor: Arc<CommandExecutor>,
        events: EventSender,
        audit: Arc<AuditSink>,
    ) {
        let mut receiver_guard = self.receiver.lock().await;
        let Some(mut receiver) = receiver_guard.take() else {
            return; // already started
        };
        drop(receiver_guard);

        let queue = self.clone();
        let stopping = self.stopping.clone();
        let timeout = self.command_timeout;

        let handle = tokio::spawn(async move {
            loop {
                let next = tokio::time::timeout(Duration::from_secs(1), receiver.recv()).await;
                if stopping.load(Ordering::SeqCst) {
                    break;
                }
                let Ok(Some(id)) = next else {
                    continue;
                };
                queue.process_one(&id, &executor, &events, &audit, timeout).await;
            }
        });
        *self.worker.lock().await = Some(handle);
    }

    async fn process_one(
        &self,
        id: &str,
        executor: &CommandExecutor,
        events: &EventSender,
        audit: &AuditSink,
        timeout: Duration,
    ) {
        let (params, client_id) = {
            let mut inner = self.inner.lock().await;
            let Some(command) = inner.directory.get_mut(id) else {
                return;
            };
            // Already terminal (e.g. cancelled while queued) — skip.
            if command.state != CommandState::Queued {
                return;
            }
            command.state = CommandState::Running;
            command.started_at = Some(Utc::now());
            (command.params.clone(), command.client_id.clone())
        };

        let result = match tokio::time::timeout(timeout, executor.execute(params)).await {
            Ok(result) => result,
            Err(_) => remote_agent_common::model::CommandResult {
                success: false,
                data: None,
                error: Some(format!("Command timed out after {:.1}s", timeout.as_secs_f64())),
                completed_at: Utc::now(),
            },
        };

        let (status, error) = {
            let mut inner = self.inner.lock().await;
            let Some(command) = inner.directory.get_mut(id) else {
                return;
            };
            command.state = if result.success {
                CommandState::Succeeded
            } else {
                CommandState::Failed
            };
            command.completed_at = Some(result.completed_at);
            command.result = Some(result.clone());
            (command.state, result.error.clone())
        };

        audit
            .emit(&AuditEvent::CommandCompleted {
                client_id,
                command_id: id.to_string(),
                success: status == CommandState::Succeeded,
                timestamp: Utc::now(),
            })
            .await;

        events
            .send(CoreEvent::CommandDone {
                id: id.to_string(),
                status,
                result: Some(result),
                error,
            })
            .await;
    }

    pub async fn stop_processing(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        if let Some(handle) = self.worker.lock().await.take() {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventHub;
    use remote_agent_capability::InputCapability;
    use remote_agent_common::model::WindowInfo;

    struct NoopInput;
    impl InputCapability for NoopInput {
        fn move_to(&self, _x: i32, _y: i32) -> remote_agent_capability::InputOutcome {
            remote_agent_capability::InputOutcome::ok(1)
        }
        fn click(
            &self,
            _x: i32,
            _y: i32,
            _b: remote_agent_common::model::MouseButton,
            _c: u32,
        ) -> remote_agent_capability::InputOutcome {
            remote_agent_capability::InputOutcome::ok(1)
        }
        fn drag(
            &self,
            _sx: i32,
            _sy: i32,
            _ex: i32,
            _ey: i32,
            _b: remote_agent_common::model::MouseButton,
            _d: f64,
            _s: i32,
        ) -> remote_agent_capability::InputOutcome {
            remote_agent_capability::InputOutcome::ok(1)
        }
        fn scroll(
            &self,
            _d: i32,
            _x: Option<i32>,
            _y: Option<i32>,
            _h: bool,
        ) -> remote_agent_capability::InputOutcome {
            remote_agent_capability::InputOutcome::ok(1)
        }
        fn key_down(&self, _k: &str) -> remote_agent_capability::InputOutcome {
            remote_agent_capability::InputOutcome::ok(1)
        }
        fn key_up(&self, _k: &str) -> remote_agent_capability::InputOutcome {
            remote_agent_capability::InputOutcome::ok(1)
        }
        fn key_press(&self, _k: &str) -> remote_agent_capability::InputOutcome {
            remote_agent_capability::InputOutcome::ok(1)
        }
        fn hotkey(&self, _k: &[String]) -> remote_agent_capability::InputOutcome {
            remote_agent_capability::InputOutcome::ok(1)
        }
        fn type_text(&self, _t: &str, _i: f64, _u: bool) -> remote_agent_capability::InputOutcome {
            remote_agent_capability::InputOutcome::ok(1)
        }
        fn cursor_position(&self) -> (i32, i32) {
            (0, 0)
        }
        fn screen_size(&self) -> (i32, i32) {
            (1920, 1080)
        }
        fn foreground_window_info(&self) -> Option<WindowInfo> {
            None
        }
    }

    #[tokio::test]
    async fn duplicate_id_rejects_whole_batch() {
        let queue = Arc::new(CommandQueue::new(1000, 30));
        let batch = vec![
            RawCommand {
                id: "k1".to_string(),
                params: CommandParams::Move { x: 1, y: 1 },
            },
            RawCommand {
                id: "k1".to_string(),
                params: CommandParams::Move { x: 2, y: 2 },
            },
        ];
        let err = queue
            .submit(&"s1".to_string(), &"c1".to_string(), batch)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidArgument(_)));
        assert!(queue.get_status("k1").await.is_err());
    }

    #[tokio::test]
    async fn hotkey_with_empty_keys_rejects_batch() {
        let queue = Arc::new(CommandQueue::new(1000, 30));
        let batch = vec![RawCommand {
            id: "k1".to_string(),
            params: CommandParams::Hotkey { keys: vec![] },
        }];
        let err = queue
            .submit(&"s1".to_string(), &"c1".to_string(), batch)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn queue_full_rejects_whole_batch() {
        let queue = Arc::new(CommandQueue::new(2, 30));
        let batch = (0..3)
            .map(|i| RawCommand {
                id: format!("k{i}"),
                params: CommandParams::Move { x: 0, y: 0 },
            })
            .collect();
        let err = queue
            .submit(&"s1".to_string(), &"c1".to_string(), batch)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn completed_commands_free_capacity_after_gc() {
        let queue = Arc::new(CommandQueue::new(1, 30));
        queue
            .submit(
                &"s1".to_string(),
                &"c1".to_string(),
                vec![RawCommand {
                    id: "k1".to_string(),
                    params: CommandParams::Move { x: 0, y: 0 },
                }],
            )
            .await
            .unwrap();
        queue.cancel_for_session("s1").await;
        let err = queue
            .submit(
                &"s1".to_string(),
                &"c1".to_string(),
                vec![RawCommand {
                    id: "k2".to_string(),
                    params: CommandParams::Move { x: 0, y: 0 },
                }],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ServiceUnavailable(_)));

        queue.clear_completed(Duration::from_secs(0)).await;
        queue
            .submit(
                &"s1".to_string(),
                &"c1".to_string(),
                vec![RawCommand {
                    id: "k2".to_string(),
                    params: CommandParams::Move { x: 0, y: 0 },
                }],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancel_for_session_marks_queued_failed() {
        let queue = Arc::new(CommandQueue::new(1000, 30));
        queue
            .submit(
                &"s1".to_string(),
                &"c1".to_string(),
                vec![RawCommand {
                    id: "k1".to_string(),
                    params: CommandParams::Move { x: 0, y: 0 },
                }],
            )
            .await
            .unwrap();
        let cancelled = queue.cancel_for_session("s1").await;
        assert_eq!(cancelled, 1);
        let command = queue.get_status("k1").await.unwrap();
        assert_eq!(command.state, CommandState::Failed);
    }

    #[tokio::test]
    async fn processed_command_reaches_terminal_state() {
        let queue = Arc::new(CommandQueue::new(1000, 30));
        let (_hub, events) = EventHub::setup();
        let executor = Arc::new(CommandExecutor::new(Arc::new(NoopInput)));
        queue
            .clone()
            .start_processing(executor, events, test_audit_sink())
            .await;
        queue
            .submit(
                &"s1".to_string(),
                &"c1".to_string(),
                vec![RawCommand {
                    id: "k1".to_string(),
                    params: CommandParams::Move { x: 0, y: 0 },
                }],
            )
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let command = queue.get_status("k1").await.unwrap();
        assert_ne!(command.state, CommandState::Queued);
        queue.stop_processing().await;
    }

    fn test_audit_sink() -> Arc<AuditSink> {
        let mut dir = std::env::temp_dir();
        dir.push(format!("remote-agent-queue-audit-test-{}", uuid::Uuid::new_v4()));
        Arc::new(AuditSink::new(&dir, "audit", 1).unwrap())
    }
}
