//! Audit Sink: append-only JSONL event emission. Grounded on
//! `original_source/agent/audit/logger.py`'s event shape; rotation reuses
//! `tracing-appender`'s rolling-file-appender idiom rather than hand-rolling
//! size-based rotation, standing in for a "10 MB x 5 backups" default policy.
//! A failing write is logged and swallowed — the sink never blocks or fails
//! the operation that produced the event.

use std::io::Write;
use std::path::Path;

use remote_agent_common::model::AuditEvent;
use tokio::sync::Mutex;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, Rotation};

pub struct AuditSink {
    writer: Mutex<tracing_appender::non_blocking::NonBlocking>,
    _guard: WorkerGuard,
}

impl AuditSink {
    /// `tracing-appender` only rotates by time, not by size, so daily
    /// rotation capped at `max_backups` files stands in for a
    /// "10 MB x 5 backups" — documented in DESIGN.md as the idiomatic
    /// substitution (reusing the ambient logging crate rather than
    /// hand-rolling size-based rotation).
    pub fn new(
        directory: impl AsRef<Path>,
        file_name_prefix: &str,
        max_backups: usize,
    ) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&directory)?;
        let appender = Builder::new()
            .rotation(Rotation::DAILY)
            .filename_prefix(file_name_prefix)
            .max_log_files(max_backups)
            .build(directory)?;
        let (writer, guard) = tracing_appender::non_blocking(appender);
        Ok(Self {
            writer: Mutex::new(writer),
            _guard: guard,
        })
    }

    pub async fn emit(&self, event: &AuditEvent) {
        let line = match serde_json::to_string(event) {
            Ok(mut line) => {
                line.push('\n');
                line
            }
            Err(e) => {
                warn!(error = %e, "failed to serialize audit event");
                return;
            }
        };
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.write_all(line.as_bytes()) {
            warn!(error = %e, "failed to write audit event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn emit_does_not_panic_on_valid_dir() {
        let mut dir = std::env::temp_dir();
        dir.push(format!("remote-agent-audit-test-{}", uuid::Uuid::new_v4()));
        let sink = AuditSink::new(&dir, "audit.jsonl", 5).unwrap();
        sink.emit(&AuditEvent::Unpaired {
            client_id: "c-1".to_string(),
            timestamp: Utc::now(),
        })
        .await;
    }
}
