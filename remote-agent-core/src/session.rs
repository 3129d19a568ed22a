//! Session Manager. Grounded on `original_source/agent/api/session.py`:
//! single active session per client, lazy expiry checked on every read path.

use std::collections::HashMap;

use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use remote_agent_common::error::{AgentError, AgentResult};
use remote_agent_common::model::{ClientId, Session, SessionId, SessionState};
use tokio::sync::Mutex;

const SESSION_ID_LENGTH_BYTES: usize = 16;

struct Inner {
    sessions: HashMap<SessionId, Session>,
    /// Client -> currently-active session id, mirrors the original's
    /// `_client_sessions` index used to enforce single-active-per-client.
    active_by_client: HashMap<ClientId, SessionId>,
}

pub struct SessionManager {
    inner: Mutex<Inner>,
    max_duration: ChronoDuration,
}

impl SessionManager {
    pub fn new(max_duration_secs: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                sessions: HashMap::new(),
                active_by_client: HashMap::new(),
            }),
            max_duration: ChronoDuration::seconds(max_duration_secs as i64),
        }
    }

    fn is_expired(&self, session: &Session) -> bool {
        session.state == SessionState::Active
            && Utc::now() > session.started_at + self.max_duration
    }

    /// Marks an Active-but-expired session Ended in place. No-op otherwise.
    fn lazily_expire(&self, session: &mut Session) {
        if self.is_expired(session) {
            session.state = SessionState::Ended;
            session.ended_at = Some(Utc::now());
        }
    }

    pub async fn start(&self, client_id: ClientId) -> AgentResult<Session> {
        let mut inner = self.inner.lock().await;

        if let Some(existing_id) = inner.active_by_client.get(&client_id).cloned() {
            if let Some(existing) = inner.sessions.get_mut(&existing_id) {
                self.lazily_expire(existing);
                if existing.state == SessionState::Active {
                    return Err(AgentError::Conflict(
                        "client already has an active session".to_string(),
                    ));
                }
            }
            inner.active_by_client.remove(&client_id);
        }

        let mut bytes = [0u8; SESSION_ID_LENGTH_BYTES];
        rand::thread_rng().fill(&mut bytes[..]);
        let session_id = data_encoding::HEXLOWER.encode(&bytes);

        let session = Session {
            id: session_id.clone(),
            client_id: client_id.clone(),
            started_at: Utc::now(),
            ended_at: None,
            state: SessionState::Active,
            command_count: 0,
        };
        inner.sessions.insert(session_id.clone(), session.clone());
        inner.active_by_client.insert(client_id, session_id);
        Ok(session)
    }

    pub async fn end(&self, session_id: &str, client_id: &str) -> AgentResult<Session> {
        let mut inner = self.inner.lock().await;
        let session = inner
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| AgentError::NotFound(format!("session {session_id}")))?;
        if session.client_id != client_id {
            return Err(AgentError::Forbidden);
        }
        self.lazily_expire(session);
        if session.state != SessionState::Active {
            return Err(AgentError::Conflict("session is not active".to_string()));
        }
        session.state = SessionState::Ended;
        session.ended_at = Some(Utc::now());
        let result = session.clone();
        inner.active_by_client.remove(client_id);
        Ok(result)
    }

    /// Used by the submission path: additionally promotes expired Active
    /// sessions to Ended and reports the resulting `NotActive`-equivalent
    /// (surfaced here as `Conflict`, mapping "NotActive" to
    /// the same family as an owner/state mismatch on the submission path).
    pub async fn validate(&self, session_id: &str, client_id: &str) -> AgentResult<Session> {
        let mut inner = self.inner.lock().await;
        let session = inner
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| AgentError::NotFound(format!("session {session_id}")))?;
        if session.client_id != client_id {
            return Err(AgentError::Forbidden);
        }
        self.lazily_expire(session);
        if session.state != SessionState::Active {
            return Err(AgentError::Conflict("session is not active".to_string()));
        }
        Ok(session.clone())
    }

    pub async fn increment_command_count(&self, session_id: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(session) = inner.sessions.get_mut(session_id) {
            session.command_count += 1;
        }
    }

    pub async fn get_active(&self) -> Vec<Session> {
        let mut inner = self.inner.lock().await;
        let ids: Vec<SessionId> = inner.sessions.keys().cloned().collect();
        for id in ids {
            if let Some(session) = inner.sessions.get_mut(&id) {
                self.lazily_expire(session);
            }
        }
        inner
            .sessions
            .values()
            .filter(|s| s.state == SessionState::Active)
            .cloned()
            .collect()
    }

    /// Terminates all Active sessions; idempotent (a second call returns 0).
    pub async fn force_end_all(&self) -> usize {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let mut count = 0;
        for session in inner.sessions.values_mut() {
            if session.state == SessionState::Active {
                session.state = SessionState::Ended;
                session.ended_at = Some(now);
                count += 1;
            }
        }
        inner.active_by_client.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn only_one_active_session_per_client() {
        let manager = SessionManager::new(3600);
        manager.start("c-1".to_string()).await.unwrap();
        let err = manager.start("c-1".to_string()).await.unwrap_err();
        assert!(matches!(err, AgentError::Conflict(_)));
    }

    #[tokio::test]
    async fn force_end_all_is_idempotent() {
        let manager = SessionManager::new(3600);
        manager.start("c-1".to_string()).await.unwrap();
        assert_eq!(manager.force_end_all().await, 1);
        assert_eq!(manager.force_end_all().await, 0);
    }

    #[tokio::test]
    async fn end_requires_matching_owner() {
        let manager = SessionManager::new(3600);
        let session = manager.start("c-1".to_string()).await.unwrap();
        let err = manager.end(&session.id, "c-2").await.unwrap_err();
        assert!(matches!(err, AgentError::Forbidden));
    }

    #[tokio::test]
    async fn expired_session_is_lazily_promoted_on_validate() {
        let manager = SessionManager::new(0);
        let session = manager.start("c-1".to_string()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let err = manager.validate(&session.id, "c-1").await.unwrap_err();
        assert!(matches!(err, AgentError::Conflict(_)));
    }
}
