//! `POST /session/start`, `POST /session/end`. Bearer-auth;
//! gated by the kill switch at `start`.

use chrono::{DateTime, Utc};
use poem::web::Data;
use poem::Request;
use poem_openapi::payload::Json;
use poem_openapi::{Object, OpenApi};
use remote_agent_common::error::AgentError;
use remote_agent_common::model::AuditEvent;
use remote_agent_core::Coordinator;

use crate::auth::authenticate;
use crate::error::to_poem_error;
use crate::rate_limit::check_global;

pub struct Api;

#[derive(Object)]
struct SessionStartResponse {
    session_id: String,
    client_id: String,
    started_at: DateTime<Utc>,
    command_count: u64,
}

#[derive(Object)]
struct SessionEndBody {
    session_id: String,
}

#[derive(Object)]
struct SessionEndResponse {
    ended: bool,
    session_id: String,
    duration: f64,
    commands_executed: u64,
}

#[OpenApi]
impl Api {
    #[oai(path = "/session/start", method = "post", operation_id = "session_start")]
    async fn session_start(
        &self,
        req: &Request,
        coordinator: Data<&Coordinator>,
    ) -> poem::Result<Json<SessionStartResponse>> {
        check_global(&coordinator, &crate::auth::client_ip(req))
            .await
            .map_err(to_poem_error)?;
        let client_id = authenticate(&coordinator, req).await.map_err(to_poem_error)?;

        if coordinator.kill_switch.is_active().await {
            return Err(to_poem_error(AgentError::ServiceUnavailable(
                "kill switch is active".to_string(),
            )));
        }

        let session = coordinator
            .sessions
            .start(client_id.clone())
            .await
            .map_err(to_poem_error)?;

        coordinator
            .audit
            .emit(&AuditEvent::SessionStarted {
                client_id,
                session_id: session.id.clone(),
                timestamp: Utc::now(),
            })
            .await;

        Ok(Json(SessionStartResponse {
            session_id: session.id,
            client_id: session.client_id,
            started_at: session.started_at,
            command_count: session.command_count,
        }))
    }

    #[oai(path = "/session/end", method = "post", operation_id = "session_end")]
    async fn session_end(
        &self,
        req: &Request,
        coordinator: Data<&Coordinator>,
        body: Json<SessionEndBody>,
    ) -> poem::Result<Json<SessionEndResponse>> {
        check_global(&coordinator, &crate::auth::client_ip(req))
            .await
            .map_err(to_poem_error)?;
        let client_id = authenticate(&coordinator, req).await.map_err(to_poem_error)?;

        let session = coordinator
            .sessions
            .end(&body.0.session_id, &client_id)
            .await
            .map_err(to_poem_error)?;

        coordinator.queue.cancel_for_session(&session.id).await;

        coordinator
            .audit
            .emit(&AuditEvent::SessionEnded {
                client_id,
                session_id: session.id.clone(),
                reason: "client_requested".to_string(),
                timestamp: Utc::now(),
            })
            .await;

        let duration = session
            .ended_at
            .unwrap_or_else(Utc::now)
            .signed_duration_since(session.started_at)
            .num_milliseconds() as f64
            / 1000.0;

        Ok(Json(SessionEndResponse {
            ended: true,
            session_id: session.id,
            duration,
            commands_executed: session.command_count,
        }))
    }
}
