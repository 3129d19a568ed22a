//! `POST /commands`, `GET /commands/{id}`. Bearer-auth plus
//! the per-session rate limit (`commands:{session_id}`). Command bodies are
//! dynamically typed JSON on the wire ("dynamic command
//! dispatch"); they're accepted here as raw `serde_json::Value` and resolved
//! into the tagged `CommandParams` variant by `CommandQueue::submit`, which
//! is also where the whole-batch-atomic validation lives.

use poem::web::Data;
use poem::Request;
use poem_openapi::param::Path;
use poem_openapi::payload::Json;
use poem_openapi::OpenApi;
use remote_agent_common::error::AgentError;
use remote_agent_common::model::AuditEvent;
use remote_agent_core::queue::RawCommand;
use remote_agent_core::Coordinator;
use serde_json::{json, Value};

use crate::auth::authenticate;
use crate::error::to_poem_error;
use crate::rate_limit::{check_commands, check_global};

pub struct Api;

#[OpenApi]
impl Api {
    #[oai(path = "/commands", method = "post", operation_id = "submit_commands")]
    async fn submit_commands(
        &self,
        req: &Request,
        coordinator: Data<&Coordinator>,
        body: Json<Value>,
    ) -> poem::Result<Json<Value>> {
        check_global(&coordinator, &crate::auth::client_ip(req))
            .await
            .map_err(to_poem_error)?;
        let client_id = authenticate(&coordinator, req).await.map_err(to_poem_error)?;

        if coordinator.kill_switch.is_active().await {
            return Err(to_poem_error(AgentError::ServiceUnavailable(
                "kill switch is active".to_string(),
            )));
        }

        let session_id = body
            .0
            .get("session_id")
            .and_then(Value::as_str)
            .ok_or_else(|| to_poem_error(AgentError::InvalidArgument("session_id is required".to_string())))?
            .to_string();

        coordinator
            .sessions
            .validate(&session_id, &client_id)
            .await
            .map_err(to_poem_error)?;

        check_commands(&coordinator, &session_id)
            .await
            .map_err(to_poem_error)?;

        let raw_commands = body
            .0
            .get("commands")
            .and_then(Value::as_array)
            .ok_or_else(|| to_poem_error(AgentError::InvalidArgument("commands is required".to_string())))?;

        let mut batch = Vec::with_capacity(raw_commands.len());
        for raw in raw_commands {
            let command: RawCommand = serde_json::from_value(raw.clone()).map_err(|e| {
                to_poem_error(AgentError::InvalidArgument(format!("invalid command: {e}")))
            })?;
            batch.push(command);
        }

        let queued = coordinator
            .queue
            .submit(&session_id, &client_id, batch)
            .await
            .map_err(to_poem_error)?;

        for id in &queued {
            coordinator.sessions.increment_command_count(&session_id).await;
            coordinator
                .audit
                .emit(&AuditEvent::CommandQueued {
                    client_id: client_id.clone(),
                    command_id: id.clone(),
                    timestamp: chrono::Utc::now(),
                })
                .await;
        }

        Ok(Json(json!({ "queued": queued })))
    }

    #[oai(path = "/commands/:id", method = "get", operation_id = "get_command_status")]
    async fn get_command_status(
        &self,
        req: &Request,
        coordinator: Data<&Coordinator>,
        id: Path<String>,
    ) -> poem::Result<Json<Value>> {
        check_global(&coordinator, &crate::auth::client_ip(req))
            .await
            .map_err(to_poem_error)?;
        authenticate(&coordinator, req).await.map_err(to_poem_error)?;

        let command = coordinator
            .queue
            .get_status(&id.0)
            .await
            .map_err(to_poem_error)?;

        Ok(Json(json!({
            "id": command.id,
            "type": command.params.type_name(),
            "status": command.state,
            "result": command.result.as_ref().and_then(|r| r.data.clone()),
            "error": command.result.as_ref().and_then(|r| r.error.clone()),
        })))
    }
}
