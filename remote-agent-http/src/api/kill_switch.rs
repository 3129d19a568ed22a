//! `POST /kill-switch/activate`, `POST /kill-switch/deactivate`,
//! `GET /kill-switch/status`. Bearer-auth; any paired client
//! may activate or deactivate (no separate operator
//! role).

use chrono::{DateTime, Utc};
use poem::web::Data;
use poem::Request;
use poem_openapi::payload::Json;
use poem_openapi::{Object, OpenApi};
use remote_agent_common::model::AuditEvent;
use remote_agent_core::Coordinator;

use crate::auth::authenticate;
use crate::error::to_poem_error;
use crate::rate_limit::check_global;

pub struct Api;

#[derive(Object)]
struct ActivateBody {
    reason: Option<String>,
}

#[derive(Object)]
struct ActivateResponse {
    activated: bool,
    sessions_terminated: usize,
    message: String,
}

#[derive(Object)]
struct DeactivateResponse {
    activated: bool,
    was_active: bool,
}

#[derive(Object)]
struct StatusResponse {
    active: bool,
    activated_at: Option<DateTime<Utc>>,
    activated_by: Option<String>,
    reason: Option<String>,
}

#[OpenApi]
impl Api {
    #[oai(path = "/kill-switch/activate", method = "post", operation_id = "kill_switch_activate")]
    async fn activate(
        &self,
        req: &Request,
        coordinator: Data<&Coordinator>,
        body: Json<ActivateBody>,
    ) -> poem::Result<Json<ActivateResponse>> {
        check_global(&coordinator, &crate::auth::client_ip(req))
            .await
            .map_err(to_poem_error)?;
        let client_id = authenticate(&coordinator, req).await.map_err(to_poem_error)?;

        let reason = body.0.reason.unwrap_or_else(|| "kill_switch".to_string());
        let outcome = coordinator
            .kill_switch
            .activate(
                client_id.clone(),
                reason.clone(),
                &coordinator.sessions,
                &coordinator.queue,
                &coordinator.events,
            )
            .await;

        coordinator
            .audit
            .emit(&AuditEvent::KillSwitchActivated {
                by: client_id,
                timestamp: Utc::now(),
            })
            .await;

        Ok(Json(ActivateResponse {
            activated: true,
            sessions_terminated: outcome.terminated_count,
            message: "kill switch activated".to_string(),
        }))
    }

    #[oai(path = "/kill-switch/deactivate", method = "post", operation_id = "kill_switch_deactivate")]
    async fn deactivate(
        &self,
        req: &Request,
        coordinator: Data<&Coordinator>,
    ) -> poem::Result<Json<DeactivateResponse>> {
        check_global(&coordinator, &crate::auth::client_ip(req))
            .await
            .map_err(to_poem_error)?;
        authenticate(&coordinator, req).await.map_err(to_poem_error)?;

        let outcome = coordinator.kill_switch.deactivate(&coordinator.events).await;

        coordinator
            .audit
            .emit(&AuditEvent::KillSwitchDeactivated {
                timestamp: Utc::now(),
            })
            .await;

        Ok(Json(DeactivateResponse {
            activated: false,
            was_active: outcome.was_active,
        }))
    }

    #[oai(path = "/kill-switch/status", method = "get", operation_id = "kill_switch_status")]
    async fn status(
        &self,
        req: &Request,
        coordinator: Data<&Coordinator>,
    ) -> poem::Result<Json<StatusResponse>> {
        check_global(&coordinator, &crate::auth::client_ip(req))
            .await
            .map_err(to_poem_error)?;
        authenticate(&coordinator, req).await.map_err(to_poem_error)?;

        let snapshot = coordinator.kill_switch.snapshot().await;
        Ok(Json(StatusResponse {
            active: snapshot.active,
            activated_at: snapshot.activated_at,
            activated_by: snapshot.activated_by,
            reason: snapshot.reason,
        }))
    }
}
