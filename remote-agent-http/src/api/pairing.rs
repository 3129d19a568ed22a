//! `POST /pair/request`, `POST /pair/confirm`, `POST /pair/approve`,
//! `POST /pair/reject`. Unauthenticated, rate-limited per IP
//! (`pairing:{ip}`). `approve`/`reject` are additionally restricted to
//! loopback callers — they're the out-of-band operator decision for a
//! `Pending` request and this agent has no other local console surface
//! to gate them behind.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use poem::web::Data;
use poem::Request;
use poem_openapi::payload::Json;
use poem_openapi::{Object, OpenApi};
use remote_agent_common::error::AgentError;
use remote_agent_common::model::AuditEvent;
use remote_agent_core::Coordinator;

use crate::auth::{client_ip, is_loopback};
use crate::error::to_poem_error;
use crate::rate_limit::check_pairing;

pub struct Api;

#[derive(Object)]
struct PairRequestBody {
    client_id: String,
    client_name: String,
    public_key: String,
}

#[derive(Object)]
struct PairRequestResponse {
    challenge: String,
    expires: chrono::DateTime<chrono::Utc>,
    auto_approved: bool,
}

#[derive(Object)]
struct PairConfirmBody {
    client_id: String,
    /// Base64-encoded PKCS#1 v1.5 SHA-256 signature of `challenge`.
    signed_challenge: String,
}

#[derive(Object)]
struct PairConfirmResponse {
    paired: bool,
    token: String,
    client_id: String,
}

#[derive(Object)]
struct PairDecisionBody {
    client_id: String,
}

#[derive(Object)]
struct PairDecisionResponse {
    resolved: bool,
}

#[OpenApi]
impl Api {
    #[oai(path = "/pair/request", method = "post", operation_id = "pair_request")]
    async fn pair_request(
        &self,
        req: &Request,
        coordinator: Data<&Coordinator>,
        body: Json<PairRequestBody>,
    ) -> poem::Result<Json<PairRequestResponse>> {
        check_pairing(&coordinator, &client_ip(req))
            .await
            .map_err(to_poem_error)?;

        let client_id = body.0.client_id.clone();
        let outcome = coordinator
            .pairing
            .request_pairing(
                body.0.client_id,
                body.0.client_name,
                body.0.public_key,
            )
            .await
            .map_err(to_poem_error)?;

        coordinator
            .audit
            .emit(&AuditEvent::PairRequested {
                client_id,
                timestamp: chrono::Utc::now(),
            })
            .await;

        Ok(Json(PairRequestResponse {
            challenge: outcome.challenge,
            expires: outcome.expires_at,
            auto_approved: outcome.auto_approved,
        }))
    }

    #[oai(path = "/pair/confirm", method = "post", operation_id = "pair_confirm")]
    async fn pair_confirm(
        &self,
        req: &Request,
        coordinator: Data<&Coordinator>,
        body: Json<PairConfirmBody>,
    ) -> poem::Result<Json<PairConfirmResponse>> {
        check_pairing(&coordinator, &client_ip(req))
            .await
            .map_err(to_poem_error)?;

        let signature_bytes = BASE64
            .decode(&body.0.signed_challenge)
            .map_err(|e| to_poem_error(AgentError::InvalidArgument(format!("invalid base64 signature: {e}"))))?;

        // Out-of-band approval callback: in LAN mode `request_pairing`
        // already left the record `Approved`, so this closure only runs
        // outside LAN mode, where this handler has no synchronous operator
        // decision to consult inline. Reject rather than auto-approve — an
        // operator grants approval ahead of time via `POST /pair/approve`
        // (`PairingManager::approve_request`), which flips the record to
        // `Approved` before the client ever calls confirm.
        let outcome = coordinator
            .pairing
            .confirm_pairing(&body.0.client_id, &signature_bytes, || false)
            .await
            .map_err(to_poem_error)?;

        coordinator
            .audit
            .emit(&AuditEvent::PairConfirmed {
                client_id: outcome.client_id.clone(),
                timestamp: chrono::Utc::now(),
            })
            .await;

        Ok(Json(PairConfirmResponse {
            paired: true,
            token: outcome.token,
            client_id: outcome.client_id,
        }))
    }

    #[oai(path = "/pair/approve", method = "post", operation_id = "pair_approve")]
    async fn pair_approve(
        &self,
        req: &Request,
        coordinator: Data<&Coordinator>,
        body: Json<PairDecisionBody>,
    ) -> poem::Result<Json<PairDecisionResponse>> {
        check_pairing(&coordinator, &client_ip(req))
            .await
            .map_err(to_poem_error)?;
        if !is_loopback(req) {
            return Err(to_poem_error(AgentError::Forbidden));
        }

        let resolved = coordinator.pairing.approve_request(&body.0.client_id).await;
        Ok(Json(PairDecisionResponse { resolved }))
    }

    #[oai(path = "/pair/reject", method = "post", operation_id = "pair_reject")]
    async fn pair_reject(
        &self,
        req: &Request,
        coordinator: Data<&Coordinator>,
        body: Json<PairDecisionBody>,
    ) -> poem::Result<Json<PairDecisionResponse>> {
        check_pairing(&coordinator, &client_ip(req))
            .await
            .map_err(to_poem_error)?;
        if !is_loopback(req) {
            return Err(to_poem_error(AgentError::Forbidden));
        }

        let resolved = coordinator.pairing.reject_request(&body.0.client_id).await;
        Ok(Json(PairDecisionResponse { resolved }))
    }
}
