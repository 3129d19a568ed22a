//! Bearer-token authentication and client-IP extraction shared by every
//! handler. The REST surface is bearer-authenticated; the
//! WebSocket surface takes the same token via `?token=`.

use poem::http::header::AUTHORIZATION;
use poem::Request;
use remote_agent_common::error::AgentError;
use remote_agent_common::model::ClientId;
use remote_agent_core::Coordinator;

/// Extracts the bearer token from `Authorization: Bearer <token>`.
pub fn bearer_token(req: &Request) -> Option<String> {
    let header = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    header.strip_prefix("Bearer ").map(|s| s.to_string())
}

/// Resolves the bearer token on `req` to its paired client id, or
/// `Unauthenticated` if missing or unrecognised.
pub async fn authenticate(coordinator: &Coordinator, req: &Request) -> Result<ClientId, AgentError> {
    let token = bearer_token(req).ok_or(AgentError::Unauthenticated)?;
    coordinator
        .pairing
        .verify_token(&token)
        .await
        .ok_or(AgentError::Unauthenticated)
}

/// Best-effort client IP for rate-limit scope keys; falls back to a fixed
/// placeholder when the connection's remote address can't be read (e.g. in
/// tests), matching the agent's "local network" deployment assumption.
pub fn client_ip(req: &Request) -> String {
    req.remote_addr()
        .as_socket_addr()
        .map(|a| a.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// True if the connecting peer is the local host. Gates operator-only
/// endpoints (pairing approve/reject) that have no other authentication —
/// the client isn't paired yet when it needs them.
pub fn is_loopback(req: &Request) -> bool {
    req.remote_addr()
        .as_socket_addr()
        .map(|a| a.ip().is_loopback())
        .unwrap_or(false)
}
