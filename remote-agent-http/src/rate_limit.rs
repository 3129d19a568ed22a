//! Per-endpoint rate-limit checks against fixed scopes: `global:{ip}`,
//! `pairing:{ip}`, `commands:{session_id}`, `ws:{client_id}` scopes, each
//! checked against `RateLimiterRegistry` before the request is otherwise
//! processed. Health checks bypass the limiter (there is no health endpoint
//! in scope here, so this module is the only gate).

use remote_agent_common::error::AgentError;
use remote_agent_core::Coordinator;

pub async fn check_global(coordinator: &Coordinator, ip: &str) -> Result<(), AgentError> {
    check(coordinator, &format!("global:{ip}"), coordinator.config.rate_limit.requests_per_second, None).await
}

pub async fn check_pairing(coordinator: &Coordinator, ip: &str) -> Result<(), AgentError> {
    check(
        coordinator,
        &format!("pairing:{ip}"),
        coordinator.config.rate_limit.pairing_per_minute / 60.0,
        Some(2.0),
    )
    .await
}

pub async fn check_commands(coordinator: &Coordinator, session_id: &str) -> Result<(), AgentError> {
    check(
        coordinator,
        &format!("commands:{session_id}"),
        coordinator.config.rate_limit.commands_per_second,
        None,
    )
    .await
}

pub async fn check_ws(coordinator: &Coordinator, client_id: &str) -> Result<(), AgentError> {
    check(
        coordinator,
        &format!("ws:{client_id}"),
        coordinator.config.rate_limit.websocket_messages_per_second,
        None,
    )
    .await
}

async fn check(coordinator: &Coordinator, key: &str, rate: f64, burst: Option<f64>) -> Result<(), AgentError> {
    let result = coordinator.rate_limiters.check(key, rate, burst).await;
    if result.allowed {
        Ok(())
    } else {
        Err(AgentError::RateLimited {
            retry_after_secs: result.retry_after_secs,
        })
    }
}
