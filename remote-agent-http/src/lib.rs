//! HTTP/WebSocket transport surface: bearer-auth REST endpoints plus the
//! `/events` WebSocket, TLS-terminated. Grounded on
//! `warpgate-protocol-http/src/lib.rs`'s `HTTPProtocolServer::run` — the
//! `Route`/`OpenApiService`/`Server::new(...).rustls(...)` wiring shape is
//! kept; the session/admin/catchall-proxy machinery it also wires up belongs
//! to the reverse proxy this agent isn't and is dropped.

mod api;
mod auth;
mod error;
mod logging;
mod rate_limit;
mod tls;
mod ws;

use std::net::SocketAddr;

use anyhow::Result;
use poem::listener::{Listener, TcpListener};
use poem::{EndpointExt, Route, Server};
use poem_openapi::OpenApiService;
use remote_agent_core::Coordinator;
use tracing::info;

pub struct AgentHttpServer {
    coordinator: Coordinator,
}

impl AgentHttpServer {
    pub fn new(coordinator: Coordinator) -> Self {
        Self { coordinator }
    }

    pub async fn run(self, address: SocketAddr) -> Result<()> {
        let api_service = OpenApiService::new(crate::api::get(), "Remote Agent", env!("CARGO_PKG_VERSION"))
            .server(format!("https://{address}/api"));
        let ui = api_service.swagger_ui();
        let spec = api_service.spec_endpoint();

        let app = Route::new()
            .nest("/api", api_service)
            .nest("/api/swagger", ui)
            .nest("/api/openapi.json", spec)
            .at("/events", ws::events)
            .around(logging::middleware)
            .data(self.coordinator.clone());

        let tls_config = tls::ensure_tls_certificate(&self.coordinator.config.tls_dir).await?;

        info!(%address, "remote-agent HTTP server listening");
        Server::new(TcpListener::bind(address).rustls(tls_config)).run(app).await?;

        Ok(())
    }
}
