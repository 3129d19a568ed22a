//! Request logging. Grounded on `warpgate-protocol-http/src/logging.rs`;
//! dropped the session/username span enrichment since this agent has no
//! browser session concept, kept the client-ip-aware request/failure log.

use http::{Method, StatusCode, Uri};
use poem::{Endpoint, IntoResponse, Request, Response};
use tracing::{info, warn};

use crate::auth::client_ip;

pub fn log_request_result(method: &Method, url: &Uri, client_ip: &str, status: &StatusCode) {
    if status.is_server_error() || status.is_client_error() {
        warn!(%method, %url, %client_ip, %status, "request failed");
    } else {
        info!(%method, %url, %client_ip, %status, "request");
    }
}

pub async fn middleware(ep: impl Endpoint<Output = Response>, req: Request) -> poem::Result<Response> {
    let method = req.method().clone();
    let url = req.original_uri().clone();
    let ip = client_ip(&req);
    let response = ep.call(req).await?;
    let response = response.into_response();
    log_request_result(&method, &url, &ip, &response.status());
    Ok(response)
}
