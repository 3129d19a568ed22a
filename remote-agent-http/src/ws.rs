//! `GET /events` — the WebSocket event/control surface. Grounded on
//! `warpgate-protocol-http/src/proxy.rs`'s `ws.on_upgrade` split-sink pattern;
//! the message grammar itself is this agent's own (frame streaming control
//! plus best-effort event fan-out, no reverse-proxying involved).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::{Sink, SinkExt, StreamExt};
use poem::web::websocket::{Message, WebSocket};
use poem::web::{Data, Query};
use poem::{handler, IntoResponse, Request};
use remote_agent_common::error::AgentError;
use remote_agent_core::events::CoreEvent;
use remote_agent_core::Coordinator;
use serde::Deserialize;
use serde_json::json;
use tokio::time::{interval, Duration};
use tracing::info;

use crate::auth::client_ip;
use crate::error::to_poem_error;
use crate::rate_limit::{check_global, check_ws};

#[derive(Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

#[handler]
pub async fn events(
    req: &Request,
    Query(query): Query<WsQuery>,
    coordinator: Data<&Coordinator>,
    ws: WebSocket,
) -> poem::Result<impl IntoResponse> {
    check_global(&coordinator, &client_ip(req))
        .await
        .map_err(to_poem_error)?;

    let token = query.token.unwrap_or_default();
    let client_id = coordinator
        .pairing
        .verify_token(&token)
        .await
        .ok_or_else(|| to_poem_error(AgentError::Unauthenticated))?;

    let coordinator: Coordinator = coordinator.0.clone();
    Ok(ws.on_upgrade(move |socket| async move {
        let streaming = Arc::new(AtomicBool::new(false));
        let filter = {
            let streaming = streaming.clone();
            move |event: &CoreEvent| match event {
                CoreEvent::Frame { .. } => streaming.load(Ordering::Relaxed),
                _ => true,
            }
        };

        let (mut sink, mut source) = socket.split();
        let mut subscription = coordinator.event_hub.subscribe(filter).await;
        let mut keepalive = interval(KEEPALIVE_INTERVAL);

        info!(%client_id, "websocket client connected");

        loop {
            tokio::select! {
                incoming = source.next() => {
                    let Some(Ok(message)) = incoming else { break };
                    if matches!(message, Message::Close(_)) {
                        break;
                    }
                    if handle_client_message(&coordinator, &client_id, message, &mut sink, &streaming)
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                event = subscription.recv() => {
                    let Some(event) = event else { break };
                    if sink.send(Message::Text(event_to_json(&event).to_string())).await.is_err() {
                        break;
                    }
                }
                _ = keepalive.tick() => {
                    if sink.send(Message::Text(json!({"type": "keepalive"}).to_string())).await.is_err() {
                        break;
                    }
                }
            }
        }

        if streaming.swap(false, Ordering::Relaxed) {
            coordinator.frames.stop().await;
        }
        info!(%client_id, "websocket client disconnected");
    }))
}

async fn handle_client_message(
    coordinator: &Coordinator,
    client_id: &str,
    message: Message,
    sink: &mut (impl Sink<Message> + Unpin),
    streaming: &Arc<AtomicBool>,
) -> Result<(), ()> {
    let Message::Text(text) = message else {
        return Ok(());
    };

    if text == "ping" {
        let _ = sink.send(Message::Text("pong".to_string())).await;
        return Ok(());
    }

    let parsed: serde_json::Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            let _ = send_error(sink, &e.to_string()).await;
            return Ok(());
        }
    };

    let Some(action) = parsed.get("action").and_then(serde_json::Value::as_str) else {
        let _ = send_error(sink, "missing action").await;
        return Ok(());
    };

    match action {
        "start_streaming" => {
            if check_ws(coordinator, client_id).await.is_ok() {
                streaming.store(true, Ordering::Relaxed);
                coordinator.frames.start().await;
            } else {
                let _ = send_error(sink, "rate limited").await;
            }
        }
        "stop_streaming" => {
            if streaming.swap(false, Ordering::Relaxed) {
                coordinator.frames.stop().await;
            }
        }
        "set_fps" => {
            if let Some(fps) = parsed.get("fps").and_then(serde_json::Value::as_u64) {
                coordinator.frames.set_target_fps(fps as u32);
            }
        }
        "set_quality" => {
            if let Some(quality) = parsed.get("quality").and_then(serde_json::Value::as_u64) {
                coordinator.frames.set_quality(quality as u8).await;
            }
        }
        "capture_frame" => match coordinator.frames.capture_single_frame().await {
            Ok((data, metrics)) => {
                let _ = sink
                    .send(Message::Text(
                        json!({
                            "type": "frame",
                            "data": data,
                            "timestamp": metrics.timestamp_ms,
                            "quality": metrics.quality,
                            "size_bytes": metrics.size_bytes,
                        })
                        .to_string(),
                    ))
                    .await;
            }
            Err(e) => {
                let _ = send_error(sink, &e.to_string()).await;
            }
        },
        "get_status" => {
            let _ = sink
                .send(Message::Text(
                    json!({
                        "type": "status",
                        "streaming": coordinator.frames.is_running(),
                        "quality": coordinator.frames.get_quality().await,
                        "kill_switch_active": coordinator.kill_switch.is_active().await,
                    })
                    .to_string(),
                ))
                .await;
        }
        other => {
            let _ = send_error(sink, &format!("unknown action: {other}")).await;
        }
    }

    Ok(())
}

async fn send_error(sink: &mut (impl Sink<Message> + Unpin), message: &str) -> Result<(), ()> {
    sink.send(Message::Text(json!({"type": "error", "message": message}).to_string()))
        .await
        .map_err(|_| ())
}

fn event_to_json(event: &CoreEvent) -> serde_json::Value {
    match event {
        CoreEvent::Frame {
            data_base64,
            timestamp_ms,
            quality,
            size_bytes,
        } => json!({
            "type": "frame",
            "data": data_base64,
            "timestamp": timestamp_ms,
            "quality": quality,
            "size_bytes": size_bytes,
        }),
        CoreEvent::CommandDone {
            id,
            status,
            result,
            error,
        } => json!({
            "type": "command_done",
            "id": id,
            "status": status,
            "result": result,
            "error": error,
        }),
        CoreEvent::KillSwitch {
            activated,
            activated_by,
            reason,
        } => json!({
            "type": "kill_switch",
            "activated": activated,
            "activated_by": activated_by,
            "reason": reason,
        }),
    }
}
