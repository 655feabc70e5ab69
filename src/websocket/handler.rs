//! Push Channel Handler
//!
//! WebSocket upgrade with bearer handshake, per-connection sender task, and
//! client frame dispatch. Rejected credentials never upgrade.

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::types::{ClientFrame, ServerFrame, Topic};
use crate::websocket::{CloseReason, Connection, OutboundFrame, DEFAULT_QUEUE_DEPTH};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Bearer credential presented at handshake time.
    pub token: Option<String>,
}

/// WebSocket upgrade handler. Authenticates before upgrading.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let token = query.token.unwrap_or_default();
    match state.auth.resolve_with_expiry(&token) {
        Ok((identity, expiry)) => {
            ws.on_upgrade(move |socket| handle_socket(socket, state, identity, expiry))
        }
        Err(e) => {
            warn!("push handshake rejected: {}", e);
            e.into_response()
        }
    }
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    identity: crate::services::Identity,
    expiry: chrono::DateTime<Utc>,
) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let conn = state.hub.register(identity, DEFAULT_QUEUE_DEPTH);

    // Dedicated sender: drains the bounded queue strictly FIFO, then emits
    // a close frame carrying the close reason.
    let send_conn = conn.clone();
    let send_task = tokio::spawn(async move {
        while let Some(json) = send_conn.next_frame().await {
            if ws_sender.send(Message::Text(json)).await.is_err() {
                send_conn.close(CloseReason::Shutdown);
                break;
            }
        }
        let reason = send_conn.close_reason().unwrap_or(CloseReason::Shutdown);
        let code = match reason {
            CloseReason::Shutdown => close_code::NORMAL,
            CloseReason::SlowConsumer | CloseReason::CredentialExpired => close_code::POLICY,
        };
        let _ = ws_sender
            .send(Message::Close(Some(CloseFrame {
                code,
                reason: reason.as_str().into(),
            })))
            .await;
    });

    let ttl = (expiry - Utc::now()).to_std().unwrap_or_default();
    let credential_deadline = tokio::time::sleep(ttl);
    tokio::pin!(credential_deadline);

    loop {
        tokio::select! {
            _ = &mut credential_deadline => {
                info!(connection = %conn.id, "closing connection on credential expiry");
                conn.close(CloseReason::CredentialExpired);
                break;
            }
            incoming = ws_receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(&state, &conn, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(connection = %conn.id, "push receive error: {}", e);
                        break;
                    }
                }
                if conn.is_closed() {
                    break;
                }
            }
        }
    }

    state.hub.unregister(conn.id);
    conn.close(CloseReason::Shutdown);
    let _ = send_task.await;
}

async fn handle_frame(state: &AppState, conn: &Arc<Connection>, text: &str) {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            send(
                conn,
                &ServerFrame::Error {
                    error: format!("Invalid frame: {}", e),
                    code: "INVALID_FRAME".to_string(),
                },
            );
            return;
        }
    };

    match frame {
        ClientFrame::Subscribe { topic } => match state.hub.subscribe(conn.id, topic) {
            Ok(()) => {
                send(conn, &ServerFrame::Subscribed { topic });
                if topic == Topic::MarketData {
                    send_market_snapshot(state, conn);
                }
            }
            Err(reason) => {
                send(
                    conn,
                    &ServerFrame::Error {
                        error: reason.to_string(),
                        code: "ROLE_NOT_PERMITTED".to_string(),
                    },
                );
            }
        },
        ClientFrame::Unsubscribe { topic } => {
            state.hub.unsubscribe(conn.id, topic);
            send(conn, &ServerFrame::Unsubscribed { topic });
        }
        ClientFrame::Ping => send(conn, &ServerFrame::Pong),
    }
}

/// Current reference-tape snapshot, sent once per market-data subscription.
fn send_market_snapshot(state: &AppState, conn: &Arc<Connection>) {
    let Some(handle) = state.registry.get(&state.reference_session) else {
        return;
    };
    let quotes = handle.lock().market_quotes();
    send(conn, &ServerFrame::MarketSnapshot { quotes });
}

fn send(conn: &Arc<Connection>, frame: &ServerFrame) {
    if let Ok(json) = serde_json::to_string(frame) {
        conn.enqueue(OutboundFrame::critical(json));
    }
}
