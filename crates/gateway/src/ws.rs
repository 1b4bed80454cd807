//! WebSocket echo endpoints.
//!
//! - `GET /ws`: JWT required, size-limited echo
//! - `GET /ws/test`: unauthenticated echo, mounted only when enabled

use axum::extract::State;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::SharedState;
use crate::auth::AuthError;

/// How an echo connection answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoMode {
    /// Authenticated echo with a byte limit.
    Limited { max_bytes: usize },
    /// Development echo, no limit.
    Test,
}

impl EchoMode {
    pub fn reply(&self, data: &str) -> String {
        match self {
            Self::Limited { max_bytes } if data.len() > *max_bytes => {
                format!("消息过长，最大支持{max_bytes}字节")
            }
            Self::Limited { .. } => format!("Message text was: {data}"),
            Self::Test => format!("[测试回显] Message text was: {data}"),
        }
    }
}

pub async fn ws_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Some(verifier) = &state.jwt else {
        warn!("WebSocket rejected: no JWT secret configured");
        return AuthError::Missing.into_response();
    };
    let claims = match verifier.authorize(&headers) {
        Ok(claims) => claims,
        Err(e) => {
            warn!(reason = %e, "WebSocket authentication failed");
            return e.into_response();
        }
    };
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let mode = EchoMode::Limited {
        max_bytes: state.config.gateway.max_ws_message_bytes,
    };
    ws.on_upgrade(move |socket| echo_session(socket, state, claims.sub, mode))
}

pub async fn ws_test_handler(State(state): State<SharedState>, ws: WebSocketUpgrade) -> Response {
    let client_id = format!("test-{}", uuid::Uuid::new_v4());
    ws.on_upgrade(move |socket| echo_session(socket, state, client_id, EchoMode::Test))
}

async fn echo_session(socket: WebSocket, state: SharedState, client_id: String, mode: EchoMode) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let generation = state.connections.connect(&client_id, tx).await;
    info!(client = %client_id, ?mode, "WebSocket connected");

    let writer = async move {
        while let Some(text) = rx.recv().await {
            if sink.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
    };

    let connections = &state.connections;
    let reader = async {
        while let Some(message) = stream.next().await {
            match message {
                Ok(WsMessage::Text(text)) => {
                    connections
                        .send_personal(&client_id, mode.reply(text.as_str()))
                        .await;
                }
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(client = %client_id, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = writer => {},
        _ = reader => {},
    }

    state.connections.disconnect(&client_id, generation).await;
    info!(client = %client_id, "WebSocket disconnected");
}
