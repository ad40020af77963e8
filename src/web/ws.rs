//! Streaming chat over WebSocket.
//!
//! The page opens `/ws/chat` with its session cookie and sends one
//! `{"type":"message"}` frame per turn. Fragments are forwarded as
//! `stream_chunk` frames while the session lock is held, then the turn is
//! recorded and a `done` frame carries the full reply.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::routes::AppState;
use super::sessions::{SharedSession, session_id_from_headers};
use crate::banking::chat::{accept_input, record_exchange, record_failure};
use crate::llm::CompletionClient;

// ── JSON Protocol ───────────────────────────────────────────────────────

/// Message from browser → server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ClientMessage {
    #[serde(rename = "message")]
    Message { content: String },
}

/// Message from server → browser.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ServerMessage {
    #[serde(rename = "stream_chunk")]
    StreamChunk { content: String },
    #[serde(rename = "done")]
    Done { content: String },
    #[serde(rename = "error")]
    Error { message: String },
    /// Blank input or the session is not in chat mode.
    #[serde(rename = "ignored")]
    Ignored,
}

// ── WebSocket Handler ───────────────────────────────────────────────────

pub(crate) async fn ws_chat_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    // The page always exists before the socket; no cookie means no session.
    let Some(id) = session_id_from_headers(&headers) else {
        debug!("Chat socket rejected: no session cookie");
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let Some(session) = state.sessions.get(id).await else {
        debug!(session = %id, "Chat socket rejected: unknown session");
        return StatusCode::UNAUTHORIZED.into_response();
    };

    info!(session = %id, "Chat client connecting");
    ws.on_upgrade(move |socket| handle_chat_socket(socket, state, id, session))
        .into_response()
}

async fn handle_chat_socket(
    mut socket: WebSocket,
    state: AppState,
    id: Uuid,
    session: SharedSession,
) {
    loop {
        match socket.recv().await {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Message { content }) => {
                    if !run_turn(&mut socket, &state.client, &session, &content).await {
                        debug!(session = %id, "Chat client disconnected during send");
                        break;
                    }
                }
                Err(e) => {
                    debug!(error = %e, text = %text, "Invalid JSON from chat client");
                }
            },
            Some(Ok(Message::Ping(data))) => {
                if socket.send(Message::Pong(data)).await.is_err() {
                    break;
                }
            }
            Some(Ok(Message::Close(_))) | None => {
                info!(session = %id, "Chat client disconnected");
                break;
            }
            Some(Err(e)) => {
                warn!(error = %e, "Chat WebSocket error");
                break;
            }
            _ => {}
        }
    }

    info!(session = %id, "Chat connection closed");
}

/// Stream one turn to the socket. Returns false once the socket is gone.
async fn run_turn(
    socket: &mut WebSocket,
    client: &CompletionClient,
    session: &SharedSession,
    content: &str,
) -> bool {
    let mut session = session.lock().await;
    let Some(input) = accept_input(&session, content) else {
        return send(socket, &ServerMessage::Ignored).await;
    };

    let mut stream = match client.stream(session.window(), input).await {
        Ok(stream) => stream,
        Err(e) => {
            record_failure(&mut session, &e);
            let message = session.notice().unwrap_or_default().to_string();
            return send(socket, &ServerMessage::Error { message }).await;
        }
    };

    let mut reply = String::new();
    while let Some(fragment) = stream.next().await {
        match fragment {
            Ok(fragment) => {
                reply.push_str(&fragment);
                let chunk = ServerMessage::StreamChunk { content: fragment };
                if !send(socket, &chunk).await {
                    // Nothing reached the page; drop the partial turn.
                    return false;
                }
            }
            Err(e) => {
                record_failure(&mut session, &e);
                let message = session.notice().unwrap_or_default().to_string();
                return send(socket, &ServerMessage::Error { message }).await;
            }
        }
    }

    record_exchange(&mut session, input, reply.clone());
    send(socket, &ServerMessage::Done { content: reply }).await
}

async fn send(socket: &mut WebSocket, message: &ServerMessage) -> bool {
    match serde_json::to_string(message) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to encode chat frame");
            true
        }
    }
}
