//! WebSocket endpoint for clipboard clients.
//!
//! Flow:
//! 1. Client connects to `{ws_path}` (optionally `?client_id=<id>` to resume)
//! 2. Relay assigns an id, registers the session, then answers `welcome`
//! 3. Message loop: client sends `subscribe` / `command` / `ping`, relay
//!    answers `command_result` / `pong` and pushes operator `reply` frames

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};

use cb_domain::{ClientId, CommandMessage};
use cb_protocol::WsMessage;

use crate::state::AppState;
use crate::transport::{ClientEvent, QueuedClientEvent};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Query params
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Id from an earlier `welcome`, to keep the same session across a
    /// reconnect.
    pub client_id: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// GET {ws_path}: upgrade to WebSocket.
pub async fn client_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    let client_id = assign_client_id(query.client_id.as_deref());
    ws.on_upgrade(move |socket| handle_socket(socket, state, client_id))
}

fn assign_client_id(requested: Option<&str>) -> ClientId {
    let requested = ClientId::from_origin(requested);
    if requested.is_unknown() {
        ClientId::new(uuid::Uuid::new_v4().to_string())
    } else {
        requested
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Socket handler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn handle_socket(socket: WebSocket, state: AppState, client_id: ClientId) {
    let (mut ws_sink, mut ws_stream) = socket.split();

    // The session must be active before the client learns its id, so a
    // command sent right after `welcome` sees it registered.
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<WsMessage>(64);
    let connection_id = state.clients.register(client_id.clone(), outbound_tx.clone());
    emit_applied(&state, ClientEvent::Connected(client_id.clone())).await;

    let welcome = WsMessage::Welcome {
        client_id: client_id.clone(),
    };
    if send_ws_message(&mut ws_sink, &welcome).await.is_err() {
        tracing::warn!(client_id = %client_id, "failed to send welcome");
        if state.clients.remove(&client_id, connection_id) {
            emit(&state, ClientEvent::Disconnected(client_id.clone())).await;
        }
        return;
    }

    let writer = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if send_ws_message(&mut ws_sink, &msg).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_stream.next().await {
        match msg {
            Message::Text(text) => match WsMessage::from_text(&text) {
                Ok(ws_msg) => {
                    handle_inbound(&state, &client_id, &outbound_tx, ws_msg).await;
                }
                Err(e) => {
                    tracing::debug!(client_id = %client_id, error = %e, "unparseable client frame");
                    let _ = outbound_tx
                        .send(WsMessage::Error {
                            message: format!("invalid frame: {e}"),
                        })
                        .await;
                }
            },
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => state.clients.touch(&client_id),
            Message::Binary(_) => {
                tracing::debug!(client_id = %client_id, "ignoring binary frame");
            }
        }
    }

    writer.abort();
    if state.clients.remove(&client_id, connection_id) {
        emit(&state, ClientEvent::Disconnected(client_id.clone())).await;
        tracing::info!(client_id = %client_id, "client disconnected");
    } else {
        tracing::debug!(
            client_id = %client_id,
            connection_id,
            "superseded connection closed"
        );
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn send_ws_message(
    sink: &mut (impl SinkExt<Message> + Unpin),
    msg: &WsMessage,
) -> Result<(), ()> {
    let json = msg.to_text().map_err(|_| ())?;
    sink.send(Message::Text(json)).await.map_err(|_| ())
}

async fn emit(state: &AppState, event: ClientEvent) {
    if state.client_events.send(event.into()).await.is_err() {
        tracing::error!("client event worker has stopped");
    }
}

/// Like [`emit`], but returns only after the worker has applied the event.
async fn emit_applied(state: &AppState, event: ClientEvent) {
    let (applied, done) = oneshot::channel();
    let queued = QueuedClientEvent {
        event,
        applied: Some(applied),
    };
    if state.client_events.send(queued).await.is_err() {
        tracing::error!("client event worker has stopped");
        return;
    }
    let _ = done.await;
}

async fn handle_inbound(
    state: &AppState,
    client_id: &ClientId,
    outbound: &mpsc::Sender<WsMessage>,
    msg: WsMessage,
) {
    state.clients.touch(client_id);

    match msg {
        WsMessage::Subscribe { destination } => {
            tracing::debug!(client_id = %client_id, destination = ?destination, "client subscribed");
            emit(state, ClientEvent::Subscribed(client_id.clone())).await;
        }
        WsMessage::Command {
            command,
            option,
            content,
            target_user_id,
        } => {
            let command = CommandMessage {
                command,
                option,
                content,
                target_user_id,
            };
            let reply = state
                .router
                .handle_client_command(&command, Some(client_id))
                .await;
            let _ = outbound
                .send(WsMessage::CommandResult {
                    response: reply.response,
                })
                .await;
        }
        WsMessage::Ping { timestamp } => {
            emit(state, ClientEvent::Subscribed(client_id.clone())).await;
            let _ = outbound.send(WsMessage::Pong { timestamp }).await;
        }
        WsMessage::Pong { .. } => {}
        other => {
            tracing::debug!(
                client_id = %client_id,
                msg_type = ?std::mem::discriminant(&other),
                "unexpected inbound message type"
            );
        }
    }
}
