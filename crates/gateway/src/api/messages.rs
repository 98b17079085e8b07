//! Message relay endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};

use cb_domain::CommandMessage;

use crate::state::AppState;

/// POST /api/messages/send: broadcast a raw text body to every operator.
pub async fn send(State(state): State<AppState>, body: String) -> impl IntoResponse {
    if body.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "message body is empty".to_string());
    }

    let sent = state.router.handle_broadcast(&body).await;
    if sent > 0 {
        (StatusCode::OK, format!("Message sent to {sent} users"))
    } else {
        (
            StatusCode::BAD_REQUEST,
            "Failed to send message to any user".to_string(),
        )
    }
}

/// POST /api/messages/command: run a client command outside a WS session.
/// The originating client is taken from `option` (`client=<id>`).
pub async fn command(
    State(state): State<AppState>,
    Json(command): Json<CommandMessage>,
) -> impl IntoResponse {
    let reply = state.router.handle_client_command(&command, None).await;
    Json(reply)
}
