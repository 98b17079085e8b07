//! Client connection REST endpoints.

use axum::extract::State;
use axum::response::{IntoResponse, Json};

use crate::state::AppState;

/// GET /v1/clients: list live WebSocket connections.
pub async fn list_clients(State(state): State<AppState>) -> impl IntoResponse {
    let clients = state.clients.list();
    Json(serde_json::json!({
        "clients": clients,
        "count": clients.len(),
    }))
}
