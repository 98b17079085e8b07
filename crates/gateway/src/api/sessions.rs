//! Client session introspection & maintenance endpoints.

use axum::extract::State;
use axum::response::{IntoResponse, Json};

use crate::state::AppState;

/// GET /v1/sessions/stats
pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.router.sessions().stats())
}

/// POST /v1/sessions/cleanup: purge disconnected sessions.
pub async fn cleanup(State(state): State<AppState>) -> impl IntoResponse {
    let removed = state.router.sessions().cleanup_disconnected();
    Json(serde_json::json!({ "removed": removed }))
}
