pub mod clients;
pub mod health;
pub mod messages;
pub mod sessions;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router, including the client WebSocket endpoint at
/// the configured `ws_path`.
pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        // Relay
        .route("/api/messages/send", post(messages::send))
        .route("/api/messages/command", post(messages::command))
        // Sessions
        .route("/v1/sessions/stats", get(sessions::stats))
        .route("/v1/sessions/cleanup", post(sessions::cleanup))
        // Clients
        .route("/v1/clients", get(clients::list_clients))
        .route(
            &state.config.server.ws_path,
            get(crate::clients::ws::client_ws),
        )
}
