use std::sync::Arc;

use tokio::sync::mpsc;

use cb_domain::config::Config;

use crate::clients::registry::ClientHub;
use crate::router::NotificationRouter;
use crate::transport::QueuedClientEvent;

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Live client WebSocket connections.
    pub clients: Arc<ClientHub>,
    pub router: Arc<NotificationRouter>,
    /// Feed of client lifecycle events into the client worker.
    pub client_events: mpsc::Sender<QueuedClientEvent>,
}
