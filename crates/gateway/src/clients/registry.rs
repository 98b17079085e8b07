//! In-memory hub of live client WebSocket connections.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc;

use cb_domain::{ClientId, ReplyMessage};
use cb_protocol::WsMessage;

use crate::transport::{ClientTransport, TransportError};

/// Channel into a client's WS writer task.
pub type ClientSink = mpsc::Sender<WsMessage>;

/// A live connection.  `connection_id` distinguishes a reconnect under the
/// same client id from the connection it replaced.
pub struct ConnectedClient {
    pub client_id: ClientId,
    pub connection_id: u64,
    pub connected_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub sink: ClientSink,
}

/// Summary info returned by list endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ClientInfo {
    pub client_id: ClientId,
    pub connection_id: u64,
    pub connected_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Default)]
pub struct ClientHub {
    clients: RwLock<HashMap<ClientId, ConnectedClient>>,
    next_connection: AtomicU64,
}

impl ClientHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a connection, replacing any earlier one for the same id.
    /// Returns the connection id to hand back to [`ClientHub::remove`].
    pub fn register(&self, client_id: ClientId, sink: ClientSink) -> u64 {
        let connection_id = self.next_connection.fetch_add(1, Ordering::Relaxed) + 1;
        let now = Utc::now();
        let replaced = self.clients.write().insert(
            client_id.clone(),
            ConnectedClient {
                client_id: client_id.clone(),
                connection_id,
                connected_at: now,
                last_seen: now,
                sink,
            },
        );
        tracing::info!(
            client_id = %client_id,
            connection_id,
            replaced = replaced.is_some(),
            "client connection attached"
        );
        connection_id
    }

    /// Detach a connection.  Returns `false` when the connection was already
    /// superseded by a newer one, which stays attached.
    pub fn remove(&self, client_id: &ClientId, connection_id: u64) -> bool {
        let mut clients = self.clients.write();
        match clients.get(client_id) {
            Some(current) if current.connection_id == connection_id => {
                clients.remove(client_id);
                true
            }
            _ => false,
        }
    }

    pub fn touch(&self, client_id: &ClientId) {
        if let Some(client) = self.clients.write().get_mut(client_id) {
            client.last_seen = Utc::now();
        }
    }

    pub fn get_sink(&self, client_id: &ClientId) -> Option<ClientSink> {
        self.clients.read().get(client_id).map(|c| c.sink.clone())
    }

    pub fn list(&self) -> Vec<ClientInfo> {
        self.clients
            .read()
            .values()
            .map(|c| ClientInfo {
                client_id: c.client_id.clone(),
                connection_id: c.connection_id,
                connected_at: c.connected_at,
                last_seen: c.last_seen,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }
}

#[async_trait]
impl ClientTransport for ClientHub {
    async fn send_to_client(
        &self,
        client_id: &ClientId,
        reply: &ReplyMessage,
    ) -> Result<(), TransportError> {
        let sink = self
            .get_sink(client_id)
            .ok_or_else(|| TransportError::NoSession(client_id.clone()))?;
        sink.send(WsMessage::Reply {
            response: reply.response.clone(),
        })
        .await
        .map_err(|_| TransportError::ConnectionClosed)
    }
}
