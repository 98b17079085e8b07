//! Transport seams between the relay core and the outside world.
//!
//! The core only sees these traits.  Concrete adapters live in
//! [`crate::clients`] (WebSocket clients) and [`crate::telegram`] (operator
//! bot), and tests substitute recording fakes.

use async_trait::async_trait;

use cb_domain::{ClientId, OperatorId, ReplyMessage};

/// Lower-case fragments of a send error that mean the peer is gone.
pub const CONNECTION_RESET_PATTERNS: &[&str] = &[
    "connection reset",
    "no session",
    "not connected",
    "broken pipe",
    "connection closed",
];

/// Callback data prefix carried by the reply button.
pub const REPLY_ACTION_PREFIX: &str = "reply:";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Errors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("no session for client {0}")]
    NoSession(ClientId),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request failed: {0}")]
    Request(String),

    #[error("rejected by remote: {0}")]
    Rejected(String),
}

impl TransportError {
    /// Whether the failure indicates the peer connection no longer exists.
    pub fn is_connection_reset(&self) -> bool {
        let message = self.to_string().to_lowercase();
        CONNECTION_RESET_PATTERNS
            .iter()
            .any(|pattern| message.contains(pattern))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Events
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Session lifecycle events emitted by the client transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Connected(ClientId),
    Subscribed(ClientId),
    Disconnected(ClientId),
}

/// A client event on its way to the client worker.  `applied` fires once
/// the registry reflects the event.
#[derive(Debug)]
pub struct QueuedClientEvent {
    pub event: ClientEvent,
    pub applied: Option<tokio::sync::oneshot::Sender<()>>,
}

impl From<ClientEvent> for QueuedClientEvent {
    fn from(event: ClientEvent) -> Self {
        Self {
            event,
            applied: None,
        }
    }
}

/// Inbound events emitted by the operator transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorEvent {
    Text {
        operator: OperatorId,
        text: String,
        event_id: Option<String>,
    },
    Callback {
        operator: OperatorId,
        data: String,
        event_id: Option<String>,
    },
}

impl OperatorEvent {
    pub fn operator(&self) -> OperatorId {
        match self {
            Self::Text { operator, .. } | Self::Callback { operator, .. } => *operator,
        }
    }

    pub fn event_id(&self) -> Option<&str> {
        match self {
            Self::Text { event_id, .. } | Self::Callback { event_id, .. } => event_id.as_deref(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Traits
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
pub trait ClientTransport: Send + Sync {
    async fn send_to_client(
        &self,
        client_id: &ClientId,
        reply: &ReplyMessage,
    ) -> Result<(), TransportError>;
}

#[async_trait]
pub trait OperatorTransport: Send + Sync {
    async fn send(&self, operator: OperatorId, text: &str) -> Result<(), TransportError>;

    /// Every operator a broadcast should reach.
    fn list_known_operators(&self) -> Vec<OperatorId>;

    /// The reply-button capability, when this channel supports it.
    fn reply_actions(&self) -> Option<&dyn ReplyActions> {
        None
    }
}

/// A button attached to an operator message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyAction {
    pub label: String,
    pub token: String,
}

impl ReplyAction {
    pub fn reply_to(client_id: &ClientId) -> Self {
        Self {
            label: "Reply".into(),
            token: format!("{REPLY_ACTION_PREFIX}{client_id}"),
        }
    }
}

#[async_trait]
pub trait ReplyActions: Send + Sync {
    async fn send_with_action(
        &self,
        operator: OperatorId,
        text: &str,
        action: &ReplyAction,
    ) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_patterns_match_transport_errors() {
        assert!(TransportError::NoSession(ClientId::from("a")).is_connection_reset());
        assert!(TransportError::ConnectionClosed.is_connection_reset());
        assert!(TransportError::Request("Broken pipe (os error 32)".into()).is_connection_reset());
        assert!(!TransportError::Rejected("Bad Request: chat not found".into()).is_connection_reset());
    }

    #[test]
    fn reply_action_token_names_client() {
        let action = ReplyAction::reply_to(&ClientId::from("abc"));
        assert_eq!(action.token, "reply:abc");
    }
}
