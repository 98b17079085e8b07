//! Recording fake transports shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use cb_domain::{ClientId, OperatorId, ReplyMessage};
use cb_gateway::router::NotificationRouter;
use cb_gateway::transport::{
    ClientTransport, OperatorTransport, ReplyAction, ReplyActions, TransportError,
};
use cb_sessions::{ReplyCorrelationTable, SessionRegistry, UpdateDeduplicator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorMessage {
    pub operator: OperatorId,
    pub text: String,
    pub action: Option<String>,
}

/// Operator channel that records every message instead of sending it.
pub struct RecordingOperators {
    known: Vec<OperatorId>,
    failing: HashSet<OperatorId>,
    with_actions: bool,
    sent: Mutex<Vec<OperatorMessage>>,
}

impl RecordingOperators {
    pub fn new(known: &[i64]) -> Self {
        Self {
            known: known.iter().copied().map(OperatorId).collect(),
            failing: HashSet::new(),
            with_actions: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self, operator: i64) -> Self {
        self.failing.insert(OperatorId(operator));
        self
    }

    pub fn without_actions(mut self) -> Self {
        self.with_actions = false;
        self
    }

    pub fn sent(&self) -> Vec<OperatorMessage> {
        self.sent.lock().clone()
    }

    pub fn texts_to(&self, operator: i64) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter(|m| m.operator == OperatorId(operator))
            .map(|m| m.text.clone())
            .collect()
    }

    pub fn last_to(&self, operator: i64) -> Option<OperatorMessage> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find(|m| m.operator == OperatorId(operator))
            .cloned()
    }

    fn record(
        &self,
        operator: OperatorId,
        text: &str,
        action: Option<String>,
    ) -> Result<(), TransportError> {
        if self.failing.contains(&operator) {
            return Err(TransportError::Rejected("Bad Request: chat not found".into()));
        }
        self.sent.lock().push(OperatorMessage {
            operator,
            text: text.to_string(),
            action,
        });
        Ok(())
    }
}

#[async_trait]
impl OperatorTransport for RecordingOperators {
    async fn send(&self, operator: OperatorId, text: &str) -> Result<(), TransportError> {
        self.record(operator, text, None)
    }

    fn list_known_operators(&self) -> Vec<OperatorId> {
        self.known.clone()
    }

    fn reply_actions(&self) -> Option<&dyn ReplyActions> {
        if self.with_actions {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl ReplyActions for RecordingOperators {
    async fn send_with_action(
        &self,
        operator: OperatorId,
        text: &str,
        action: &ReplyAction,
    ) -> Result<(), TransportError> {
        self.record(operator, text, Some(action.token.clone()))
    }
}

/// Client channel that records replies; ids marked broken fail like a
/// dropped socket.
#[derive(Default)]
pub struct RecordingClients {
    broken: Mutex<HashSet<ClientId>>,
    sent: Mutex<Vec<(ClientId, String)>>,
}

impl RecordingClients {
    pub fn break_connection(&self, client_id: &ClientId) {
        self.broken.lock().insert(client_id.clone());
    }

    pub fn sent(&self) -> Vec<(ClientId, String)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl ClientTransport for RecordingClients {
    async fn send_to_client(
        &self,
        client_id: &ClientId,
        reply: &ReplyMessage,
    ) -> Result<(), TransportError> {
        if self.broken.lock().contains(client_id) {
            return Err(TransportError::Request("Connection reset by peer".into()));
        }
        self.sent
            .lock()
            .push((client_id.clone(), reply.response.clone()));
        Ok(())
    }
}

pub struct Relay {
    pub router: NotificationRouter,
    pub operators: Arc<RecordingOperators>,
    pub clients: Arc<RecordingClients>,
}

pub fn relay(operators: RecordingOperators) -> Relay {
    relay_with_stale_window(operators, chrono::Duration::seconds(300))
}

pub fn relay_with_stale_window(
    operators: RecordingOperators,
    stale_after: chrono::Duration,
) -> Relay {
    let operators = Arc::new(operators);
    let clients = Arc::new(RecordingClients::default());
    let router = NotificationRouter::new(
        Arc::new(SessionRegistry::new()),
        Arc::new(UpdateDeduplicator::default()),
        Arc::new(ReplyCorrelationTable::new()),
        clients.clone(),
        operators.clone(),
        stale_after,
    );
    Relay {
        router,
        operators,
        clients,
    }
}
