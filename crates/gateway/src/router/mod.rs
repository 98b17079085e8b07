//! The relay core: turns client commands into operator notifications and
//! operator input into client replies.
//!
//! All shared state lives in the `cb-sessions` structures; the router holds
//! no lock of its own and never holds one across a transport call.

pub mod commands;
pub mod format;

use std::sync::Arc;

use chrono::{Duration, Utc};

use cb_domain::{ClientId, CommandMessage, OperatorId, ReplyMessage};
use cb_sessions::{ReplyCorrelationTable, SessionRegistry, SessionStatus, UpdateDeduplicator};

use crate::transport::{
    ClientEvent, ClientTransport, OperatorEvent, OperatorTransport, ReplyAction, TransportError,
};

use self::commands::OperatorCommand;
use self::format::Annotation;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Outcomes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Why an operator action could not be carried out.  Always reported back
/// to the operator as a warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingFailure {
    UnknownRecipient,
    NoKnownClient,
    ClientDisconnected(ClientId),
    DeliveryFailed(ClientId),
}

/// Result of routing one operator event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A pending reply reached its client.
    Delivered(ClientId),
    /// The operator's next message will go to this client.
    Armed(ClientId),
    Control(OperatorCommand),
    Unrecognized,
    Ignored,
    Failed(RoutingFailure),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Router
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct NotificationRouter {
    sessions: Arc<SessionRegistry>,
    dedup: Arc<UpdateDeduplicator>,
    correlation: Arc<ReplyCorrelationTable>,
    clients: Arc<dyn ClientTransport>,
    operators: Arc<dyn OperatorTransport>,
    stale_after: Duration,
}

impl NotificationRouter {
    pub fn new(
        sessions: Arc<SessionRegistry>,
        dedup: Arc<UpdateDeduplicator>,
        correlation: Arc<ReplyCorrelationTable>,
        clients: Arc<dyn ClientTransport>,
        operators: Arc<dyn OperatorTransport>,
        stale_after: Duration,
    ) -> Self {
        Self {
            sessions,
            dedup,
            correlation,
            clients,
            operators,
            stale_after,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn correlation(&self) -> &Arc<ReplyCorrelationTable> {
        &self.correlation
    }

    // ── Client side ─────────────────────────────────────────────────

    pub fn apply_client_event(&self, event: &ClientEvent) {
        match event {
            ClientEvent::Connected(id) => self.sessions.register(id),
            ClientEvent::Subscribed(id) => self.sessions.touch(id),
            ClientEvent::Disconnected(id) => {
                self.sessions.disconnect(id);
            }
        }
    }

    /// Execute a client command.  `origin` is the id the transport
    /// authenticated; without one the `client=` option is consulted.
    pub async fn handle_client_command(
        &self,
        command: &CommandMessage,
        origin: Option<&ClientId>,
    ) -> ReplyMessage {
        let client_id = origin
            .cloned()
            .unwrap_or_else(|| ClientId::from_origin(command.client_option()));
        tracing::info!(client_id = %client_id, command = %command.command, "client command");

        match command.command.as_str() {
            "dm" => self.handle_dm(command, client_id).await,
            "broadcast" => {
                let Some(content) = command.content_text() else {
                    return ReplyMessage::new("Error: empty broadcast content");
                };
                let sent = self.handle_broadcast(content).await;
                ReplyMessage::new(format!("Broadcast sent to {sent} recipients"))
            }
            other => {
                tracing::warn!(client_id = %client_id, command = %other, "unknown client command");
                ReplyMessage::new(format!("Error: unknown command {other}"))
            }
        }
    }

    async fn handle_dm(&self, command: &CommandMessage, client_id: ClientId) -> ReplyMessage {
        let Some(target) = command.target_user_id.map(OperatorId) else {
            tracing::warn!(client_id = %client_id, "dm without target operator id");
            return ReplyMessage::new("Error: target Telegram user id not specified");
        };
        let Some(content) = command.content_text() else {
            return ReplyMessage::new("Error: empty message content");
        };

        if self.operators.reply_actions().is_none() {
            // Without per-message reply buttons a direct message degrades to
            // a broadcast.
            let sent = self.handle_broadcast(content).await;
            return if sent > 0 {
                ReplyMessage::new(format!("Message sent to {sent} recipients"))
            } else {
                ReplyMessage::new("Failed to deliver the message to any recipient")
            };
        }

        match self.notify_client_message(target, &client_id, content).await {
            Ok(()) => ReplyMessage::new("Message sent to the specified Telegram user"),
            Err(e) => {
                tracing::warn!(client_id = %client_id, operator_id = %target, error = %e, "dm delivery failed");
                ReplyMessage::new(format!("Error: failed to deliver message to Telegram user {target}"))
            }
        }
    }

    /// Fan `text` out to every known operator.  Returns how many sends
    /// succeeded.
    pub async fn handle_broadcast(&self, text: &str) -> usize {
        let mut sent = 0;
        for operator in self.operators.list_known_operators() {
            match self.operators.send(operator, text).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    tracing::warn!(operator_id = %operator, error = %e, "broadcast send failed");
                }
            }
        }
        tracing::info!(sent, "broadcast finished");
        sent
    }

    /// Forward a client's text to one operator, annotated with the client's
    /// session state.  Only an active client gets a reply button.
    pub async fn notify_client_message(
        &self,
        operator: OperatorId,
        client_id: &ClientId,
        content: &str,
    ) -> Result<(), TransportError> {
        self.correlation.record_notification(operator, client_id.clone());

        let annotation = self.annotation_for(client_id);
        let text = format::client_notification(client_id, content, annotation);

        match (annotation, self.operators.reply_actions()) {
            (Annotation::Active, Some(actions)) => {
                actions
                    .send_with_action(operator, &text, &ReplyAction::reply_to(client_id))
                    .await
            }
            _ => self.operators.send(operator, &text).await,
        }
    }

    fn annotation_for(&self, client_id: &ClientId) -> Annotation {
        if client_id.is_unknown() {
            return Annotation::Disconnected { ago: None };
        }
        let now = Utc::now();
        match self.sessions.status(client_id, now, self.stale_after) {
            SessionStatus::Active => Annotation::Active,
            SessionStatus::Stale { .. } | SessionStatus::Absent => Annotation::Inactive,
            SessionStatus::Disconnected { since } => Annotation::Disconnected {
                ago: Some(now - since),
            },
        }
    }

    // ── Operator side ───────────────────────────────────────────────

    /// Dedup gate for inbound operator events.
    pub fn should_process(&self, event: &OperatorEvent) -> bool {
        self.dedup.should_process(event.event_id())
    }

    pub async fn handle_operator_event(&self, event: OperatorEvent) -> RouteOutcome {
        match event {
            OperatorEvent::Text { operator, text, .. } => {
                self.handle_operator_text(operator, &text).await
            }
            OperatorEvent::Callback { operator, data, .. } => {
                self.handle_callback(operator, &data).await
            }
        }
    }

    pub async fn handle_operator_text(&self, operator: OperatorId, text: &str) -> RouteOutcome {
        if let Some(target) = self.correlation.try_consume_reply(operator) {
            return self.deliver_pending_reply(operator, target, text).await;
        }

        match commands::parse_command(text) {
            Some(OperatorCommand::Reply) => match self.correlation.last_sender_of(operator) {
                Some(client_id) => self.arm_reply(operator, client_id).await,
                None => {
                    self.tell(operator, format::NO_KNOWN_CLIENT).await;
                    RouteOutcome::Failed(RoutingFailure::NoKnownClient)
                }
            },
            Some(command) => {
                self.run_control(operator, command).await;
                RouteOutcome::Control(command)
            }
            None => {
                self.tell(operator, format::UNKNOWN_COMMAND).await;
                RouteOutcome::Unrecognized
            }
        }
    }

    pub async fn handle_callback(&self, operator: OperatorId, data: &str) -> RouteOutcome {
        match commands::parse_reply_callback(data) {
            Some(client_id) => self.arm_reply(operator, client_id).await,
            None => {
                tracing::debug!(operator_id = %operator, data, "ignoring unknown callback");
                RouteOutcome::Ignored
            }
        }
    }

    async fn deliver_pending_reply(
        &self,
        operator: OperatorId,
        target: ClientId,
        text: &str,
    ) -> RouteOutcome {
        let Some(client_id) = self.correlation.resolve_target(operator, target) else {
            self.tell(operator, format::REPLY_UNKNOWN_RECIPIENT).await;
            return RouteOutcome::Failed(RoutingFailure::UnknownRecipient);
        };

        if self.sessions.is_disconnected(&client_id) {
            self.tell(operator, format::REPLY_TARGET_DISCONNECTED).await;
            return RouteOutcome::Failed(RoutingFailure::ClientDisconnected(client_id));
        }

        if self.send_reply(&client_id, text).await {
            self.tell(operator, format::REPLY_SENT).await;
            RouteOutcome::Delivered(client_id)
        } else {
            self.tell(operator, format::REPLY_FAILED).await;
            RouteOutcome::Failed(RoutingFailure::DeliveryFailed(client_id))
        }
    }

    /// Validate a reply target and arm it for the operator's next message.
    async fn arm_reply(&self, operator: OperatorId, client_id: ClientId) -> RouteOutcome {
        if client_id.is_unknown() {
            self.tell(operator, format::CANNOT_REPLY_UNKNOWN).await;
            return RouteOutcome::Failed(RoutingFailure::UnknownRecipient);
        }
        if self.sessions.is_disconnected(&client_id) {
            self.tell(operator, format::CANNOT_REPLY_DISCONNECTED).await;
            return RouteOutcome::Failed(RoutingFailure::ClientDisconnected(client_id));
        }
        if !self.sessions.is_active(&client_id) {
            self.tell(operator, format::MAY_BE_INACTIVE).await;
        }

        self.correlation.await_reply(operator, client_id.clone());
        self.tell(operator, format::REPLY_PROMPT).await;
        RouteOutcome::Armed(client_id)
    }

    async fn run_control(&self, operator: OperatorId, command: OperatorCommand) {
        match command {
            OperatorCommand::Start => self.tell(operator, format::WELCOME).await,
            OperatorCommand::Help => self.tell(operator, &commands::help_text()).await,
            OperatorCommand::Stats => {
                let stats = self.sessions.stats();
                self.tell(operator, &format::stats_report(&stats)).await;
                let removed = self.sessions.cleanup_disconnected();
                if removed > 0 {
                    self.tell(operator, &format::cleanup_report(removed)).await;
                }
            }
            OperatorCommand::Reply => {}
        }
    }

    /// Push a reply to a client.  A send failure that looks like a dropped
    /// connection marks the session disconnected.
    async fn send_reply(&self, client_id: &ClientId, text: &str) -> bool {
        let reply = ReplyMessage::new(text);
        match self.clients.send_to_client(client_id, &reply).await {
            Ok(()) => {
                tracing::info!(client_id = %client_id, "reply delivered to client");
                true
            }
            Err(e) => {
                tracing::warn!(client_id = %client_id, error = %e, "reply delivery failed");
                if e.is_connection_reset() {
                    self.sessions.disconnect(client_id);
                }
                false
            }
        }
    }

    async fn tell(&self, operator: OperatorId, text: &str) {
        if let Err(e) = self.operators.send(operator, text).await {
            tracing::warn!(operator_id = %operator, error = %e, "operator notice failed");
        }
    }
}
