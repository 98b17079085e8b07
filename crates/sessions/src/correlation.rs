//! Reply correlation: which client an operator's next free-form message is
//! meant for, and which client last notified each operator.

use std::collections::HashMap;

use parking_lot::Mutex;

use cb_domain::{ClientId, OperatorId};

#[derive(Default)]
struct Table {
    pending: HashMap<OperatorId, ClientId>,
    last_sender: HashMap<OperatorId, ClientId>,
}

#[derive(Default)]
pub struct ReplyCorrelationTable {
    table: Mutex<Table>,
}

impl ReplyCorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a pending reply.  Overwrites any earlier target for the operator.
    pub fn await_reply(&self, operator: OperatorId, client_id: ClientId) {
        let previous = self.table.lock().pending.insert(operator, client_id.clone());
        tracing::debug!(
            operator_id = %operator,
            client_id = %client_id,
            replaced = previous.is_some(),
            "reply armed"
        );
    }

    /// Read and clear the pending target in one step.
    pub fn try_consume_reply(&self, operator: OperatorId) -> Option<ClientId> {
        self.table.lock().pending.remove(&operator)
    }

    pub fn record_notification(&self, operator: OperatorId, client_id: ClientId) {
        self.table.lock().last_sender.insert(operator, client_id);
    }

    pub fn last_sender_of(&self, operator: OperatorId) -> Option<ClientId> {
        self.table.lock().last_sender.get(&operator).cloned()
    }

    /// Resolve a consumed target.  The unknown sentinel falls back to the
    /// operator's last sender; `None` when neither names a real client.
    pub fn resolve_target(&self, operator: OperatorId, target: ClientId) -> Option<ClientId> {
        if !target.is_unknown() {
            return Some(target);
        }
        self.last_sender_of(operator)
            .filter(|fallback| !fallback.is_unknown())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OP: OperatorId = OperatorId(7);

    #[test]
    fn pending_reply_is_consumed_once() {
        let table = ReplyCorrelationTable::new();
        table.await_reply(OP, ClientId::from("a"));
        assert_eq!(table.try_consume_reply(OP), Some(ClientId::from("a")));
        assert_eq!(table.try_consume_reply(OP), None);
    }

    #[test]
    fn later_request_overwrites() {
        let table = ReplyCorrelationTable::new();
        table.await_reply(OP, ClientId::from("a"));
        table.await_reply(OP, ClientId::from("b"));
        assert_eq!(table.try_consume_reply(OP), Some(ClientId::from("b")));
    }

    #[test]
    fn operators_are_independent() {
        let table = ReplyCorrelationTable::new();
        table.await_reply(OP, ClientId::from("a"));
        assert_eq!(table.try_consume_reply(OperatorId(8)), None);
        assert_eq!(table.try_consume_reply(OP), Some(ClientId::from("a")));
    }

    #[test]
    fn sentinel_falls_back_to_last_sender() {
        let table = ReplyCorrelationTable::new();
        assert_eq!(table.resolve_target(OP, ClientId::unknown()), None);

        table.record_notification(OP, ClientId::from("a"));
        assert_eq!(
            table.resolve_target(OP, ClientId::unknown()),
            Some(ClientId::from("a"))
        );
        assert_eq!(
            table.resolve_target(OP, ClientId::from("b")),
            Some(ClientId::from("b"))
        );
    }

    #[test]
    fn sentinel_last_sender_does_not_resolve() {
        let table = ReplyCorrelationTable::new();
        table.record_notification(OP, ClientId::unknown());
        assert_eq!(table.resolve_target(OP, ClientId::unknown()), None);
    }
}
