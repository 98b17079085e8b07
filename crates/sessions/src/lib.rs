//! Session and reply correlation state for the clipboard bridge.
//!
//! Three independently locked structures: the client [`SessionRegistry`],
//! the inbound [`UpdateDeduplicator`] and the operator-side
//! [`ReplyCorrelationTable`].  None of them performs I/O.

pub mod correlation;
pub mod dedup;
pub mod registry;

pub use correlation::ReplyCorrelationTable;
pub use dedup::{callback_event_id, message_event_id, UpdateDeduplicator};
pub use registry::{ClientSession, RegistryStats, SessionRegistry, SessionState, SessionStatus};
