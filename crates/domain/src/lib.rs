//! Shared domain types for the clipboard bridge: configuration, the common
//! error type, identifiers and the client command/reply models.

pub mod config;
pub mod error;
pub mod ids;
pub mod message;

pub use ids::{ClientId, OperatorId};
pub use message::{CommandMessage, ReplyMessage};
