//! Client wire protocol: the JSON envelope exchanged with clipboard clients
//! over the relay WebSocket.
//!
//! Every frame is a single text message holding one [`WsMessage`], tagged by
//! its `type` field.

use cb_domain::ClientId;
use serde::{Deserialize, Serialize};

/// WebSocket message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsMessage {
    /// Relay → Client: handshake accepted, carries the assigned id.
    #[serde(rename = "welcome")]
    Welcome { client_id: ClientId },

    /// Client → Relay: subscribe to a destination (doubles as a heartbeat).
    #[serde(rename = "subscribe")]
    Subscribe {
        #[serde(default)]
        destination: Option<String>,
    },

    /// Client → Relay: execute a relay command (`dm`, `broadcast`).
    #[serde(rename = "command")]
    Command {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        option: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_user_id: Option<i64>,
    },

    /// Relay → Client: outcome of a `command`.
    #[serde(rename = "command_result")]
    CommandResult { response: String },

    /// Relay → Client: an operator reply addressed to this client.
    #[serde(rename = "reply")]
    Reply { response: String },

    /// Relay → Client: a frame could not be understood.
    #[serde(rename = "error")]
    Error { message: String },

    /// Bidirectional: heartbeat.
    #[serde(rename = "ping")]
    Ping { timestamp: i64 },

    /// Bidirectional: heartbeat response.
    #[serde(rename = "pong")]
    Pong { timestamp: i64 },
}

impl WsMessage {
    /// Encode as a JSON text frame.
    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decode a JSON text frame.
    pub fn from_text(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_frame_parses_with_optional_fields_missing() {
        let msg = WsMessage::from_text(r#"{"type":"command","command":"broadcast","content":"hi"}"#)
            .unwrap();
        assert_eq!(
            msg,
            WsMessage::Command {
                command: "broadcast".into(),
                option: None,
                content: Some("hi".into()),
                target_user_id: None,
            }
        );
    }

    #[test]
    fn welcome_is_tagged_by_type() {
        let text = WsMessage::Welcome {
            client_id: ClientId::from("abc"),
        }
        .to_text()
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "welcome");
        assert_eq!(value["client_id"], "abc");
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(WsMessage::from_text(r#"{"type":"node_hello"}"#).is_err());
    }
}
