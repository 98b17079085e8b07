//! Client command and reply models.

use serde::{Deserialize, Serialize};

/// A command sent by a clipboard client.
///
/// `command` selects the handler (`dm`, `broadcast`), `content` carries the
/// clipboard text and `target_user_id` names the operator for direct
/// messages.  `option` is a free-form `key=value|key=value` string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMessage {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, alias = "targetUserId", skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<i64>,
}

impl CommandMessage {
    /// The `client=<id>` entry of `option`, if present.
    pub fn client_option(&self) -> Option<&str> {
        self.option
            .as_deref()?
            .split('|')
            .find_map(|part| part.trim().strip_prefix("client="))
            .filter(|id| !id.is_empty())
    }

    /// Trimmed content, `None` when missing or blank.
    pub fn content_text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// Response text returned to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyMessage {
    pub response: String,
}

impl ReplyMessage {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}
