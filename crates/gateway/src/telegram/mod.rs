//! Telegram Bot API operator channel.
//!
//! [`TelegramClient`] is a thin JSON-over-HTTPS wrapper; [`TelegramOperators`]
//! adapts it to the relay's [`OperatorTransport`] seam and
//! [`poller`] turns long-polled updates into operator events.

pub mod poller;
mod types;

use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use cb_domain::config::TelegramConfig;
use cb_domain::error::{Error, Result};
use cb_domain::OperatorId;
use cb_sessions::{callback_event_id, message_event_id};

use crate::transport::{OperatorEvent, OperatorTransport, ReplyAction, ReplyActions, TransportError};

pub use types::{CallbackQuery, Chat, InlineKeyboardButton, InlineKeyboardMarkup, Message, Update, User};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HTTP client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> std::result::Result<Vec<Update>, TransportError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: Some(vec!["message", "callback_query"]),
        };
        self.post("getUpdates", &request).await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> std::result::Result<(), TransportError> {
        let request = SendMessageRequest {
            chat_id,
            text,
            reply_markup,
        };
        let _: serde_json::Value = self.post("sendMessage", &request).await?;
        Ok(())
    }

    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
    ) -> std::result::Result<(), TransportError> {
        let request = AnswerCallbackQueryRequest { callback_query_id };
        let _: bool = self.post("answerCallbackQuery", &request).await?;
        Ok(())
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        method: &str,
        body: &B,
    ) -> std::result::Result<T, TransportError> {
        let url = format!("{}/bot{}/{}", self.base_url, self.token, method);
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Request(format!("telegram {method}: {}", e.without_url())))?;

        let payload: TelegramResponse<T> = response
            .json()
            .await
            .map_err(|e| TransportError::Request(format!("decoding telegram {method}: {}", e.without_url())))?;

        if !payload.ok {
            let description = payload
                .description
                .unwrap_or_else(|| "Telegram API error".to_string());
            return Err(TransportError::Rejected(description));
        }

        payload
            .result
            .ok_or_else(|| TransportError::Rejected(format!("telegram {method}: empty result")))
    }
}

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_updates: Option<Vec<&'static str>>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboardMarkup>,
}

#[derive(Debug, Serialize)]
struct AnswerCallbackQueryRequest<'a> {
    callback_query_id: &'a str,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Operator transport
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The bot channel as seen by the relay.  Known operators are the
/// configured main user plus everyone who has written to the bot.
pub struct TelegramOperators {
    client: TelegramClient,
    known: RwLock<BTreeSet<i64>>,
    allowlist: HashSet<i64>,
    poll_timeout: Duration,
}

impl TelegramOperators {
    pub fn from_config(config: &TelegramConfig) -> Result<Self> {
        let token = config.resolve_bot_token().ok_or_else(|| {
            Error::Config(format!(
                "telegram.bot_token or ${} is required",
                config.bot_token_env
            ))
        })?;

        let known: BTreeSet<i64> = config.main_user_id.into_iter().collect();
        tracing::info!(
            bot_username = config.bot_username.as_deref().unwrap_or("-"),
            main_user_id = ?config.main_user_id,
            allowlist = config.allowlist_user_ids.len(),
            "telegram operator channel ready"
        );

        Ok(Self {
            client: TelegramClient::new(config.api_base_url.clone(), token),
            known: RwLock::new(known),
            allowlist: config.allowlist_user_ids.iter().copied().collect(),
            poll_timeout: Duration::from_secs(config.poll_timeout_secs),
        })
    }

    pub fn client(&self) -> &TelegramClient {
        &self.client
    }

    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    fn is_allowed(&self, user_id: i64) -> bool {
        self.allowlist.is_empty() || self.allowlist.contains(&user_id)
    }

    fn observe(&self, user_id: i64) {
        if self.known.write().insert(user_id) {
            tracing::info!(operator_id = user_id, "new operator seen");
        }
    }

    /// Convert an update into a relay event, recording its sender as a known
    /// operator.  Bots, disallowed users and non-text messages yield `None`.
    pub fn to_event(&self, update: Update) -> Option<OperatorEvent> {
        if let Some(message) = update.message {
            let from = message.from?;
            if from.is_bot || !self.is_allowed(from.id) {
                tracing::debug!(user_id = from.id, chat_id = message.chat.id, "update ignored");
                return None;
            }
            self.observe(from.id);
            let text = message.text?;
            return Some(OperatorEvent::Text {
                operator: OperatorId(from.id),
                text,
                event_id: Some(message_event_id(message.chat.id, message.message_id)),
            });
        }

        if let Some(query) = update.callback_query {
            if !self.is_allowed(query.from.id) {
                tracing::debug!(user_id = query.from.id, "callback ignored");
                return None;
            }
            self.observe(query.from.id);
            return Some(OperatorEvent::Callback {
                operator: OperatorId(query.from.id),
                data: query.data.unwrap_or_default(),
                event_id: Some(callback_event_id(&query.id)),
            });
        }

        None
    }
}

#[async_trait]
impl OperatorTransport for TelegramOperators {
    async fn send(&self, operator: OperatorId, text: &str) -> std::result::Result<(), TransportError> {
        self.client.send_message(operator.get(), text, None).await
    }

    fn list_known_operators(&self) -> Vec<OperatorId> {
        self.known.read().iter().copied().map(OperatorId).collect()
    }

    fn reply_actions(&self) -> Option<&dyn ReplyActions> {
        Some(self)
    }
}

#[async_trait]
impl ReplyActions for TelegramOperators {
    async fn send_with_action(
        &self,
        operator: OperatorId,
        text: &str,
        action: &ReplyAction,
    ) -> std::result::Result<(), TransportError> {
        let markup = InlineKeyboardMarkup::single(action.label.clone(), action.token.clone());
        self.client
            .send_message(operator.get(), text, Some(&markup))
            .await
    }
}
