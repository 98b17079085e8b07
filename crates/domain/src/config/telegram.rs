use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Telegram (operator channel)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Inline bot token.  Prefer `bot_token_env` outside of local testing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
    /// Environment variable consulted when `bot_token` is unset.
    #[serde(default = "d_token_env")]
    pub bot_token_env: String,
    #[serde(default)]
    pub bot_username: Option<String>,
    /// Operator that is always part of the known-operator list, even before
    /// they have written to the bot.
    #[serde(default)]
    pub main_user_id: Option<i64>,
    /// When non-empty, updates from any other user are ignored.
    #[serde(default)]
    pub allowlist_user_ids: Vec<i64>,
    #[serde(default = "d_poll_timeout")]
    pub poll_timeout_secs: u64,
    #[serde(default = "d_api_base")]
    pub api_base_url: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            bot_token_env: d_token_env(),
            bot_username: None,
            main_user_id: None,
            allowlist_user_ids: Vec::new(),
            poll_timeout_secs: d_poll_timeout(),
            api_base_url: d_api_base(),
        }
    }
}

impl TelegramConfig {
    /// Resolve the bot token: inline value first, then the configured
    /// environment variable.  Blank values count as missing.
    pub fn resolve_bot_token(&self) -> Option<String> {
        self.bot_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .or_else(|| {
                std::env::var(&self.bot_token_env)
                    .ok()
                    .map(|token| token.trim().to_string())
                    .filter(|token| !token.is_empty())
            })
    }
}

fn d_token_env() -> String {
    "CB_TELEGRAM_BOT_TOKEN".into()
}
fn d_poll_timeout() -> u64 {
    30
}
fn d_api_base() -> String {
    "https://api.telegram.org".into()
}
