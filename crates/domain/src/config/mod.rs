mod observability;
mod server;
mod sessions;
mod telegram;

pub use observability::*;
pub use server::*;
pub use sessions::*;
pub use telegram::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Pure: environment variables are not consulted, so a token supplied
    /// only through `telegram.bot_token_env` is not reported as missing.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error(
                "server.port",
                "port must be greater than 0",
            ));
        }

        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }

        if !self.server.ws_path.starts_with('/') {
            errors.push(ConfigError::error(
                "server.ws_path",
                "ws_path must start with '/'",
            ));
        }

        if !self.server.host.is_empty()
            && self.server.host != "127.0.0.1"
            && self.server.host != "localhost"
        {
            errors.push(ConfigError::warning(
                "server.host",
                "the HTTP API has no authentication; bind beyond loopback only behind a proxy",
            ));
        }

        let has_inline_token = self
            .telegram
            .bot_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());
        if !has_inline_token && self.telegram.bot_token_env.trim().is_empty() {
            errors.push(ConfigError::error(
                "telegram.bot_token",
                "either bot_token or bot_token_env must be set",
            ));
        }

        if self.telegram.main_user_id.is_none() {
            errors.push(ConfigError::warning(
                "telegram.main_user_id",
                "no main operator configured; broadcasts reach only users who messaged the bot",
            ));
        }

        if self.telegram.poll_timeout_secs == 0 {
            errors.push(ConfigError::warning(
                "telegram.poll_timeout_secs",
                "0 disables long polling and busy-loops getUpdates",
            ));
        }

        if self.sessions.dedup_low_water == 0 {
            errors.push(ConfigError::error(
                "sessions.dedup_low_water",
                "low-water mark must be greater than 0",
            ));
        }

        if self.sessions.dedup_low_water >= self.sessions.dedup_high_water {
            errors.push(ConfigError::error(
                "sessions.dedup_low_water",
                format!(
                    "low-water mark ({}) must be below high-water mark ({})",
                    self.sessions.dedup_low_water, self.sessions.dedup_high_water
                ),
            ));
        }

        if self.observability.log_filter.trim().is_empty() {
            errors.push(ConfigError::warning(
                "observability.log_filter",
                "empty filter; RUST_LOG must be set to see any logs",
            ));
        }

        if !(0.0..=1.0).contains(&self.observability.sample_rate) {
            errors.push(ConfigError::error(
                "observability.sample_rate",
                "sample_rate must be within 0.0..=1.0",
            ));
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_token() -> Config {
        let mut cfg = Config::default();
        cfg.telegram.main_user_id = Some(1);
        cfg
    }

    #[test]
    fn default_config_has_no_errors() {
        let issues = with_token().validate();
        assert!(
            issues.iter().all(|i| i.severity != ConfigSeverity::Error),
            "unexpected errors: {issues:?}"
        );
    }

    #[test]
    fn inverted_watermarks_are_rejected() {
        let mut cfg = with_token();
        cfg.sessions.dedup_high_water = 100;
        cfg.sessions.dedup_low_water = 100;
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.field == "sessions.dedup_low_water" && i.severity == ConfigSeverity::Error));
    }

    #[test]
    fn missing_token_source_is_an_error() {
        let mut cfg = with_token();
        cfg.telegram.bot_token = None;
        cfg.telegram.bot_token_env = String::new();
        let issues = cfg.validate();
        assert!(issues.iter().any(|i| i.field == "telegram.bot_token"));
    }

    #[test]
    fn display_includes_severity_tag() {
        let err = ConfigError::warning("a.b", "careful");
        assert_eq!(err.to_string(), "[WARN] a.b: careful");
    }
}
