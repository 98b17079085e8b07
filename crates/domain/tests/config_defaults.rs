use cb_domain::config::{Config, ConfigSeverity};

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
}

#[test]
fn explicit_zero_host_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 3210
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 3210);
}

#[test]
fn public_bind_is_a_warning_only() {
    let mut config = Config::default();
    config.server.host = "0.0.0.0".into();
    let issue = config
        .validate()
        .into_iter()
        .find(|i| i.field == "server.host")
        .unwrap();
    assert_eq!(issue.severity, ConfigSeverity::Warning);
}

#[test]
fn telegram_token_env_default() {
    let config = Config::default();
    assert_eq!(config.telegram.bot_token_env, "CB_TELEGRAM_BOT_TOKEN");
    assert!(config.telegram.bot_token.is_none());
    assert!(config.telegram.allowlist_user_ids.is_empty());
}

#[test]
fn dedup_watermarks_default_to_1000_and_500() {
    let config = Config::default();
    assert_eq!(config.sessions.dedup_high_water, 1000);
    assert_eq!(config.sessions.dedup_low_water, 500);
    assert!(config.sessions.cleanup_interval_secs.is_none());
}

#[test]
fn full_file_parses() {
    let toml_str = r#"
[server]
ws_path = "/clipboard"

[telegram]
bot_token = "123:abc"
main_user_id = 42

[sessions]
dedup_high_water = 200
dedup_low_water = 50
cleanup_interval_secs = 600

[observability]
service_name = "relay-staging"
json_logs = false
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.ws_path, "/clipboard");
    assert_eq!(config.telegram.main_user_id, Some(42));
    assert_eq!(config.sessions.cleanup_interval_secs, Some(600));
    assert_eq!(config.observability.service_name, "relay-staging");
    assert!(!config.observability.json_logs);
    assert!(config
        .validate()
        .iter()
        .all(|issue| issue.severity != ConfigSeverity::Error));
}

#[test]
fn ws_path_without_slash_is_rejected() {
    let toml_str = r#"
[server]
ws_path = "ws"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let issues = config.validate();
    assert!(issues
        .iter()
        .any(|i| i.field == "server.ws_path" && i.severity == ConfigSeverity::Error));
}
