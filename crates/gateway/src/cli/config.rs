use cb_domain::config::{Config, ConfigSeverity};

/// Parse and validate the config, printing any issues.
///
/// Returns `false` when any error-level issue is found.  A bot token that
/// cannot be resolved in the current environment is reported as a warning.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();
    let token_missing = config.telegram.resolve_bot_token().is_none();

    if issues.is_empty() && !token_missing {
        println!("Config OK ({config_path})");
        return true;
    }

    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    let mut warning_count = issues.len() - error_count;

    for issue in &issues {
        println!("{issue}");
    }
    if token_missing {
        warning_count += 1;
        println!(
            "[WARN] telegram.bot_token: not set inline and ${} is empty in this environment",
            config.telegram.bot_token_env
        );
    }

    println!(
        "\n{} error(s), {} warning(s) in {config_path}",
        error_count, warning_count,
    );

    error_count == 0
}

/// Dump the resolved config (with all defaults filled in) as TOML.  An
/// inline bot token is masked.
pub fn show(config: &Config) {
    let mut redacted = config.clone();
    if redacted.telegram.bot_token.is_some() {
        redacted.telegram.bot_token = Some("***".into());
    }
    match toml::to_string_pretty(&redacted) {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("Failed to serialize config: {e}");
            std::process::exit(1);
        }
    }
}
