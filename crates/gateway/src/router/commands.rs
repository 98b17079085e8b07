//! Operator command parsing.

use cb_domain::ClientId;

use crate::transport::REPLY_ACTION_PREFIX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    Start,
    Help,
    Reply,
    Stats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CommandDef {
    command: OperatorCommand,
    pattern: &'static str,
    description: &'static str,
}

const COMMAND_DEFS: &[CommandDef] = &[
    CommandDef {
        command: OperatorCommand::Start,
        pattern: "/start",
        description: "about this bot",
    },
    CommandDef {
        command: OperatorCommand::Help,
        pattern: "/help",
        description: "list commands",
    },
    CommandDef {
        command: OperatorCommand::Reply,
        pattern: "/reply",
        description: "reply to the last client message",
    },
    CommandDef {
        command: OperatorCommand::Stats,
        pattern: "/stats",
        description: "client connection statistics",
    },
];

/// Parse a recognised command.  Accepts a `@botname` suffix and trailing
/// arguments; matching is case-insensitive.
pub fn parse_command(text: &str) -> Option<OperatorCommand> {
    let lowered = text.trim().to_lowercase();
    COMMAND_DEFS
        .iter()
        .find(|def| command_matches(&lowered, def.pattern))
        .map(|def| def.command)
}

/// Extract the client id from `reply:<clientId>` callback data.
pub fn parse_reply_callback(data: &str) -> Option<ClientId> {
    data.strip_prefix(REPLY_ACTION_PREFIX)
        .map(|id| ClientId::from_origin(Some(id)))
}

pub fn help_text() -> String {
    let mut text = String::from("Available commands:");
    for def in COMMAND_DEFS {
        text.push_str(&format!("\n{} - {}", def.pattern, def.description));
    }
    text
}

fn command_matches(trimmed_text: &str, command: &str) -> bool {
    trimmed_text.strip_prefix(command).is_some_and(|rest| {
        rest.is_empty() || rest.starts_with('@') || rest.starts_with(char::is_whitespace)
    })
}
