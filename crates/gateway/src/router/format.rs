//! Operator-facing text.

use chrono::Duration;

use cb_domain::ClientId;
use cb_sessions::RegistryStats;

pub const REPLY_PROMPT: &str = "🔄 Enter your reply for the client:";
pub const REPLY_SENT: &str = "✅ Your reply was sent to the client!";
pub const REPLY_FAILED: &str = "❌ Failed to send reply to client. Try later.";
pub const REPLY_UNKNOWN_RECIPIENT: &str = "⚠️ Cannot send reply: unknown recipient";
pub const REPLY_TARGET_DISCONNECTED: &str = "⚠️ Cannot send reply: client disconnected";
pub const CANNOT_REPLY_UNKNOWN: &str = "⚠️ Cannot reply: unknown recipient";
pub const CANNOT_REPLY_DISCONNECTED: &str = "⚠️ Cannot reply: client disconnected";
pub const MAY_BE_INACTIVE: &str = "⚠️ Warning: client may be inactive, reply may not arrive";
pub const NO_KNOWN_CLIENT: &str = "⚠️ No saved messages from clients";
pub const WELCOME: &str = "Hello! I relay clipboard text between your devices and this chat.";
pub const UNKNOWN_COMMAND: &str = "Unknown command. Use /help for the list of commands.";

/// How a client looked when its message was forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Annotation {
    Active,
    Inactive,
    Disconnected { ago: Option<Duration> },
}

/// Human-readable time since an event: seconds under a minute, whole
/// minutes under an hour, otherwise hours with one decimal.
pub fn elapsed(ago: Duration) -> String {
    let millis = ago.num_milliseconds().max(0);
    if millis < 60_000 {
        format!("{} sec. ago", millis / 1_000)
    } else if millis < 3_600_000 {
        format!("{} min. ago", millis / 60_000)
    } else {
        format!("{:.1} h. ago", millis as f64 / 3_600_000.0)
    }
}

pub fn client_notification(client_id: &ClientId, content: &str, annotation: Annotation) -> String {
    match annotation {
        Annotation::Active => format!("Message from client ({client_id}):\n---\n{content}"),
        Annotation::Inactive => format!(
            "Message from client (INACTIVE):\n---\n{content}\n\n⚠️ Client inactive, reply may not arrive."
        ),
        Annotation::Disconnected { ago } => {
            let when = ago.map(|d| format!(" {}", elapsed(d))).unwrap_or_default();
            format!(
                "Message from client (DISCONNECTED{when}):\n---\n{content}\n\n⚠️ Client disconnected, reply impossible."
            )
        }
    }
}

pub fn stats_report(stats: &RegistryStats) -> String {
    format!(
        "📊 Client connection stats:\n\n\
         Active sessions: {}\n\
         Disconnected sessions: {}\n\
         Total sessions: {}\n\
         Total disconnects: {}",
        stats.active, stats.disconnected, stats.total_registered, stats.total_disconnected
    )
}

pub fn cleanup_report(removed: usize) -> String {
    format!("🧹 Cleaned {removed} disconnected sessions")
}
