//! AppState construction and background-task spawning extracted from `main.rs`.

use std::sync::Arc;

use tokio::sync::mpsc;

use cb_domain::config::{Config, ConfigSeverity};
use cb_sessions::{ReplyCorrelationTable, SessionRegistry, UpdateDeduplicator};

use crate::clients::registry::ClientHub;
use crate::router::NotificationRouter;
use crate::state::AppState;
use crate::transport::{OperatorEvent, OperatorTransport, QueuedClientEvent};
use crate::workers;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Receiving ends of the event channels, consumed by
/// [`spawn_background_tasks`].
pub struct EventInbox {
    client_rx: mpsc::Receiver<QueuedClientEvent>,
    operator_rx: mpsc::Receiver<OperatorEvent>,
    /// Where the operator transport should push its events.
    pub operator_tx: mpsc::Sender<OperatorEvent>,
}

/// Log every config issue and fail on errors.
pub fn check_config(config: &Config) -> anyhow::Result<()> {
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("config validation failed with {errors} error(s)");
    }
    Ok(())
}

/// Wire the relay core around `operators` and return the shared state plus
/// the event inbox.
pub fn build_app_state(
    config: Arc<Config>,
    operators: Arc<dyn OperatorTransport>,
) -> anyhow::Result<(AppState, EventInbox)> {
    check_config(&config)?;

    // ── Session & correlation state ─────────────────────────────────
    let sessions = Arc::new(SessionRegistry::new());
    let dedup = Arc::new(UpdateDeduplicator::new(
        config.sessions.dedup_high_water,
        config.sessions.dedup_low_water,
    ));
    let correlation = Arc::new(ReplyCorrelationTable::new());
    tracing::info!(
        dedup_high_water = config.sessions.dedup_high_water,
        dedup_low_water = config.sessions.dedup_low_water,
        stale_after_secs = config.sessions.stale_after_secs,
        "session state ready"
    );

    // ── Client hub + router ─────────────────────────────────────────
    let clients = Arc::new(ClientHub::new());
    let stale_after = chrono::Duration::seconds(
        i64::try_from(config.sessions.stale_after_secs)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1_000),
    );
    let router = Arc::new(NotificationRouter::new(
        sessions,
        dedup,
        correlation,
        clients.clone(),
        operators,
        stale_after,
    ));

    // ── Event channels ──────────────────────────────────────────────
    let (client_tx, client_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (operator_tx, operator_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

    let state = AppState {
        config,
        clients,
        router,
        client_events: client_tx,
    };
    let inbox = EventInbox {
        client_rx,
        operator_rx,
        operator_tx,
    };
    Ok((state, inbox))
}

/// Spawn the event workers and, when configured, periodic session cleanup.
pub fn spawn_background_tasks(state: &AppState, inbox: EventInbox) {
    workers::spawn_client_worker(state.router.clone(), inbox.client_rx);
    workers::spawn_operator_dispatcher(state.router.clone(), inbox.operator_rx);

    if let Some(secs) = state.config.sessions.cleanup_interval_secs.filter(|s| *s > 0) {
        workers::spawn_cleanup_loop(state.router.clone(), std::time::Duration::from_secs(secs));
        tracing::info!(interval_secs = secs, "periodic session cleanup enabled");
    }
    tracing::info!("background tasks spawned");
}
