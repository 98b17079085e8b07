//! Event workers.
//!
//! Client lifecycle events are applied by one dedicated task, in arrival
//! order.  Operator events pass the dedup gate in the dispatcher and are
//! then queued per operator: one operator's messages are handled
//! sequentially, different operators run concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use cb_domain::OperatorId;

use crate::router::{NotificationRouter, RouteOutcome};
use crate::transport::{OperatorEvent, QueuedClientEvent};

pub fn spawn_client_worker(
    router: Arc<NotificationRouter>,
    mut events: mpsc::Receiver<QueuedClientEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(QueuedClientEvent { event, applied }) = events.recv().await {
            tracing::debug!(event = ?event, "client event");
            router.apply_client_event(&event);
            if let Some(applied) = applied {
                let _ = applied.send(());
            }
        }
        tracing::debug!("client event channel closed");
    })
}

pub fn spawn_operator_dispatcher(
    router: Arc<NotificationRouter>,
    mut events: mpsc::Receiver<OperatorEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut queues: HashMap<OperatorId, mpsc::UnboundedSender<OperatorEvent>> = HashMap::new();

        while let Some(event) = events.recv().await {
            if !router.should_process(&event) {
                continue;
            }
            enqueue(&mut queues, &router, event);
        }
        tracing::debug!("operator event channel closed");
    })
}

fn enqueue(
    queues: &mut HashMap<OperatorId, mpsc::UnboundedSender<OperatorEvent>>,
    router: &Arc<NotificationRouter>,
    event: OperatorEvent,
) {
    let operator = event.operator();
    let sender = queues
        .entry(operator)
        .or_insert_with(|| spawn_queue_worker(operator, Arc::clone(router)));

    if let Err(err) = sender.send(event) {
        // The worker is gone; start a fresh one and retry once.
        let fresh = spawn_queue_worker(operator, Arc::clone(router));
        let _ = fresh.send(err.0);
        queues.insert(operator, fresh);
    }
}

fn spawn_queue_worker(
    operator: OperatorId,
    router: Arc<NotificationRouter>,
) -> mpsc::UnboundedSender<OperatorEvent> {
    let (sender, mut receiver) = mpsc::unbounded_channel::<OperatorEvent>();
    tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            let outcome = router.handle_operator_event(event).await;
            match &outcome {
                RouteOutcome::Failed(failure) => {
                    tracing::info!(operator_id = %operator, failure = ?failure, "operator action refused");
                }
                other => {
                    tracing::debug!(operator_id = %operator, outcome = ?other, "operator event routed");
                }
            }
        }
    });
    sender
}

/// Purge disconnected sessions every `every`.
pub fn spawn_cleanup_loop(
    router: Arc<NotificationRouter>,
    every: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = router.sessions().cleanup_disconnected();
            tracing::debug!(removed, "periodic session cleanup");
        }
    })
}
