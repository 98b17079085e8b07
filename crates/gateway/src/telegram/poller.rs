//! Long-polling loop feeding Telegram updates into the operator event
//! channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::transport::OperatorEvent;

use super::TelegramOperators;

const MAX_BACKOFF: Duration = Duration::from_secs(60);

pub fn spawn(
    operators: Arc<TelegramOperators>,
    events: mpsc::Sender<OperatorEvent>,
) -> JoinHandle<()> {
    tokio::spawn(run(operators, events))
}

async fn run(operators: Arc<TelegramOperators>, events: mpsc::Sender<OperatorEvent>) {
    let mut offset: Option<i64> = None;
    let mut backoff = Duration::from_secs(1);
    tracing::info!(timeout_secs = operators.poll_timeout().as_secs(), "telegram polling started");

    loop {
        let updates = match operators
            .client()
            .get_updates(offset, operators.poll_timeout())
            .await
        {
            Ok(updates) => {
                backoff = Duration::from_secs(1);
                updates
            }
            Err(e) => {
                tracing::warn!(error = %e, retry_in_secs = backoff.as_secs(), "getUpdates failed");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
                continue;
            }
        };

        for update in updates {
            offset = Some(update.update_id + 1);

            if let Some(query) = &update.callback_query {
                if let Err(e) = operators.client().answer_callback_query(&query.id).await {
                    tracing::debug!(error = %e, callback_id = %query.id, "answerCallbackQuery failed");
                }
            }

            let Some(event) = operators.to_event(update) else {
                continue;
            };
            if events.send(event).await.is_err() {
                tracing::info!("operator event channel closed, telegram polling stopped");
                return;
            }
        }
    }
}
