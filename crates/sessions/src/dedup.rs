//! Bounded deduplication of inbound operator events.

use std::collections::{HashSet, VecDeque};

use parking_lot::Mutex;

pub const DEFAULT_HIGH_WATER: usize = 1000;
pub const DEFAULT_LOW_WATER: usize = 500;

/// Dedup key for a chat message update.  Message ids are only unique
/// within one chat, so the chat id is part of the key.
pub fn message_event_id(chat_id: i64, message_id: i64) -> String {
    format!("msg_{chat_id}_{message_id}")
}

/// Dedup key for a callback query update.
pub fn callback_event_id(callback_id: &str) -> String {
    format!("cbq_{callback_id}")
}

#[derive(Default)]
struct Seen {
    ids: HashSet<String>,
    order: VecDeque<String>,
}

/// Remembers recently seen event ids so a retried delivery is processed once.
///
/// Once more than `high_water` ids are held, the oldest are evicted in one
/// pass until `low_water` remain.
pub struct UpdateDeduplicator {
    high_water: usize,
    low_water: usize,
    seen: Mutex<Seen>,
}

impl Default for UpdateDeduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_HIGH_WATER, DEFAULT_LOW_WATER)
    }
}

impl UpdateDeduplicator {
    pub fn new(high_water: usize, low_water: usize) -> Self {
        let high_water = high_water.max(1);
        Self {
            high_water,
            low_water: low_water.min(high_water),
            seen: Mutex::new(Seen::default()),
        }
    }

    /// `true` the first time `event_id` is offered, `false` afterwards.
    /// Events without an id are always processed.
    pub fn should_process(&self, event_id: Option<&str>) -> bool {
        let Some(event_id) = event_id else {
            return true;
        };

        let mut seen = self.seen.lock();
        if !seen.ids.insert(event_id.to_owned()) {
            tracing::debug!(event_id, "duplicate operator event dropped");
            return false;
        }
        seen.order.push_back(event_id.to_owned());

        if seen.ids.len() > self.high_water {
            let mut evicted = 0usize;
            while seen.ids.len() > self.low_water {
                let Some(oldest) = seen.order.pop_front() else {
                    break;
                };
                seen.ids.remove(&oldest);
                evicted += 1;
            }
            tracing::debug!(evicted, retained = seen.ids.len(), "dedup set trimmed");
        }
        true
    }

    pub fn len(&self) -> usize {
        self.seen.lock().ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
