use dashmap::DashMap;
use std::collections::HashMap;

/// Storage for consumer read positions, keyed by consumer id and topic.
///
/// The broker only mutates a cursor while it holds the lock of that cursor's
/// topic, so implementations need thread safety but not compare-and-swap.
pub trait CursorStore: Send + Sync {
    fn get(&self, consumer_id: &str, topic: &str) -> Option<u64>;

    fn set(&self, consumer_id: &str, topic: &str, offset: u64);

    fn remove(&self, consumer_id: &str, topic: &str) -> Option<u64>;

    /// All topics the consumer holds a cursor on, with their next offsets.
    fn positions(&self, consumer_id: &str) -> HashMap<String, u64>;
}

/// Default volatile store: one topic → offset map per consumer.
#[derive(Debug, Default)]
pub struct InMemoryCursorStore {
    consumers: DashMap<String, HashMap<String, u64>>,
}

impl InMemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CursorStore for InMemoryCursorStore {
    fn get(&self, consumer_id: &str, topic: &str) -> Option<u64> {
        self.consumers
            .get(consumer_id)
            .and_then(|cursors| cursors.get(topic).copied())
    }

    fn set(&self, consumer_id: &str, topic: &str, offset: u64) {
        self.consumers
            .entry(consumer_id.to_string())
            .or_default()
            .insert(topic.to_string(), offset);
    }

    fn remove(&self, consumer_id: &str, topic: &str) -> Option<u64> {
        let removed = self
            .consumers
            .get_mut(consumer_id)
            .and_then(|mut cursors| cursors.remove(topic));

        // drop consumers left without any cursor
        self.consumers
            .remove_if(consumer_id, |_, cursors| cursors.is_empty());
        removed
    }

    fn positions(&self, consumer_id: &str) -> HashMap<String, u64> {
        self.consumers
            .get(consumer_id)
            .map(|cursors| cursors.clone())
            .unwrap_or_default()
    }
}
