use crate::broker::StartPosition;
use crate::{Broker, Message, PubSubResult};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Named reader over a shared broker.
///
/// Progress is tracked per consumer id and topic, so two `Consumer` values
/// with the same id share a cursor while different ids never interfere.
#[derive(Clone)]
pub struct Consumer {
    client_id: String,
    broker: Broker,
}

impl Consumer {
    pub fn new(client_id: impl Into<String>, broker: Broker) -> Self {
        let client_id = client_id.into();
        debug!("Creating consumer with client_id: '{}'", client_id);
        Self { client_id, broker }
    }

    pub fn with_random_id(broker: Broker) -> Self {
        Self::new(format!("consumer-{}", Uuid::new_v4()), broker)
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn subscribe(&self, topic: &str) -> PubSubResult<u64> {
        self.broker.subscribe(topic, &self.client_id)
    }

    pub fn subscribe_from(&self, topic: &str, position: StartPosition) -> PubSubResult<u64> {
        self.broker.subscribe_from(topic, &self.client_id, position)
    }

    pub fn unsubscribe(&self, topic: &str) -> PubSubResult<bool> {
        self.broker.unsubscribe(topic, &self.client_id)
    }

    pub fn poll(&self, topic: &str) -> PubSubResult<Option<Message>> {
        self.broker.poll(topic, &self.client_id)
    }

    pub fn poll_batch(&self, topic: &str, max: usize) -> PubSubResult<Vec<Message>> {
        self.broker.poll_batch(topic, &self.client_id, max)
    }

    pub fn position(&self, topic: &str) -> PubSubResult<Option<u64>> {
        self.broker.position(topic, &self.client_id)
    }

    pub fn lag(&self, topic: &str) -> PubSubResult<Option<u64>> {
        self.broker.lag(topic, &self.client_id)
    }

    /// Next unread offset for every topic this consumer is subscribed to.
    pub fn positions(&self) -> HashMap<String, u64> {
        self.broker.positions(&self.client_id)
    }
}
