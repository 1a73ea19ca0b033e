use crate::{Broker, PubSubResult};
use bytes::Bytes;
use tracing::{debug, info};

/// Named handle that publishes through a shared broker. Holds no state of
/// its own beyond its identity.
#[derive(Clone)]
pub struct Producer {
    client_id: String,
    broker: Broker,
}

impl Producer {
    pub fn new(client_id: impl Into<String>, broker: Broker) -> Self {
        let client_id = client_id.into();
        debug!("Creating producer with client_id: '{}'", client_id);
        Self { client_id, broker }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn publish(&self, topic: &str, payload: impl Into<Bytes>) -> PubSubResult<u64> {
        let offset = self.broker.publish(topic, payload)?;
        debug!(
            "Producer '{}' published to topic '{}' at offset {}",
            self.client_id, topic, offset
        );
        Ok(offset)
    }

    /// Publishes each payload in order and returns the assigned offsets. Stops
    /// at the first failure; payloads before it stay published.
    pub fn publish_batch<I, P>(&self, topic: &str, payloads: I) -> PubSubResult<Vec<u64>>
    where
        I: IntoIterator<Item = P>,
        P: Into<Bytes>,
    {
        let offsets = payloads
            .into_iter()
            .map(|payload| self.broker.publish(topic, payload))
            .collect::<PubSubResult<Vec<u64>>>()?;

        info!(
            "Producer '{}' published batch of {} messages to topic '{}'",
            self.client_id,
            offsets.len(),
            topic
        );
        Ok(offsets)
    }
}
