pub mod cursor;
pub mod topic;

use crate::config::{BrokerConfig, UnsubscribedPolicy};
use crate::{Message, PubSubError, PubSubResult};
use bytes::Bytes;
use cursor::{CursorStore, InMemoryCursorStore};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use topic::{Topic, TopicGuard, TopicStats};
use tracing::{debug, info, warn};

/// Where a new subscription starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartPosition {
    /// Only messages published after subscribing.
    #[default]
    Latest,
    /// The whole log from offset 0.
    Earliest,
    /// A specific offset, at most the current topic size.
    Offset(u64),
}

/// Topic registry and dispatcher for publish/subscribe/poll.
///
/// Each topic carries its own lock; the broker itself holds no global lock,
/// so operations on different topics never wait on each other. Cloning is
/// cheap and clones share state.
///
/// Topic logs are never truncated: memory grows with every published message
/// for as long as the broker lives.
#[derive(Clone)]
pub struct Broker {
    config: BrokerConfig,
    topics: Arc<DashMap<String, Arc<Topic>>>,
    cursors: Arc<dyn CursorStore>,
}

impl Broker {
    pub fn new(config: BrokerConfig) -> Self {
        Self::with_cursor_store(config, Arc::new(InMemoryCursorStore::new()))
    }

    pub fn with_cursor_store(config: BrokerConfig, cursors: Arc<dyn CursorStore>) -> Self {
        debug!(
            "Creating broker (max_message_size: {:?}, auto_create_topics: {}, unsubscribed_poll: {:?})",
            config.max_message_size, config.auto_create_topics, config.unsubscribed_poll
        );
        Self {
            config,
            topics: Arc::new(DashMap::new()),
            cursors,
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Creates the topic if it does not exist yet. Existing topics are left
    /// untouched.
    pub fn create_topic(&self, name: &str) {
        self.ensure_topic(name);
    }

    fn ensure_topic(&self, name: &str) -> Arc<Topic> {
        match self.topics.entry(name.to_string()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let topic = Arc::new(Topic::new(name.to_string()));
                entry.insert(Arc::clone(&topic));
                info!("Created topic '{}'", name);
                topic
            }
        }
    }

    fn existing(&self, name: &str) -> Option<Arc<Topic>> {
        self.topics.get(name).map(|entry| Arc::clone(entry.value()))
    }

    fn lookup(&self, name: &str) -> PubSubResult<Arc<Topic>> {
        self.existing(name).ok_or_else(|| {
            warn!("Topic '{}' not found", name);
            PubSubError::TopicNotFound(name.to_string())
        })
    }

    // Auto-creates the topic when the broker is configured to. `precheck`
    // runs before creation, so a call it rejects leaves no new topic behind.
    fn resolve(
        &self,
        name: &str,
        precheck: impl FnOnce() -> PubSubResult<()>,
    ) -> PubSubResult<Arc<Topic>> {
        if !self.config.auto_create_topics {
            return self.lookup(name);
        }
        if let Some(topic) = self.existing(name) {
            return Ok(topic);
        }
        precheck()?;
        Ok(self.ensure_topic(name))
    }

    fn check_size(&self, topic: &str, payload: &Bytes) -> PubSubResult<()> {
        let Some(max) = self.config.max_message_size else {
            return Ok(());
        };
        if payload.len() > max {
            warn!(
                "Rejected {} byte message for topic '{}' (limit {})",
                payload.len(),
                topic,
                max
            );
            return Err(PubSubError::MessageTooLarge {
                size: payload.len(),
                max,
            });
        }
        Ok(())
    }

    pub fn publish(&self, topic: &str, payload: impl Into<Bytes>) -> PubSubResult<u64> {
        let payload = payload.into();
        let topic_ref = self.resolve(topic, || self.check_size(topic, &payload))?;
        self.check_size(topic, &payload)?;
        Ok(topic_ref.append(payload))
    }

    /// Positions the consumer's cursor at the current end of the topic, so it
    /// only sees messages published from now on. Returns the cursor offset.
    pub fn subscribe(&self, topic: &str, consumer_id: &str) -> PubSubResult<u64> {
        self.subscribe_from(topic, consumer_id, StartPosition::Latest)
    }

    /// Like [`Broker::subscribe`] with an explicit start. Cursors never move
    /// backwards: a start below the consumer's existing cursor is rejected.
    pub fn subscribe_from(
        &self,
        topic: &str,
        consumer_id: &str,
        position: StartPosition,
    ) -> PubSubResult<u64> {
        let topic_ref = self.resolve(topic, || match position {
            // a topic created here is empty
            StartPosition::Offset(offset) if offset > 0 => Err(PubSubError::OffsetOutOfRange {
                topic: topic.to_string(),
                offset,
                size: 0,
            }),
            _ => Ok(()),
        })?;
        let log = topic_ref.lock();
        let size = log.size();

        let start = match position {
            StartPosition::Latest => size,
            StartPosition::Earliest => 0,
            StartPosition::Offset(offset) if offset > size => {
                return Err(PubSubError::OffsetOutOfRange {
                    topic: topic.to_string(),
                    offset,
                    size,
                });
            }
            StartPosition::Offset(offset) => offset,
        };

        if let Some(current) = self.cursors.get(consumer_id, topic) {
            if start < current {
                warn!(
                    "Consumer '{}' tried to rewind topic '{}' from {} to {}",
                    consumer_id, topic, current, start
                );
                return Err(PubSubError::CursorRewind {
                    consumer: consumer_id.to_string(),
                    topic: topic.to_string(),
                    current,
                    requested: start,
                });
            }
        }

        self.cursors.set(consumer_id, topic, start);
        info!(
            "Consumer '{}' subscribed to topic '{}' at offset {}",
            consumer_id, topic, start
        );
        Ok(start)
    }

    /// Drops the consumer's cursor. Returns whether one existed.
    pub fn unsubscribe(&self, topic: &str, consumer_id: &str) -> PubSubResult<bool> {
        let topic_ref = self.lookup(topic)?;
        let _log = topic_ref.lock();

        let removed = self.cursors.remove(consumer_id, topic);
        if let Some(offset) = removed {
            info!(
                "Consumer '{}' unsubscribed from topic '{}' at offset {}",
                consumer_id, topic, offset
            );
        }
        Ok(removed.is_some())
    }

    /// Returns the next unseen message for the consumer and advances its
    /// cursor by one, or `None` when it has caught up. Never blocks waiting
    /// for data.
    pub fn poll(&self, topic: &str, consumer_id: &str) -> PubSubResult<Option<Message>> {
        let topic_ref = self.lookup(topic)?;
        let log = topic_ref.lock();
        let cursor = self.cursor(&log, topic, consumer_id)?;

        let Some(message) = log.read(cursor) else {
            return Ok(None);
        };

        self.cursors.set(consumer_id, topic, cursor + 1);
        debug!(
            "Consumer '{}' polled topic '{}' at offset {}",
            consumer_id, topic, cursor
        );
        Ok(Some(message))
    }

    /// Polls up to `max` messages under a single acquisition of the topic
    /// lock. An empty vector means the consumer has caught up.
    pub fn poll_batch(
        &self,
        topic: &str,
        consumer_id: &str,
        max: usize,
    ) -> PubSubResult<Vec<Message>> {
        let topic_ref = self.lookup(topic)?;
        let log = topic_ref.lock();
        let start = self.cursor(&log, topic, consumer_id)?;

        let mut messages = Vec::new();
        let mut next = start;
        while messages.len() < max {
            match log.read(next) {
                Some(message) => {
                    messages.push(message);
                    next += 1;
                }
                None => break,
            }
        }

        if next != start {
            self.cursors.set(consumer_id, topic, next);
            debug!(
                "Consumer '{}' polled {} messages from topic '{}' (offsets {}..{})",
                consumer_id,
                messages.len(),
                topic,
                start,
                next
            );
        }
        Ok(messages)
    }

    // Must be called with the topic lock held.
    fn cursor(&self, log: &TopicGuard<'_>, topic: &str, consumer_id: &str) -> PubSubResult<u64> {
        if let Some(cursor) = self.cursors.get(consumer_id, topic) {
            return Ok(cursor);
        }

        match self.config.unsubscribed_poll {
            UnsubscribedPolicy::Reject => {
                warn!(
                    "Consumer '{}' polled topic '{}' without subscribing",
                    consumer_id, topic
                );
                Err(PubSubError::NotSubscribed {
                    consumer: consumer_id.to_string(),
                    topic: topic.to_string(),
                })
            }
            UnsubscribedPolicy::Earliest => {
                info!(
                    "Consumer '{}' has no cursor on topic '{}', replaying {} messages from offset 0",
                    consumer_id,
                    topic,
                    log.size()
                );
                self.cursors.set(consumer_id, topic, 0);
                Ok(0)
            }
        }
    }

    /// Reads a message by offset without touching any cursor.
    pub fn read(&self, topic: &str, offset: u64) -> PubSubResult<Option<Message>> {
        Ok(self.lookup(topic)?.read(offset))
    }

    /// Offset the next published message will receive.
    pub fn latest_offset(&self, topic: &str) -> PubSubResult<u64> {
        Ok(self.lookup(topic)?.size())
    }

    /// The consumer's next unread offset, if it has a cursor on the topic.
    pub fn position(&self, topic: &str, consumer_id: &str) -> PubSubResult<Option<u64>> {
        let topic_ref = self.lookup(topic)?;
        let _log = topic_ref.lock();
        Ok(self.cursors.get(consumer_id, topic))
    }

    /// Number of messages the consumer has not polled yet.
    pub fn lag(&self, topic: &str, consumer_id: &str) -> PubSubResult<Option<u64>> {
        let topic_ref = self.lookup(topic)?;
        let log = topic_ref.lock();
        Ok(self
            .cursors
            .get(consumer_id, topic)
            .map(|cursor| log.size().saturating_sub(cursor)))
    }

    /// Every cursor the consumer holds, keyed by topic.
    pub fn positions(&self, consumer_id: &str) -> HashMap<String, u64> {
        self.cursors.positions(consumer_id)
    }

    pub fn topic_stats(&self, topic: &str) -> PubSubResult<TopicStats> {
        Ok(self.lookup(topic)?.stats())
    }

    pub fn list_topics(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .topics
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }
}
