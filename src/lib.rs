pub mod broker;
pub mod client;
pub mod config;
pub mod logging;

pub use broker::cursor::{CursorStore, InMemoryCursorStore};
pub use broker::topic::{Topic, TopicStats};
pub use broker::{Broker, StartPosition};
pub use client::{Consumer, Producer};
pub use config::{BrokerConfig, Config, LoggingConfig, UnsubscribedPolicy};

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// A single record in a topic log. Never mutated after append.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub offset: u64,
    pub payload: Bytes,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(offset: u64, payload: Bytes) -> Self {
        Self {
            offset,
            payload,
            timestamp: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PubSubError {
    #[error("Topic not found: {0}")]
    TopicNotFound(String),
    #[error("Consumer '{consumer}' is not subscribed to topic '{topic}'")]
    NotSubscribed { consumer: String, topic: String },
    #[error("Message of {size} bytes exceeds the {max} byte limit")]
    MessageTooLarge { size: usize, max: usize },
    #[error("Offset {offset} is beyond the end of topic '{topic}' ({size} messages)")]
    OffsetOutOfRange { topic: String, offset: u64, size: u64 },
    #[error(
        "Consumer '{consumer}' cannot move its cursor on '{topic}' back from {current} to {requested}"
    )]
    CursorRewind {
        consumer: String,
        topic: String,
        current: u64,
        requested: u64,
    },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type PubSubResult<T> = Result<T, PubSubError>;
