use crate::{PubSubError, PubSubResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub broker: BrokerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Upper bound on payload size. Unlimited when unset.
    pub max_message_size: Option<usize>,
    pub auto_create_topics: bool,
    pub unsubscribed_poll: UnsubscribedPolicy,
}

/// What `poll` does for a consumer that never subscribed to the topic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsubscribedPolicy {
    /// Fail with `NotSubscribed`.
    #[default]
    Reject,
    /// Start a cursor at offset 0 and replay the full log.
    Earliest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            max_message_size: None,
            auto_create_topics: false,
            unsubscribed_poll: UnsubscribedPolicy::Reject,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Reads a JSON config file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> PubSubResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_json(&contents)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn from_json(contents: &str) -> PubSubResult<Self> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PubSubResult<()> {
        if self.broker.max_message_size == Some(0) {
            return Err(PubSubError::Config(
                "broker.max_message_size must be greater than zero".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(PubSubError::Config(
                "logging.level must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
