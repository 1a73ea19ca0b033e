mod settings;

pub use settings::{BrokerConfig, Config, LoggingConfig, UnsubscribedPolicy};
