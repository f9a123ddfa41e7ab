//! Configuration schema definitions.

use serde::{Deserialize, Serialize};

/// Serializer names accepted in `queue.serializer`.
pub const SERIALIZERS: [&str; 2] = ["json", "protobuf"];

/// Level names accepted in `logging.level`.
pub const LOG_LEVELS: [&str; 4] = ["error", "info", "debug", "trace"];

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub redis: RedisSection,

    #[serde(default)]
    pub queue: QueueSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

/// Redis connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSection {
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for RedisSection {
    fn default() -> Self {
        Self {
            url: default_url(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

/// Queue client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSection {
    #[serde(default = "default_serializer")]
    pub serializer: String,

    #[serde(default = "default_key")]
    pub default_key: String,

    #[serde(default)]
    pub subscription: SubscriptionSection,
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            serializer: default_serializer(),
            default_key: default_key(),
            subscription: SubscriptionSection::default(),
        }
    }
}

fn default_serializer() -> String {
    "json".to_string()
}

fn default_key() -> String {
    "rpq:default".to_string()
}

/// Subscription polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionSection {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_buffer")]
    pub buffer: usize,
}

impl Default for SubscriptionSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            buffer: default_buffer(),
        }
    }
}

fn default_poll_interval() -> u64 {
    100
}

fn default_buffer() -> usize {
    16
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_level")]
    pub level: String,

    /// Attach a tracing-backed observer to queue clients.
    #[serde(default)]
    pub observer: bool,

    /// Directory for daily rolling log files. Console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            observer: false,
            dir: None,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
