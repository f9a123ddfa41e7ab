//! Client options.

use std::time::Duration;

use rpq_config::QueueSection;
use serde::{Deserialize, Serialize};

use crate::error::QueueError;
use crate::serializer::SerializerKind;

/// Options fixed at client construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientOptions {
    /// Payload codec.
    #[serde(default)]
    pub serializer: SerializerKind,

    /// Delay between polls of an empty queue, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Subscription channel capacity.
    #[serde(default = "default_subscription_buffer")]
    pub subscription_buffer: usize,
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_subscription_buffer() -> usize {
    16
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            serializer: SerializerKind::default(),
            poll_interval_ms: default_poll_interval_ms(),
            subscription_buffer: default_subscription_buffer(),
        }
    }
}

impl ClientOptions {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn with_serializer(mut self, serializer: SerializerKind) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_subscription_buffer(mut self, buffer: usize) -> Self {
        self.subscription_buffer = buffer;
        self
    }

    /// Reject values the client cannot run with.
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.poll_interval_ms == 0 {
            return Err(QueueError::Config(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.subscription_buffer == 0 {
            return Err(QueueError::Config(
                "subscription_buffer must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl TryFrom<&QueueSection> for ClientOptions {
    type Error = QueueError;

    fn try_from(section: &QueueSection) -> Result<Self, Self::Error> {
        let options = Self {
            serializer: section.serializer.parse()?,
            poll_interval_ms: section.subscription.poll_interval_ms,
            subscription_buffer: section.subscription.buffer,
        };
        options.validate()?;
        Ok(options)
    }
}
