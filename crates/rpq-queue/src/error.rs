//! Queue errors.

use thiserror::Error;

/// Queue error types.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Payload could not be serialized. No store call was made.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Bytes returned by the store do not match the payload type.
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// The store call itself failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// No entry with a score in `[0, +inf]` under the key.
    #[error("Queue is empty: {0}")]
    EmptyQueue(String),

    /// Declared capability without an implementation.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Serializer name outside the supported set.
    #[error("Unknown serializer: {0}")]
    UnknownSerializer(String),

    /// A subscription for the key is already running on this client.
    #[error("Already subscribed: {0}")]
    AlreadySubscribed(String),

    /// No subscription for the key on this client.
    #[error("Not subscribed: {0}")]
    NotSubscribed(String),

    /// No async runtime to run background work on.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Invalid client options.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl QueueError {
    /// True for the distinguished "nothing to pop" condition.
    pub fn is_empty(&self) -> bool {
        matches!(self, QueueError::EmptyQueue(_))
    }
}

impl From<redis::RedisError> for QueueError {
    fn from(err: redis::RedisError) -> Self {
        QueueError::Transport(err.to_string())
    }
}
