//! Typed queue client.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ClientOptions;
use crate::error::QueueError;
use crate::logger::{LogLevel, QueueLogger};
use crate::serializer::{Codec, Serializer, SerializerKind};
use crate::store::{QueueStore, RedisStore};
use crate::subscription::{self, Registry, Subscription};

/// Priority queue client for payloads of type `T`.
///
/// Lower priority values are popped first and only entries with a priority
/// of zero or more are ever popped. Payloads are stored by their encoded
/// bytes, so pushing an equal payload again adds to its priority instead of
/// enqueueing a second copy.
///
/// Clones share the store, the serializer and the subscription registry.
pub struct QueueClient<T, S = Codec> {
    serializer: Arc<S>,
    store: Arc<dyn QueueStore>,
    logger: Option<Arc<dyn QueueLogger>>,
    options: ClientOptions,
    subscriptions: Registry,
    _payload: PhantomData<fn() -> T>,
}

impl<T, S> Clone for QueueClient<T, S> {
    fn clone(&self) -> Self {
        Self {
            serializer: self.serializer.clone(),
            store: self.store.clone(),
            logger: self.logger.clone(),
            options: self.options.clone(),
            subscriptions: self.subscriptions.clone(),
            _payload: PhantomData,
        }
    }
}

impl<T, S> fmt::Debug for QueueClient<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueClient")
            .field("options", &self.options)
            .field("logger", &self.logger.is_some())
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl<T> QueueClient<T, Codec> {
    /// Create a client using one of the built-in serializers.
    pub fn new(kind: SerializerKind, store: Arc<dyn QueueStore>) -> Self {
        let options = ClientOptions::default().with_serializer(kind);
        Self::build(kind.build(), store, None, options)
    }

    /// Create a client that reports store responses to `logger`.
    pub fn with_logger(
        kind: SerializerKind,
        store: Arc<dyn QueueStore>,
        logger: Arc<dyn QueueLogger>,
    ) -> Self {
        Self::new(kind, store).attach_logger(logger)
    }

    /// Create a client from validated options.
    pub fn from_options(options: ClientOptions, store: Arc<dyn QueueStore>) -> Result<Self, QueueError> {
        options.validate()?;
        Ok(Self::build(options.serializer.build(), store, None, options))
    }

    /// Connect to Redis at `url` and create a client over it.
    pub async fn connect(url: &str, kind: SerializerKind) -> Result<Self, QueueError> {
        let store = RedisStore::connect(url).await?;
        Ok(Self::new(kind, Arc::new(store)))
    }
}

impl<T, S: Serializer> QueueClient<T, S> {
    /// Create a client with a custom serializer.
    pub fn with_serializer(serializer: S, store: Arc<dyn QueueStore>) -> Self {
        Self::build(serializer, store, None, ClientOptions::default())
    }

    fn build(
        serializer: S,
        store: Arc<dyn QueueStore>,
        logger: Option<Arc<dyn QueueLogger>>,
        options: ClientOptions,
    ) -> Self {
        Self {
            serializer: Arc::new(serializer),
            store,
            logger,
            options,
            subscriptions: Arc::new(DashMap::new()),
            _payload: PhantomData,
        }
    }

    /// Attach an observer logger.
    pub fn attach_logger(mut self, logger: Arc<dyn QueueLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn serializer(&self) -> &S {
        &self.serializer
    }

    pub fn store(&self) -> &Arc<dyn QueueStore> {
        &self.store
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.subscriptions
    }

    fn observe(&self, level: LogLevel, message: impl FnOnce() -> String) {
        if let Some(logger) = &self.logger {
            if logger.enabled(level) {
                logger.log(level, &message());
            }
        }
    }

    /// Report a store response at the observer's own level.
    fn observe_result(&self, message: impl FnOnce() -> String) {
        if let Some(logger) = &self.logger {
            logger.log(logger.level(), &message());
        }
    }

    fn observe_failure(&self, op: &str, key: &str, err: &QueueError) {
        self.observe(LogLevel::Error, || format!("{} on '{}' failed: {}", op, key, err));
    }
}

impl<T, S> QueueClient<T, S>
where
    T: Serialize + DeserializeOwned,
    S: Serializer,
{
    /// Push one payload. Returns the entry's resulting priority.
    pub async fn push_one(&self, payload: &T, priority: f64, key: &str) -> Result<f64, QueueError> {
        let member = self.serializer.serialize(payload)?;

        let score = self
            .store
            .push_one(key, priority, &member)
            .await
            .inspect_err(|e| self.observe_failure("PushOne", key, e))?;

        debug!("Pushed to '{}' (priority: {}, score: {})", key, priority, score);
        self.observe_result(|| format!("PushOne result: {}", score));
        Ok(score)
    }

    /// Push several payloads with the same priority in one atomic call.
    ///
    /// Every payload is encoded before anything is sent; the first encoding
    /// failure aborts the whole batch. Returns resulting priorities in input
    /// order.
    pub async fn batch_push(&self, priority: f64, key: &str, payloads: &[T]) -> Result<Vec<f64>, QueueError> {
        let members = payloads
            .iter()
            .map(|payload| self.serializer.serialize(payload))
            .collect::<Result<Vec<_>, _>>()?;

        if members.is_empty() {
            return Ok(Vec::new());
        }

        let scores = self
            .store
            .batch_push(key, priority, &members)
            .await
            .inspect_err(|e| self.observe_failure("BatchPush", key, e))?;

        debug!("Pushed {} payload(s) to '{}' (priority: {})", scores.len(), key, priority);
        self.observe_result(|| format!("BatchPush result: {:?}", scores));
        Ok(scores)
    }

    /// Pop the lowest-priority payload.
    ///
    /// Returns [`QueueError::EmptyQueue`] when nothing is eligible.
    pub async fn pop_one(&self, key: &str) -> Result<T, QueueError> {
        let member = self
            .store
            .pop_one(key)
            .await
            .inspect_err(|e| self.observe_failure("PopOne", key, e))?
            .ok_or_else(|| QueueError::EmptyQueue(key.to_string()))?;

        self.observe_result(|| {
            format!("PopOne result: {}", String::from_utf8_lossy(&member))
        });

        self.serializer
            .deserialize(&member)
            .inspect_err(|e| self.observe_failure("PopOne", key, e))
    }

    /// Pop into `out`. On failure `out` keeps its previous value.
    pub async fn pop_one_into(&self, key: &str, out: &mut T) -> Result<(), QueueError> {
        *out = self.pop_one(key).await?;
        Ok(())
    }

    /// Pop up to `count` payloads, lowest priority first.
    ///
    /// Fewer than `count` eligible entries is not an error; none at all is
    /// [`QueueError::EmptyQueue`]. A `count` of zero always selects nothing.
    ///
    /// The store removes every selected entry before the payloads are
    /// decoded. If one fails to decode, the call returns
    /// [`QueueError::Decoding`] and that entry and all entries after it are
    /// lost. Use [`batch_pop_into`](Self::batch_pop_into) to keep the
    /// payloads decoded before the failure.
    pub async fn batch_pop(&self, key: &str, count: usize) -> Result<Vec<T>, QueueError> {
        let mut out = Vec::with_capacity(count);
        self.batch_pop_into(key, count, &mut out).await?;
        Ok(out)
    }

    /// Pop up to `count` payloads, appending them to `out` in order.
    ///
    /// Decoding stops at the first failure. Payloads decoded before it stay
    /// in `out`. Returns the number appended.
    pub async fn batch_pop_into(&self, key: &str, count: usize, out: &mut Vec<T>) -> Result<usize, QueueError> {
        let members = self
            .store
            .batch_pop(key, count)
            .await
            .inspect_err(|e| self.observe_failure("BatchPop", key, e))?;

        if members.is_empty() {
            return Err(QueueError::EmptyQueue(key.to_string()));
        }

        self.observe_result(|| {
            let shown: Vec<_> = members.iter().map(|m| String::from_utf8_lossy(m)).collect();
            format!("BatchPop results: {:?}", shown)
        });

        let total = members.len();
        for (index, member) in members.iter().enumerate() {
            match self.serializer.deserialize(member) {
                Ok(payload) => out.push(payload),
                Err(e) => {
                    warn!(
                        "Decoding failed for entry {} of {} popped from '{}'; {} removed entries dropped",
                        index + 1,
                        total,
                        key,
                        total - index
                    );
                    self.observe_failure("BatchPop", key, &e);
                    return Err(e);
                }
            }
        }

        debug!("Popped {} payload(s) from '{}'", total, key);
        Ok(total)
    }
}

impl<T, S> QueueClient<T, S>
where
    T: Serialize + DeserializeOwned + Send + 'static,
    S: Serializer + 'static,
{
    /// Stream payloads from `key` as they become available.
    ///
    /// A background task pops the lowest-priority payload, waits for room in
    /// the subscription buffer, and polls again; an empty queue is re-polled
    /// after the configured interval. Delivery is at most once: a payload
    /// popped while the subscription is being dropped is lost.
    pub fn subscribe(&self, key: &str) -> Result<Subscription<T>, QueueError> {
        subscription::start(self.clone(), key)
    }

    /// Stop the subscription on `key` started by this client or a clone.
    pub fn unsubscribe(&self, key: &str) -> Result<(), QueueError> {
        subscription::stop(&self.subscriptions, key)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
