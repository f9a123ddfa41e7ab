//! Polling subscriptions.

use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::Stream;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::QueueClient;
use crate::error::QueueError;
use crate::serializer::Serializer;

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Running poller for one key.
#[derive(Debug)]
pub(crate) struct SubscriptionHandle {
    id: u64,
    token: CancellationToken,
}

/// Active subscriptions of a client, by key.
pub(crate) type Registry = Arc<DashMap<String, SubscriptionHandle>>;

/// Payloads popped from a queue by a background poller.
///
/// Yields `Ok(payload)` in pop order. Errors from individual polls are
/// yielded as `Err` and polling continues. The stream ends after
/// `unsubscribe`. Dropping the subscription stops the poller.
pub struct Subscription<T> {
    key: String,
    id: u64,
    rx: mpsc::Receiver<Result<T, QueueError>>,
    token: CancellationToken,
    registry: Registry,
}

impl<T> Subscription<T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Next payload, or `None` once the poller has stopped.
    pub async fn recv(&mut self) -> Option<Result<T, QueueError>> {
        self.rx.recv().await
    }

    /// True once the poller was asked to stop.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

impl<T> Unpin for Subscription<T> {}

impl<T> Stream for Subscription<T> {
    type Item = Result<T, QueueError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.token.cancel();
        self.registry.remove_if(&self.key, |_, handle| handle.id == self.id);
    }
}

pub(crate) fn start<T, S>(client: QueueClient<T, S>, key: &str) -> Result<Subscription<T>, QueueError>
where
    T: Serialize + DeserializeOwned + Send + 'static,
    S: Serializer + 'static,
{
    let runtime = tokio::runtime::Handle::try_current()
        .map_err(|e| QueueError::Runtime(format!("cannot subscribe to '{}': {}", key, e)))?;

    let id = NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed);
    let token = CancellationToken::new();

    match client.registry().entry(key.to_string()) {
        Entry::Occupied(_) => return Err(QueueError::AlreadySubscribed(key.to_string())),
        Entry::Vacant(slot) => {
            slot.insert(SubscriptionHandle {
                id,
                token: token.clone(),
            });
        }
    }

    let (tx, rx) = mpsc::channel(client.options().subscription_buffer.max(1));
    let registry = client.registry().clone();

    info!("Subscribed to '{}'", key);
    runtime.spawn(poll_loop(client, key.to_string(), id, token.clone(), tx));

    Ok(Subscription {
        key: key.to_string(),
        id,
        rx,
        token,
        registry,
    })
}

pub(crate) fn stop(registry: &Registry, key: &str) -> Result<(), QueueError> {
    let (_, handle) = registry
        .remove(key)
        .ok_or_else(|| QueueError::NotSubscribed(key.to_string()))?;
    handle.token.cancel();
    info!("Unsubscribed from '{}'", key);
    Ok(())
}

async fn poll_loop<T, S>(
    client: QueueClient<T, S>,
    key: String,
    id: u64,
    token: CancellationToken,
    tx: mpsc::Sender<Result<T, QueueError>>,
) where
    T: Serialize + DeserializeOwned + Send + 'static,
    S: Serializer + 'static,
{
    let interval = client.options().poll_interval();

    // An in-flight pop is never abandoned; cancellation is checked between polls.
    while !token.is_cancelled() {
        let (item, idle) = match client.pop_one(&key).await {
            Ok(payload) => (Some(Ok(payload)), false),
            Err(e) if e.is_empty() => (None, true),
            Err(e @ QueueError::Decoding(_)) => (Some(Err(e)), false),
            Err(e) => {
                warn!("Polling '{}' failed: {}", key, e);
                (Some(Err(e)), true)
            }
        };

        if let Some(item) = item {
            let delivered = tokio::select! {
                biased;
                _ = token.cancelled() => false,
                sent = tx.send(item) => sent.is_ok(),
            };
            if !delivered {
                break;
            }
        }

        if idle {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    client.registry().remove_if(&key, |_, handle| handle.id == id);
    debug!("Subscription {} on '{}' stopped", id, key);
}
