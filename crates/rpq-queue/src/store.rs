//! Atomic queue stores.
//!
//! A store executes the four queue operations, each as one indivisible step.
//! `RedisStore` runs them as Lua scripts; `MemoryStore` reproduces the same
//! sorted-set semantics in process.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

use crate::error::QueueError;
use crate::script::{QueueScripts, POP_MAX_SCORE, POP_MIN_SCORE};

/// Atomic operations on a sorted-set backed queue.
///
/// Members are compared by bytes: pushing a member that already exists adds
/// the priority to its score instead of creating a second entry. Pops only
/// consider entries scored in `[0, +inf]`.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Add `priority` to the score of `member`. Returns the resulting score.
    async fn push_one(&self, key: &str, priority: f64, member: &[u8]) -> Result<f64, QueueError>;

    /// Apply `push_one` to each member in order, as one atomic call.
    async fn batch_push(
        &self,
        key: &str,
        priority: f64,
        members: &[Vec<u8>],
    ) -> Result<Vec<f64>, QueueError>;

    /// Remove and return the lowest-scored eligible member.
    async fn pop_one(&self, key: &str) -> Result<Option<Vec<u8>>, QueueError>;

    /// Remove and return up to `count` lowest-scored eligible members,
    /// ascending by score, ties by member bytes.
    async fn batch_pop(&self, key: &str, count: usize) -> Result<Vec<Vec<u8>>, QueueError>;
}

/// Redis-backed store.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    scripts: QueueScripts,
}

impl RedisStore {
    /// Wrap an established connection manager.
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            scripts: QueueScripts::new(),
        }
    }

    /// Connect to `url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("Connected to Redis at {}", url);
        Ok(Self::new(conn))
    }

    /// Connect, giving up after `timeout`.
    pub async fn connect_timeout(url: &str, timeout: Duration) -> Result<Self, QueueError> {
        tokio::time::timeout(timeout, Self::connect(url))
            .await
            .map_err(|_| {
                QueueError::Transport(format!("Timed out connecting to {} after {:?}", url, timeout))
            })?
    }
}

#[async_trait]
impl QueueStore for RedisStore {
    async fn push_one(&self, key: &str, priority: f64, member: &[u8]) -> Result<f64, QueueError> {
        let mut conn = self.conn.clone();
        let score: f64 = self
            .scripts
            .push_one
            .key(key)
            .arg(priority)
            .arg(member)
            .invoke_async(&mut conn)
            .await?;
        Ok(score)
    }

    async fn batch_push(
        &self,
        key: &str,
        priority: f64,
        members: &[Vec<u8>],
    ) -> Result<Vec<f64>, QueueError> {
        let mut conn = self.conn.clone();
        let mut invocation = self.scripts.batch_push.prepare_invoke();
        invocation.key(key);
        for member in members {
            invocation.arg(priority).arg(member.as_slice());
        }
        let scores: Vec<f64> = invocation.invoke_async(&mut conn).await?;
        Ok(scores)
    }

    async fn pop_one(&self, key: &str) -> Result<Option<Vec<u8>>, QueueError> {
        let mut conn = self.conn.clone();
        let members: Vec<Vec<u8>> = self
            .scripts
            .pop_one
            .key(key)
            .arg(POP_MIN_SCORE)
            .arg(POP_MAX_SCORE)
            .invoke_async(&mut conn)
            .await?;
        Ok(members.into_iter().next())
    }

    async fn batch_pop(&self, key: &str, count: usize) -> Result<Vec<Vec<u8>>, QueueError> {
        let mut conn = self.conn.clone();
        let members: Vec<Vec<u8>> = self
            .scripts
            .batch_pop
            .key(key)
            .arg(POP_MIN_SCORE)
            .arg(POP_MAX_SCORE)
            .arg(count)
            .invoke_async(&mut conn)
            .await?;
        Ok(members)
    }
}

/// Score with a total order, for use as a set key.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Score(f64);

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// One sorted set: member lookup plus (score, member) order.
#[derive(Debug, Default)]
struct SortedSet {
    scores: HashMap<Vec<u8>, f64>,
    order: BTreeSet<(Score, Vec<u8>)>,
}

impl SortedSet {
    fn incr(&mut self, member: &[u8], by: f64) -> Result<f64, QueueError> {
        if by.is_nan() {
            return Err(QueueError::Transport("ERR value is not a valid float".to_string()));
        }

        let current = self.scores.get(member).copied();
        // Adding 0.0 folds -0.0 into 0.0 so both sort as the same score.
        let score = current.unwrap_or(0.0) + by + 0.0;
        if score.is_nan() {
            return Err(QueueError::Transport(
                "ERR resulting score is not a number (NaN)".to_string(),
            ));
        }

        if let Some(old) = current {
            self.order.remove(&(Score(old), member.to_vec()));
        }
        self.order.insert((Score(score), member.to_vec()));
        self.scores.insert(member.to_vec(), score);
        Ok(score)
    }

    fn pop_lowest(&mut self, limit: usize) -> Vec<Vec<u8>> {
        let picked: Vec<(Score, Vec<u8>)> = self
            .order
            .iter()
            .filter(|(score, _)| score.0 >= 0.0)
            .take(limit)
            .cloned()
            .collect();

        picked
            .into_iter()
            .map(|entry| {
                self.order.remove(&entry);
                self.scores.remove(&entry.1);
                entry.1
            })
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// In-memory store with the same semantics as the Redis scripts.
///
/// Each operation holds one lock for its whole duration, which makes it
/// atomic with respect to every other operation on the store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sets: Mutex<HashMap<String, SortedSet>>,
}

impl MemoryStore {
    /// Create a new memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// All members under `key`, ascending by score, including negative scores.
    pub fn members(&self, key: &str) -> Vec<Vec<u8>> {
        let sets = self.sets.lock();
        sets.get(key)
            .map(|set| set.order.iter().map(|(_, member)| member.clone()).collect())
            .unwrap_or_default()
    }

    /// Score of `member` under `key`.
    pub fn score(&self, key: &str, member: &[u8]) -> Option<f64> {
        let sets = self.sets.lock();
        sets.get(key).and_then(|set| set.scores.get(member).copied())
    }

    /// Number of entries under `key`.
    pub fn len(&self, key: &str) -> usize {
        let sets = self.sets.lock();
        sets.get(key).map_or(0, |set| set.scores.len())
    }

    /// Keys holding at least one entry.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sets.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    async fn push_one(&self, key: &str, priority: f64, member: &[u8]) -> Result<f64, QueueError> {
        let mut sets = self.sets.lock();
        let set = sets.entry(key.to_string()).or_default();
        let result = set.incr(member, priority);
        if set.is_empty() {
            sets.remove(key);
        }
        result
    }

    async fn batch_push(
        &self,
        key: &str,
        priority: f64,
        members: &[Vec<u8>],
    ) -> Result<Vec<f64>, QueueError> {
        let mut sets = self.sets.lock();
        let set = sets.entry(key.to_string()).or_default();

        // Like a Redis script, writes made before a failing step are kept.
        let mut scores = Vec::with_capacity(members.len());
        let mut failure = None;
        for member in members {
            match set.incr(member, priority) {
                Ok(score) => scores.push(score),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if set.is_empty() {
            sets.remove(key);
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(scores),
        }
    }

    async fn pop_one(&self, key: &str) -> Result<Option<Vec<u8>>, QueueError> {
        Ok(self.batch_pop(key, 1).await?.into_iter().next())
    }

    async fn batch_pop(&self, key: &str, count: usize) -> Result<Vec<Vec<u8>>, QueueError> {
        let mut sets = self.sets.lock();
        let Some(set) = sets.get_mut(key) else {
            return Ok(Vec::new());
        };

        let members = set.pop_lowest(count);
        if set.is_empty() {
            sets.remove(key);
        }

        debug!("Popped {} member(s) from '{}'", members.len(), key);
        Ok(members)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
