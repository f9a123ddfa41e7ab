//! # rpq Queue
//!
//! Typed priority queues stored in Redis sorted sets.
//!
//! ## Features
//!
//! - Push/pop through atomic Lua scripts
//! - Pluggable payload serializers (JSON built in)
//! - Optional leveled observer logger
//! - Polling subscriptions with back-pressure
//! - In-memory store with the same semantics for tests

pub mod client;
pub mod config;
pub mod error;
pub mod logger;
pub mod script;
pub mod serializer;
pub mod store;
pub mod subscription;

pub use client::QueueClient;
pub use config::ClientOptions;
pub use error::QueueError;
pub use logger::{LogLevel, NoopLogger, QueueLogger, TracingLogger};
pub use serializer::{Codec, JsonSerializer, ProtobufSerializer, Serializer, SerializerKind};
pub use store::{MemoryStore, QueueStore, RedisStore};
pub use subscription::Subscription;
