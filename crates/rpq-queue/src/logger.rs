//! Leveled observer logger.
//!
//! The client reports raw store responses to an attached observer after each
//! store call. Observers never influence control flow or return values.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::QueueError;

/// Log levels, ordered by verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error = 0,
    #[default]
    Info = 1,
    Debug = 2,
    Trace = 3,
}

impl LogLevel {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Error,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(QueueError::Config(format!("unknown log level '{}'", other))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observer interface for queue operations.
pub trait QueueLogger: Send + Sync {
    /// Record a message. Called only when `enabled(level)` holds.
    fn log(&self, level: LogLevel, message: &str);

    /// Current threshold.
    fn level(&self) -> LogLevel;

    /// Change the threshold.
    fn set_level(&self, level: LogLevel);

    fn enabled(&self, level: LogLevel) -> bool {
        level <= self.level()
    }

    fn error(&self, message: &str) {
        if self.enabled(LogLevel::Error) {
            self.log(LogLevel::Error, message);
        }
    }

    fn info(&self, message: &str) {
        if self.enabled(LogLevel::Info) {
            self.log(LogLevel::Info, message);
        }
    }

    fn debug(&self, message: &str) {
        if self.enabled(LogLevel::Debug) {
            self.log(LogLevel::Debug, message);
        }
    }

    fn trace(&self, message: &str) {
        if self.enabled(LogLevel::Trace) {
            self.log(LogLevel::Trace, message);
        }
    }
}

/// Observer that forwards to `tracing`.
#[derive(Debug)]
pub struct TracingLogger {
    level: AtomicU8,
}

impl TracingLogger {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level: AtomicU8::new(level as u8),
        }
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new(LogLevel::default())
    }
}

impl QueueLogger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Error => tracing::error!(target: "rpq::observer", "{}", message),
            LogLevel::Info => tracing::info!(target: "rpq::observer", "{}", message),
            LogLevel::Debug => tracing::debug!(target: "rpq::observer", "{}", message),
            LogLevel::Trace => tracing::trace!(target: "rpq::observer", "{}", message),
        }
    }

    fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::Relaxed))
    }

    fn set_level(&self, level: LogLevel) {
        self.level.store(level as u8, Ordering::Relaxed);
    }
}

/// Observer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl QueueLogger for NoopLogger {
    fn log(&self, _level: LogLevel, _message: &str) {}

    fn level(&self) -> LogLevel {
        LogLevel::Error
    }

    fn set_level(&self, _level: LogLevel) {}

    fn enabled(&self, _level: LogLevel) -> bool {
        false
    }
}
