//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::{Config, LOG_LEVELS, SERIALIZERS};

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// First error as a `ConfigError`, if any.
    pub fn into_error(self) -> Option<ConfigError> {
        self.errors.into_iter().next().map(|e| ConfigError::InvalidValue {
            field: e.path,
            message: e.message,
        })
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_redis(config, &mut result);
        Self::validate_queue(config, &mut result);
        Self::validate_logging(config, &mut result);

        Ok(result)
    }

    fn validate_redis(config: &Config, result: &mut ValidationResult) {
        let url = &config.redis.url;
        if url.is_empty() {
            result.add_error(ValidationError::new("redis.url", "Redis URL cannot be empty"));
        } else if !["redis://", "rediss://", "redis+unix://", "unix://"]
            .iter()
            .any(|scheme| url.starts_with(scheme))
        {
            result.add_error(ValidationError::new(
                "redis.url",
                "Redis URL must start with redis://, rediss://, redis+unix:// or unix://",
            ));
        }

        if config.redis.connect_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "redis.connect_timeout_secs",
                "connect_timeout_secs must be greater than 0",
            ));
        }
    }

    fn validate_queue(config: &Config, result: &mut ValidationResult) {
        let serializer = config.queue.serializer.to_ascii_lowercase();
        if !SERIALIZERS.contains(&serializer.as_str()) {
            result.add_error(ValidationError::new(
                "queue.serializer",
                format!(
                    "Unknown serializer '{}', valid values: {:?}",
                    config.queue.serializer, SERIALIZERS
                ),
            ));
        } else if serializer == "protobuf" {
            result.add_warning(ValidationWarning::new(
                "queue.serializer",
                "protobuf serializer is not implemented, every push and pop will fail",
            ));
        }

        if config.queue.default_key.is_empty() {
            result.add_error(ValidationError::new(
                "queue.default_key",
                "Default key cannot be empty",
            ));
        }

        let subscription = &config.queue.subscription;
        if subscription.poll_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "queue.subscription.poll_interval_ms",
                "poll_interval_ms must be greater than 0",
            ));
        } else if subscription.poll_interval_ms < 10 {
            result.add_warning(ValidationWarning::new(
                "queue.subscription.poll_interval_ms",
                "poll_interval_ms is very low (<10), idle subscriptions will load Redis",
            ));
        }

        if subscription.buffer == 0 {
            result.add_error(ValidationError::new(
                "queue.subscription.buffer",
                "buffer must be greater than 0",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let level = config.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            result.add_error(ValidationError::new(
                "logging.level",
                format!(
                    "Unknown log level '{}', valid values: {:?}",
                    config.logging.level, LOG_LEVELS
                ),
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
