//! Queue subcommand handlers for rpq.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use futures::StreamExt;
use serde_json::Value;
use tracing::{error, info, warn};

use rpq_config::{Config, ConfigValidator};
use rpq_queue::{ClientOptions, LogLevel, QueueClient, RedisStore, TracingLogger};

use crate::cli::Commands;

/// Handle queue subcommands.
pub(crate) async fn handle_command(command: Commands, config: &Config) -> anyhow::Result<()> {
    match command {
        Commands::Push { key, priority, payloads } => {
            let key = key.unwrap_or_else(|| config.queue.default_key.clone());
            push(config, &key, priority, &payloads).await
        }
        Commands::Pop { key, count } => {
            let key = key.unwrap_or_else(|| config.queue.default_key.clone());
            pop(config, &key, count).await
        }
        Commands::Sub { key, limit } => {
            let key = key.unwrap_or_else(|| config.queue.default_key.clone());
            sub(config, &key, limit).await
        }
        Commands::CheckConfig => check_config(config),
    }
}

/// Validate the configuration and fail on the first error.
pub(crate) fn ensure_valid(config: &Config) -> anyhow::Result<()> {
    let result = ConfigValidator::validate(config)?;
    for warning in &result.warnings {
        warn!("{}: {}", warning.path, warning.message);
    }
    if let Some(err) = result.into_error() {
        return Err(err.into());
    }
    Ok(())
}

async fn connect(config: &Config) -> anyhow::Result<QueueClient<Value>> {
    let options = ClientOptions::try_from(&config.queue)?;
    let timeout = Duration::from_secs(config.redis.connect_timeout_secs);
    let store = RedisStore::connect_timeout(&config.redis.url, timeout)
        .await
        .with_context(|| format!("connecting to {}", config.redis.url))?;

    let mut client = QueueClient::from_options(options, Arc::new(store))?;
    if config.logging.observer {
        let level: LogLevel = config.logging.level.parse()?;
        client = client.attach_logger(Arc::new(TracingLogger::new(level)));
    }
    Ok(client)
}

/// Parse a CLI payload, falling back to a JSON string.
fn parse_payload(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

async fn push(config: &Config, key: &str, priority: f64, raw: &[String]) -> anyhow::Result<()> {
    if priority.is_nan() {
        bail!("priority must be a number");
    }
    let payloads: Vec<Value> = raw.iter().map(|p| parse_payload(p)).collect();
    let client = connect(config).await?;

    let scores = match payloads.as_slice() {
        [single] => vec![client.push_one(single, priority, key).await?],
        many => client.batch_push(priority, key, many).await?,
    };

    for (payload, score) in payloads.iter().zip(&scores) {
        println!("{}\t{}", score, payload);
    }
    info!("Pushed {} payload(s) to '{}'", scores.len(), key);
    Ok(())
}

async fn pop(config: &Config, key: &str, count: usize) -> anyhow::Result<()> {
    let client = connect(config).await?;

    let result = if count == 1 {
        client.pop_one(key).await.map(|payload| vec![payload])
    } else {
        client.batch_pop(key, count).await
    };

    match result {
        Ok(payloads) => {
            for payload in payloads {
                println!("{}", payload);
            }
            Ok(())
        }
        Err(e) if e.is_empty() => {
            eprintln!("queue '{}' is empty", key);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn sub(config: &Config, key: &str, limit: Option<usize>) -> anyhow::Result<()> {
    let client = connect(config).await?;
    let mut subscription = client.subscribe(key)?;
    let mut received = 0usize;

    loop {
        if limit.is_some_and(|limit| received >= limit) {
            break;
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, unsubscribing from '{}'", key);
                break;
            }
            item = subscription.next() => match item {
                Some(Ok(payload)) => {
                    received += 1;
                    println!("{}", payload);
                }
                Some(Err(e)) => error!("Subscription error on '{}': {}", key, e),
                None => break,
            }
        }
    }

    client.unsubscribe(key)?;
    Ok(())
}

fn check_config(config: &Config) -> anyhow::Result<()> {
    let result = ConfigValidator::validate(config)?;

    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }

    if !result.is_valid() {
        bail!("configuration has {} error(s)", result.errors.len());
    }
    println!("configuration OK");
    Ok(())
}
