//! CLI definitions for rpq.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// rpq CLI.
#[derive(Parser)]
#[command(name = "rpq")]
#[command(about = "Typed priority queues over Redis sorted sets")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/rpq.toml", global = true)]
    pub config: PathBuf,

    /// Redis URL, overrides `redis.url`
    #[arg(long, env = "RPQ_REDIS_URL", global = true)]
    pub redis_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Push one or more JSON payloads
    Push {
        /// Queue key (default: `queue.default_key`)
        #[arg(short, long)]
        key: Option<String>,

        /// Priority; lower pops first, negative is never popped
        #[arg(short, long, default_value_t = 0.0, allow_negative_numbers = true)]
        priority: f64,

        /// Payloads; text that is not valid JSON is pushed as a JSON string
        #[arg(required = true)]
        payloads: Vec<String>,
    },

    /// Pop payloads, lowest priority first
    Pop {
        /// Queue key (default: `queue.default_key`)
        #[arg(short, long)]
        key: Option<String>,

        /// Maximum number of payloads to pop
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },

    /// Stream payloads as they arrive until Ctrl-C
    Sub {
        /// Queue key (default: `queue.default_key`)
        #[arg(short, long)]
        key: Option<String>,

        /// Stop after this many payloads
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Validate the configuration file
    CheckConfig,
}
