//! CLI parse: clap types for ctxtree. No behavior; definitions only.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// ctxtree - cancellation trees with deadlines and scoped values
#[derive(Parser)]
#[command(name = "ctxtree")]
#[command(about = "Run worker scenarios against a cancellation tree")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, default_value = "text")]
    pub format: String,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Overrides for the worker settings in the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct WorkerArgs {
    /// Number of workers sharing the context
    #[arg(long)]
    pub workers: Option<usize>,

    /// Milliseconds between worker ticks
    #[arg(long)]
    pub tick_ms: Option<u64>,

    /// Milliseconds before the explicit cancel
    #[arg(long)]
    pub cancel_after_ms: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cancel a parent while workers observe its child
    Cancel {
        #[command(flatten)]
        workers: WorkerArgs,
    },
    /// Race a timeout against an explicit cancel
    Timeout {
        #[command(flatten)]
        workers: WorkerArgs,

        /// Milliseconds until the deadline fires
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Look up values along a mixed context chain
    Values,
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Cancel { .. } => "cancel",
            Commands::Timeout { .. } => "timeout",
            Commands::Values => "values",
        }
    }
}
