//! ctxtree CLI Binary
//!
//! Runs worker scenarios against the cancellation tree.

use anyhow::Context as _;
use clap::Parser;
use ctxtree::cli::{Cli, RunContext};
use ctxtree::config::ConfigLoader;
use ctxtree::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    let logging_config = build_logging_config(&cli);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("ctxtree starting");

    match run(&cli) {
        Ok(output) => {
            info!("Command completed successfully");
            println!("{}", output);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<String> {
    let context = RunContext::new(cli.config.clone(), cli.format.clone())
        .map_err(|e| anyhow::anyhow!(ctxtree::cli::map_error(&e)))
        .context("loading configuration")?;
    context
        .execute(&cli.command)
        .map_err(|e| anyhow::anyhow!(ctxtree::cli::map_error(&e)))
        .with_context(|| format!("running {} scenario", cli.command.name()))
}

/// Build logging configuration from CLI args and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = match cli.config {
        Some(ref path) => ConfigLoader::load_from_file(path)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default(),
        None => ConfigLoader::load()
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default(),
    };

    if cli.quiet {
        config.enabled = false;
    }
    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if cli.log_file.is_some() {
        config.file = cli.log_file.clone();
    }

    config
}
