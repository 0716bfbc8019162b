//! CLI route: run context and dispatch from commands to scenarios.

use crate::cli::parse::{Commands, WorkerArgs};
use crate::cli::presentation::{
    format_cancel_report, format_timeout_report, format_values_report,
};
use crate::config::{ConfigLoader, CtxTreeConfig, DemoConfig};
use crate::demo;
use crate::error::CtxTreeError;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Runtime context for CLI execution: the loaded configuration and output format.
pub struct RunContext {
    config: CtxTreeConfig,
    format: String,
}

impl RunContext {
    /// Load configuration from `config_path`, or from the user config and environment.
    pub fn new(config_path: Option<PathBuf>, format: String) -> Result<Self, CtxTreeError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load()?,
        };
        Self::from_config(config, format)
    }

    pub fn from_config(config: CtxTreeConfig, format: String) -> Result<Self, CtxTreeError> {
        if format != "text" && format != "json" {
            return Err(CtxTreeError::Config(format!(
                "Invalid output format: {} (must be 'text' or 'json')",
                format
            )));
        }
        Ok(Self { config, format })
    }

    pub fn config(&self) -> &CtxTreeConfig {
        &self.config
    }

    pub fn execute(&self, command: &Commands) -> Result<String, CtxTreeError> {
        let started = Instant::now();
        let output = match command {
            Commands::Cancel { workers } => {
                let demo_config = self.demo_config(workers, None)?;
                let report = demo::run_cancel_scenario(&demo_config);
                format_cancel_report(&report, &self.format)
            }
            Commands::Timeout {
                workers,
                timeout_ms,
            } => {
                let demo_config = self.demo_config(workers, *timeout_ms)?;
                let report = demo::run_timeout_scenario(&demo_config);
                format_timeout_report(&report, &self.format)
            }
            Commands::Values => format_values_report(&demo::run_values_scenario(), &self.format),
        }?;
        info!(
            command = command.name(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Scenario finished"
        );
        Ok(output)
    }

    /// Fold command-line overrides into the configured worker settings.
    fn demo_config(
        &self,
        args: &WorkerArgs,
        timeout_ms: Option<u64>,
    ) -> Result<DemoConfig, CtxTreeError> {
        let mut demo = self.config.demo.clone();
        if let Some(workers) = args.workers {
            demo.workers = workers;
        }
        if let Some(tick_ms) = args.tick_ms {
            demo.tick_ms = tick_ms;
        }
        if let Some(cancel_after_ms) = args.cancel_after_ms {
            demo.cancel_after_ms = cancel_after_ms;
        }
        if let Some(timeout_ms) = timeout_ms {
            demo.timeout_ms = timeout_ms;
        }
        demo.validate().map_err(CtxTreeError::Config)?;
        Ok(demo)
    }
}
