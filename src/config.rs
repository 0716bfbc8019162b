//! Configuration System
//!
//! Layered configuration for the demonstration binary: built-in defaults,
//! then an optional TOML file, then `CTXTREE__`-prefixed environment
//! variables (e.g. `CTXTREE__DEMO__WORKERS=4`).

use crate::error::CtxTreeError;
use crate::logging::LoggingConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CtxTreeConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Worker scenario settings
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Settings for the worker scenarios run by the `ctxtree` binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Workers sharing one context
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Interval between worker ticks
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Delay before the scenario cancels explicitly
    #[serde(default = "default_cancel_after_ms")]
    pub cancel_after_ms: u64,

    /// Timeout used by the timeout scenario
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_workers() -> usize {
    2
}

fn default_tick_ms() -> u64 {
    100
}

fn default_cancel_after_ms() -> u64 {
    500
}

fn default_timeout_ms() -> u64 {
    300
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            tick_ms: default_tick_ms(),
            cancel_after_ms: default_cancel_after_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl DemoConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("workers must be at least 1".to_string());
        }
        if self.tick_ms == 0 {
            return Err("tick_ms must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn cancel_after(&self) -> Duration {
        Duration::from_millis(self.cancel_after_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl CtxTreeConfig {
    pub fn validate(&self) -> Result<(), CtxTreeError> {
        self.demo
            .validate()
            .map_err(|e| CtxTreeError::Config(format!("demo: {}", e)))
    }
}

/// Loads [`CtxTreeConfig`] from defaults, files and environment.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load using the user config file (if present) and the environment.
    pub fn load() -> Result<CtxTreeConfig, CtxTreeError> {
        let mut builder = builder_with_defaults()?;
        if let Some(path) = user_config_path() {
            if path.exists() {
                debug!(config_path = %path.display(), "Loading user config");
                builder = builder.add_source(File::from(path).required(false));
            } else {
                debug!(config_path = %path.display(), "No user config file");
            }
        }
        Self::finish(builder)
    }

    /// Load from an explicit file, which must exist, plus the environment.
    pub fn load_from_file(path: &Path) -> Result<CtxTreeConfig, CtxTreeError> {
        if !path.exists() {
            warn!(config_path = %path.display(), "Config file not found");
            return Err(CtxTreeError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = builder_with_defaults()?.add_source(File::from(path.to_path_buf()));
        Self::finish(builder)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<CtxTreeConfig, CtxTreeError> {
        let config: CtxTreeConfig = builder
            .add_source(
                Environment::with_prefix("CTXTREE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, CtxTreeError> {
    let defaults = DemoConfig::default();
    Ok(Config::builder()
        .set_default("demo.workers", defaults.workers as u64)?
        .set_default("demo.tick_ms", defaults.tick_ms)?
        .set_default("demo.cancel_after_ms", defaults.cancel_after_ms)?
        .set_default("demo.timeout_ms", defaults.timeout_ms)?)
}

/// `config.toml` in the platform config dir for ctxtree
/// (`$XDG_CONFIG_HOME/ctxtree` on Linux).
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "ctxtree")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
