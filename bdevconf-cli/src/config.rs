//! Configuration management for the config generator.
//!
//! Settings come from a YAML file, then `BDEVCONF_*` environment variables
//! (nested keys separated by `__`, e.g. `BDEVCONF_BDEV__BDEV_CLASS=file`),
//! then command-line flags.

use anyhow::{Context, Result};
use bdevconf_core::BackendConfig;
use clap::ValueEnum;
use serde::Deserialize;
use std::path::Path;

use crate::cli::Args;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/bdevconf/bdev.yaml";

/// Default directory for the generated driver config file.
pub const DEFAULT_CONFIG_DIR: &str = "/var/run/bdevconf";

/// Environment variable prefix for overrides.
const ENV_PREFIX: &str = "BDEVCONF";

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory the driver config file is written to
    pub config_dir: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log format (json, pretty)
    pub log_format: LogFormat,
    /// Backend description
    pub bdev: BackendConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: DEFAULT_CONFIG_DIR.to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            bdev: BackendConfig::default(),
        }
    }
}

/// Log format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl Config {
    /// Load configuration from a YAML file, applying environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        Self::build(Some(path))
            .with_context(|| format!("Failed to load config file: {}", path.display()))
    }

    /// Build configuration from defaults and environment overrides only.
    pub fn from_env() -> Result<Self> {
        Self::build(None).context("Failed to load config from environment")
    }

    fn build(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).format(config::FileFormat::Yaml));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize::<Config>()?;

        Ok(config)
    }

    /// Apply CLI argument overrides to the configuration.
    pub fn with_cli_overrides(mut self, args: &Args) -> Self {
        if let Some(ref level) = args.log_level {
            self.log_level = level.clone();
        }

        if let Some(format) = args.log_format {
            self.log_format = format;
        }

        if let Some(ref dir) = args.config_dir {
            self.config_dir = dir.clone();
        }

        if let Some(ref hostname) = args.hostname {
            self.bdev.hostname = hostname.clone();
        }

        self
    }

    /// Fill in the host name from the system if none was configured.
    pub fn with_detected_hostname(mut self) -> Self {
        if self.bdev.hostname.is_empty() {
            self.bdev.hostname = hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "unknown".to_string());
        }
        self
    }
}
