//! # bdevconf
//!
//! Validates a block-device backend description and generates the config
//! file consumed by the storage poll-mode driver.
//!
//! ## Usage
//! ```bash
//! bdevconf --config /etc/bdevconf/bdev.yaml validate
//! bdevconf --config /etc/bdevconf/bdev.yaml generate --print-config
//! bdevconf --config /etc/bdevconf/bdev.yaml render
//! ```

use anyhow::{Context, Result};
use bdevconf_core::{BackendConfig, ClassProvider};
use clap::Parser;
use tracing::{error, info};

mod cli;
mod config;

use cli::{Args, Command, OutputFormat};
use config::{Config, LogFormat, DEFAULT_CONFIG_PATH};

fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    let config = load_config(&args)?
        .with_cli_overrides(&args)
        .with_detected_hostname();

    // Initialize logging
    match config.log_format {
        LogFormat::Pretty => bdevconf_common::init_logging(&config.log_level)?,
        LogFormat::Json => bdevconf_common::init_logging_json(&config.log_level)?,
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        class = %config.bdev.class,
        config_dir = %config.config_dir,
        "Starting bdevconf"
    );

    if let Err(e) = run(&args.command, config) {
        error!(error = %format!("{:#}", e), "bdevconf failed");
        return Err(e);
    }

    Ok(())
}

/// Load the configuration file, falling back to defaults and environment.
fn load_config(args: &Args) -> Result<Config> {
    match &args.config {
        // Explicit config file provided
        Some(config_path) => Config::load(config_path),
        None => {
            // Try default location, fall back to environment-only config
            if std::path::Path::new(DEFAULT_CONFIG_PATH).exists() {
                Config::load(DEFAULT_CONFIG_PATH)
            } else {
                Config::from_env()
            }
        }
    }
}

fn run(command: &Command, config: Config) -> Result<()> {
    let mut provider = ClassProvider::new(&config.config_dir, config.bdev)
        .context("Invalid bdev configuration")?;

    match command {
        Command::Validate => {
            let summary = serde_json::json!({
                "class": provider.class().to_string(),
                "config_required": provider.needs_config_file(),
                "vos_env": provider.config().vos_env,
                "config_path": provider.config().config_path,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Generate { print_config, format } => {
            provider
                .gen_config_file()
                .context("Failed to generate driver config file")?;

            match provider.config_path() {
                Some(path) => info!(path = %path.display(), "Driver config file written"),
                None => info!("No devices configured, no driver config file written"),
            }

            if *print_config {
                println!("{}", format_backend(provider.config(), *format)?);
            }
        }
        Command::Render => {
            if !provider.needs_config_file() {
                info!("No devices configured, nothing to render");
                return Ok(());
            }
            print!("{}", provider.preview()?);
        }
    }

    Ok(())
}

fn format_backend(cfg: &BackendConfig, format: OutputFormat) -> Result<String> {
    let out = match format {
        OutputFormat::Json => serde_json::to_string_pretty(cfg)?,
        OutputFormat::Yaml => serde_yaml::to_string(cfg)?,
    };
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdevconf_core::BdevClass;

    #[test]
    fn test_format_backend_json() {
        let cfg = BackendConfig::new(BdevClass::Kdev).with_devices(["/dev/sdb"]);
        let out = format_backend(&cfg, OutputFormat::Json).unwrap();

        assert!(out.contains("\"bdev_class\": \"kdev\""));
        assert!(out.contains("\"/dev/sdb\""));
    }

    #[test]
    fn test_format_backend_yaml_round_trips_class() {
        let cfg = BackendConfig::new(BdevClass::Malloc).with_device_count(2);
        let out = format_backend(&cfg, OutputFormat::Yaml).unwrap();
        let parsed: BackendConfig = serde_yaml::from_str(&out).unwrap();

        assert_eq!(parsed, cfg);
    }

    #[test]
    fn test_run_generate_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            config_dir: dir.path().to_string_lossy().to_string(),
            bdev: BackendConfig::new(BdevClass::Kdev)
                .with_devices(["/dev/sdb"])
                .with_hostname("node1"),
            ..Config::default()
        };

        let command = Command::Generate {
            print_config: false,
            format: OutputFormat::Json,
        };
        run(&command, config).unwrap();

        let conf = std::fs::read_to_string(dir.path().join(bdevconf_core::CONFIG_FILE_NAME)).unwrap();
        assert_eq!(conf, "[AIO]\n    AIO /dev/sdb AIO_node1_0\n");
    }

    #[test]
    fn test_run_rejects_invalid_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            config_dir: dir.path().to_string_lossy().to_string(),
            bdev: BackendConfig::new(BdevClass::File).with_devices(["/tmp/aio0"]),
            ..Config::default()
        };

        let err = run(&Command::Validate, config).unwrap_err();
        assert!(format!("{:#}", err).contains("backfile_size should be greater than 0"));
    }
}
