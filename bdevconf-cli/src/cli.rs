//! Command-line argument parsing.

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::LogFormat;

/// bdevconf - Block-device backend config generator
#[derive(Parser, Debug)]
#[command(name = "bdevconf")]
#[command(about = "Validate a bdev backend and generate its storage driver config file")]
#[command(version)]
pub struct Args {
    /// Path to configuration file (optional, defaults used if not found)
    #[arg(short, long, env = "BDEVCONF_CONFIG_FILE")]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Directory the driver config file is written to
    #[arg(long)]
    pub config_dir: Option<String>,

    /// Host name used in device identifiers (auto-detected if not set)
    #[arg(long)]
    pub hostname: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Actions on the configured backend.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Validate the backend and report whether a config file is needed
    Validate,

    /// Prepare the host and write the driver config file
    Generate {
        /// Print the resulting backend config (with env tag and path)
        #[arg(long)]
        print_config: bool,

        /// Format used by --print-config
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Print the driver config file to stdout without writing anything
    Render,
}

/// Output format for printed configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}
