//! Error types for bdev config generation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while validating a backend or generating its config.
#[derive(Error, Debug)]
pub enum BdevError {
    /// PCI address is not in `domain:bus:device.function` form.
    #[error("unexpected pci address bdf format: {0:?}")]
    InvalidPciAddress(String),

    /// Emulated device path is relative.
    #[error("please specify absolute path ({})", .0.display())]
    PathNotAbsolute(PathBuf),

    /// Stat on an emulated device path failed for a reason other than absence.
    #[error("failed to stat {}: {source}", path.display())]
    PathStat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backend class string has no registry entry.
    #[error("unable to map {0:?} to BdevClass")]
    UnsupportedClass(String),

    /// Devices were configured but failed validation.
    #[error("invalid NVMe config: {0}")]
    InvalidConfig(String),

    /// Rendering produced no output.
    #[error("spdk: generated NVMe config is unexpectedly empty ({})", .0.display())]
    EmptyOutput(PathBuf),

    /// Filesystem operation failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Template could not be rendered.
    #[error("template error: {0}")]
    Template(String),

    /// Class init routine failed before rendering.
    #[error("bdev device init: {0}")]
    DeviceInit(#[source] Box<BdevError>),
}

impl BdevError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type alias for bdev operations.
pub type Result<T> = std::result::Result<T, BdevError>;
