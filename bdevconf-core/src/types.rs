//! Backend configuration types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BdevError;

/// Class of block-device backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BdevClass {
    /// No backend configured
    #[default]
    None,
    /// NVMe SSDs addressed by PCI BDF (optionally behind VMD)
    Nvme,
    /// RAM-backed LUNs
    Malloc,
    /// Kernel block devices driven through AIO
    Kdev,
    /// Plain files emulating block devices through AIO
    File,
}

impl BdevClass {
    /// Name used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Nvme => "nvme",
            Self::Malloc => "malloc",
            Self::Kdev => "kdev",
            Self::File => "file",
        }
    }
}

impl fmt::Display for BdevClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BdevClass {
    type Err = BdevError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "none" => Ok(Self::None),
            "nvme" => Ok(Self::Nvme),
            "malloc" => Ok(Self::Malloc),
            "kdev" => Ok(Self::Kdev),
            "file" => Ok(Self::File),
            other => Err(BdevError::UnsupportedClass(other.to_string())),
        }
    }
}

impl TryFrom<String> for BdevClass {
    type Error = BdevError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BdevClass> for String {
    fn from(class: BdevClass) -> Self {
        class.as_str().to_string()
    }
}

/// Declarative description of a single bdev backend.
///
/// `vos_env` and `config_path` are outputs: they are filled in when a
/// [`ClassProvider`](crate::ClassProvider) decides a config file is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend class
    #[serde(rename = "bdev_class")]
    pub class: BdevClass,
    /// PCI addresses (NVMe) or filesystem paths (other classes)
    #[serde(rename = "bdev_list")]
    pub device_list: Vec<String>,
    /// VMD domain addresses and the backing device addresses behind them
    #[serde(rename = "bdev_vmd_list")]
    pub vmd_device_list: Vec<String>,
    /// Number of LUNs (malloc class)
    #[serde(rename = "bdev_number")]
    pub device_count: u32,
    /// Size in GB of each backing file or LUN (file and malloc classes)
    #[serde(rename = "bdev_size")]
    pub file_size: i64,
    /// Host name used to build per-device identifiers
    pub hostname: String,
    /// Environment tag selecting the backend at runtime (output)
    pub vos_env: String,
    /// Path of the generated config file, empty if none (output)
    pub config_path: String,
}

impl BackendConfig {
    /// Create an empty configuration for the given class.
    pub fn new(class: BdevClass) -> Self {
        Self {
            class,
            ..Default::default()
        }
    }

    /// Set the device list.
    pub fn with_devices<I, S>(mut self, devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.device_list = devices.into_iter().map(Into::into).collect();
        self
    }

    /// Set the VMD device list.
    pub fn with_vmd_devices<I, S>(mut self, devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vmd_device_list = devices.into_iter().map(Into::into).collect();
        self
    }

    /// Set the malloc LUN count.
    pub fn with_device_count(mut self, count: u32) -> Self {
        self.device_count = count;
        self
    }

    /// Set the backing file (or LUN) size in GB.
    pub fn with_file_size(mut self, size_gb: i64) -> Self {
        self.file_size = size_gb;
        self
    }

    /// Set the host name.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }
}
