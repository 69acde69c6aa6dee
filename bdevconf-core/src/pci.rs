//! PCI address parsing.
//!
//! Addresses use the extended BDF notation `domain:bus:device.function`,
//! e.g. `0000:81:00.0`. Components are kept as strings: VMD backing devices
//! carry a six-digit domain (`850505:00:00.0`) that is compared textually.

use std::fmt;
use std::str::FromStr;

use crate::error::{BdevError, Result};

/// Components of a BDF format PCI address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PciAddress {
    pub domain: String,
    pub bus: String,
    pub device: String,
    pub function: String,
}

impl PciAddress {
    /// Split `addr` into domain, bus, device and function.
    ///
    /// Exactly three `:` separated segments are required, the last of which
    /// must contain exactly one `.`.
    pub fn parse(addr: &str) -> Result<Self> {
        let parts: Vec<&str> = addr.split(':').collect();
        let device_func: Vec<&str> = parts[parts.len() - 1].split('.').collect();

        if parts.len() != 3 || device_func.len() != 2 {
            return Err(BdevError::InvalidPciAddress(addr.to_string()));
        }

        Ok(Self {
            domain: parts[0].to_string(),
            bus: parts[1].to_string(),
            device: device_func[0].to_string(),
            function: device_func[1].to_string(),
        })
    }

    /// Concatenated bus, device and function, each zero-padded to two
    /// characters.
    ///
    /// Backing devices behind a VMD controller report this value as their
    /// PCI domain.
    pub fn vmd_prefix(&self) -> String {
        format!("{:0>2}{:0>2}{:0>2}", self.bus, self.device, self.function)
    }
}

impl FromStr for PciAddress {
    type Err = BdevError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}.{}", self.domain, self.bus, self.device, self.function)
    }
}
