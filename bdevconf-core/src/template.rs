//! Driver config templates.
//!
//! The generated file is parsed by the storage driver, so each format is
//! reproduced exactly, including indentation and trailing newlines.
//!
//! ```text
//! [Nvme]
//!     TransportID "trtype:PCIe traddr:0000:81:00.0" Nvme_node1_0
//!     RetryCount 4
//!     ...
//! ```

use std::fmt::{self, Write};

use crate::error::{BdevError, Result};
use crate::types::BackendConfig;

/// Stanza prepended when VMD devices are configured.
pub const VMD_STANZA: &str = "[VMD]\n    Enable True\n\n";

/// Block size advertised for file-backed AIO devices.
const AIO_FILE_BLOCK_SIZE: u32 = 4096;

/// Config file formats understood by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// NVMe transport list
    Nvme,
    /// AIO over plain files, with explicit block size
    FileAio,
    /// AIO over kernel block devices
    KdevAio,
    /// Malloc LUN block
    Malloc,
}

impl Template {
    /// Write this template's section for `cfg` into `out`.
    pub fn render_into<W: Write>(&self, cfg: &BackendConfig, out: &mut W) -> fmt::Result {
        let host = &cfg.hostname;

        match self {
            Self::Nvme => {
                writeln!(out, "[Nvme]")?;
                for (i, dev) in cfg.device_list.iter().enumerate() {
                    writeln!(out, "    TransportID \"trtype:PCIe traddr:{}\" Nvme_{}_{}", dev, host, i)?;
                }
                writeln!(out, "    RetryCount 4")?;
                writeln!(out, "    TimeoutUsec 0")?;
                writeln!(out, "    ActionOnTimeout None")?;
                writeln!(out, "    AdminPollRate 100000")?;
                writeln!(out, "    HotplugEnable No")?;
                writeln!(out, "    HotplugPollRate 0")
            }
            Self::FileAio => {
                writeln!(out, "[AIO]")?;
                for (i, dev) in cfg.device_list.iter().enumerate() {
                    writeln!(out, "    AIO {} AIO_{}_{} {}", dev, host, i, AIO_FILE_BLOCK_SIZE)?;
                }
                Ok(())
            }
            Self::KdevAio => {
                writeln!(out, "[AIO]")?;
                for (i, dev) in cfg.device_list.iter().enumerate() {
                    writeln!(out, "    AIO {} AIO_{}_{}", dev, host, i)?;
                }
                Ok(())
            }
            Self::Malloc => {
                writeln!(out, "[Malloc]")?;
                writeln!(out, "    NumberOfLuns {}", cfg.device_count)?;
                // LUN size is given in MB; the configured size is in GB
                writeln!(out, "    LunSizeInMB {}000", cfg.file_size)
            }
        }
    }
}

/// Render the full config file for `cfg` using `template`.
///
/// The VMD stanza is prepended once when `cfg.vmd_device_list` is non-empty.
pub fn render_config(cfg: &BackendConfig, template: Template) -> Result<String> {
    let mut out = String::new();

    if !cfg.vmd_device_list.is_empty() {
        out.push_str(VMD_STANZA);
    }

    template
        .render_into(cfg, &mut out)
        .map_err(|e| BdevError::Template(format!("failed to render {:?} template: {}", template, e)))?;

    Ok(out)
}
