//! Per-class behaviour registry.
//!
//! Every [`BdevClass`] maps to a fixed [`ClassDescriptor`]: the template to
//! render, the runtime environment tag, how to tell whether any devices are
//! configured, how to validate them, and what must happen on the host before
//! the config file is written.
//!
//! | Class  | Template | Env tag        | Emptiness   | Validity          | Init             |
//! |--------|----------|----------------|-------------|-------------------|------------------|
//! | none   | NVMe     | (none)         | list empty  | entries non-empty | -                |
//! | nvme   | NVMe     | `NVME` / `VMD` | list empty  | entries non-empty | VMD resolution   |
//! | malloc | Malloc   | `MALLOC`       | count == 0  | -                 | -                |
//! | kdev   | AIO      | `AIO`          | list empty  | entries non-empty | -                |
//! | file   | AIO 4096 | `AIO`          | list empty  | size >= 1         | backing files    |

use tracing::debug;

use crate::error::Result;
use crate::file::prepare_backing_files;
use crate::template::Template;
use crate::types::{BackendConfig, BdevClass};
use crate::vmd::resolve_vmd_devices;

const MSG_BDEV_NONE: &str = "in config, no nvme.conf generated for server";
const MSG_BDEV_EMPTY: &str = "bdev device list entry empty";
const MSG_BDEV_BAD_SIZE: &str = "backfile_size should be greater than 0";

/// Runtime environment tags.
pub const VOS_ENV_NVME: &str = "NVME";
pub const VOS_ENV_VMD: &str = "VMD";
pub const VOS_ENV_MALLOC: &str = "MALLOC";
pub const VOS_ENV_AIO: &str = "AIO";

/// Test for "nothing configured".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptinessCheck {
    /// No entries in the device list
    DeviceList,
    /// Zero LUNs requested
    DeviceCount,
}

impl EmptinessCheck {
    /// Returns a reason when the backend has nothing to configure.
    pub fn check(&self, cfg: &BackendConfig) -> Option<String> {
        match self {
            Self::DeviceList if cfg.device_list.is_empty() => {
                Some(format!("bdev_list empty {}", MSG_BDEV_NONE))
            }
            Self::DeviceCount if cfg.device_count == 0 => {
                Some(format!("bdev_number == 0 {}", MSG_BDEV_NONE))
            }
            _ => None,
        }
    }
}

/// Test for a well-formed, non-empty configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidityCheck {
    /// Always valid
    Always,
    /// Every device list entry is non-empty
    DeviceEntries,
    /// Backing file size is at least 1 GB
    FileSize,
}

impl ValidityCheck {
    /// Returns a reason when the configuration is invalid.
    pub fn check(&self, cfg: &BackendConfig) -> Option<String> {
        match self {
            Self::Always => None,
            Self::DeviceEntries => cfg
                .device_list
                .iter()
                .position(String::is_empty)
                .map(|i| format!("{} (index {})", MSG_BDEV_EMPTY, i)),
            Self::FileSize if cfg.file_size < 1 => Some(MSG_BDEV_BAD_SIZE.to_string()),
            Self::FileSize => None,
        }
    }
}

/// Host preparation run before the config file is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitRoutine {
    /// Nothing to prepare
    Noop,
    /// Swap VMD addresses in the device list for their backing devices
    ResolveVmd,
    /// Create backing files for AIO emulation
    CreateBackingFiles,
}

impl InitRoutine {
    /// Run the routine, updating `cfg` where the routine rewrites it.
    pub fn run(&self, cfg: &mut BackendConfig) -> Result<()> {
        match self {
            Self::Noop => Ok(()),
            Self::ResolveVmd => {
                debug!(vmds = ?cfg.vmd_device_list, "init bdev nvme");
                cfg.device_list = resolve_vmd_devices(&cfg.device_list, &cfg.vmd_device_list)?;
                Ok(())
            }
            Self::CreateBackingFiles => prepare_backing_files(&cfg.device_list, cfg.file_size),
        }
    }
}

/// Parameters and behaviours for one bdev class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDescriptor {
    pub template: Template,
    pub vos_env: &'static str,
    pub emptiness: EmptinessCheck,
    pub validity: ValidityCheck,
    pub init: InitRoutine,
}

impl ClassDescriptor {
    /// Look up the descriptor for `cfg.class`.
    ///
    /// NVMe backends with VMD devices get the `VMD` environment tag.
    pub fn for_config(cfg: &BackendConfig) -> Self {
        match cfg.class {
            BdevClass::None => Self {
                template: Template::Nvme,
                vos_env: "",
                emptiness: EmptinessCheck::DeviceList,
                validity: ValidityCheck::DeviceEntries,
                init: InitRoutine::Noop,
            },
            BdevClass::Nvme => Self {
                template: Template::Nvme,
                vos_env: if cfg.vmd_device_list.is_empty() {
                    VOS_ENV_NVME
                } else {
                    VOS_ENV_VMD
                },
                emptiness: EmptinessCheck::DeviceList,
                validity: ValidityCheck::DeviceEntries,
                init: InitRoutine::ResolveVmd,
            },
            BdevClass::Malloc => Self {
                template: Template::Malloc,
                vos_env: VOS_ENV_MALLOC,
                emptiness: EmptinessCheck::DeviceCount,
                validity: ValidityCheck::Always,
                init: InitRoutine::Noop,
            },
            BdevClass::Kdev => Self {
                template: Template::KdevAio,
                vos_env: VOS_ENV_AIO,
                emptiness: EmptinessCheck::DeviceList,
                validity: ValidityCheck::DeviceEntries,
                init: InitRoutine::Noop,
            },
            BdevClass::File => Self {
                template: Template::FileAio,
                vos_env: VOS_ENV_AIO,
                emptiness: EmptinessCheck::DeviceList,
                validity: ValidityCheck::FileSize,
                init: InitRoutine::CreateBackingFiles,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_env_tags() {
        let tag = |cfg: BackendConfig| ClassDescriptor::for_config(&cfg).vos_env;

        assert_eq!(tag(BackendConfig::new(BdevClass::None)), "");
        assert_eq!(tag(BackendConfig::new(BdevClass::Nvme)), "NVME");
        assert_eq!(
            tag(BackendConfig::new(BdevClass::Nvme).with_vmd_devices(["0000:85:05.5"])),
            "VMD"
        );
        assert_eq!(tag(BackendConfig::new(BdevClass::Malloc)), "MALLOC");
        assert_eq!(tag(BackendConfig::new(BdevClass::Kdev)), "AIO");
        assert_eq!(tag(BackendConfig::new(BdevClass::File)), "AIO");
    }

    #[test]
    fn test_emptiness_checks() {
        let empty_list = BackendConfig::new(BdevClass::Kdev);
        let msg = EmptinessCheck::DeviceList.check(&empty_list).unwrap();
        assert!(msg.starts_with("bdev_list empty"));

        let with_list = empty_list.with_devices(["/dev/sdb"]);
        assert!(EmptinessCheck::DeviceList.check(&with_list).is_none());

        let no_luns = BackendConfig::new(BdevClass::Malloc);
        let msg = EmptinessCheck::DeviceCount.check(&no_luns).unwrap();
        assert!(msg.starts_with("bdev_number == 0"));

        let luns = no_luns.with_device_count(2);
        assert!(EmptinessCheck::DeviceCount.check(&luns).is_none());
    }

    #[test]
    fn test_validity_checks() {
        let cfg = BackendConfig::new(BdevClass::Nvme).with_devices(["0000:81:00.0", ""]);
        assert_eq!(
            ValidityCheck::DeviceEntries.check(&cfg).unwrap(),
            "bdev device list entry empty (index 1)"
        );

        let cfg = BackendConfig::new(BdevClass::File).with_devices(["/tmp/aio0"]);
        assert_eq!(
            ValidityCheck::FileSize.check(&cfg).unwrap(),
            "backfile_size should be greater than 0"
        );
        assert!(ValidityCheck::FileSize.check(&cfg.with_file_size(1)).is_none());

        assert!(ValidityCheck::Always.check(&BackendConfig::default()).is_none());
    }

    #[test]
    fn test_resolve_vmd_init() {
        let mut cfg = BackendConfig::new(BdevClass::Nvme)
            .with_devices(["0000:85:05.5"])
            .with_vmd_devices(["0000:85:05.5", "850505:00:00.0"]);

        InitRoutine::ResolveVmd.run(&mut cfg).unwrap();

        assert_eq!(cfg.device_list, vec!["850505:00:00.0"]);
    }
}
