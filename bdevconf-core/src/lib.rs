//! # bdevconf
//!
//! Block-device backend configuration for the storage poll-mode driver.
//!
//! A [`BackendConfig`] describes one backend: its class, devices and sizes.
//! [`ClassProvider`] validates it against the rules of its class and, when
//! devices are configured, generates the driver config file and prepares the
//! host (VMD device resolution, backing files for emulated devices).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             ClassProvider               │
//! │   validate → init → render → write      │
//! └─────────────────────┬───────────────────┘
//!                       │ ClassDescriptor
//!       ┌───────────────┼───────────────┐
//!       ▼               ▼               ▼
//! ┌───────────┐   ┌───────────┐   ┌───────────┐
//! │    VMD    │   │  Backing  │   │ Template  │
//! │ Resolver  │   │   Files   │   │ Renderer  │
//! └───────────┘   └───────────┘   └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bdevconf_core::{BackendConfig, BdevClass, ClassProvider};
//!
//! let cfg = BackendConfig::new(BdevClass::Nvme)
//!     .with_devices(["0000:81:00.0"])
//!     .with_hostname("node1");
//!
//! let mut provider = ClassProvider::new("/var/run/bdevconf", cfg).unwrap();
//! provider.gen_config_file().unwrap();
//! ```

pub mod class;
pub mod error;
pub mod file;
pub mod pci;
pub mod provider;
pub mod template;
pub mod types;
pub mod vmd;

pub use class::{ClassDescriptor, EmptinessCheck, InitRoutine, ValidityCheck};
pub use error::{BdevError, Result};
pub use file::{backing_file_size, create_empty_file, prepare_backing_files, BLOCK_SIZE, GBYTE};
pub use pci::PciAddress;
pub use provider::{ClassProvider, CONFIG_FILE_NAME};
pub use template::{render_config, Template, VMD_STANZA};
pub use types::{BackendConfig, BdevClass};
pub use vmd::resolve_vmd_devices;
