//! Class provider: validates a backend and generates its driver config file.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::class::{ClassDescriptor, InitRoutine};
use crate::error::{BdevError, Result};
use crate::template::render_config;
use crate::types::{BackendConfig, BdevClass};

/// Name of the generated driver config file.
pub const CONFIG_FILE_NAME: &str = "daos_nvme.conf";

/// Generates the driver config file for one bdev backend.
///
/// Construction validates the backend and decides whether a file is needed;
/// [`gen_config_file`](Self::gen_config_file) does the host preparation and
/// writes the file. The environment tag and target path are written back
/// into the owned [`BackendConfig`], available through
/// [`config`](Self::config).
#[derive(Debug)]
pub struct ClassProvider {
    cfg: BackendConfig,
    cfg_path: Option<PathBuf>,
    bdev: ClassDescriptor,
    initialized: bool,
}

impl ClassProvider {
    /// Create a provider for `cfg`, writing into `cfg_dir`.
    ///
    /// A backend with no devices yields a provider that generates nothing.
    /// A backend with invalid devices is rejected.
    #[instrument(skip_all, fields(class = %cfg.class, cfg_dir = %cfg_dir.as_ref().display()))]
    pub fn new(cfg_dir: impl AsRef<Path>, mut cfg: BackendConfig) -> Result<Self> {
        debug!("creating new class provider");

        let bdev = ClassDescriptor::for_config(&cfg);

        if let Some(msg) = bdev.emptiness.check(&cfg) {
            // No devices; no need to generate a config file
            debug!("spdk {}: {}", cfg.class, msg);
            return Ok(Self {
                cfg,
                cfg_path: None,
                bdev,
                initialized: false,
            });
        }

        if let Some(msg) = bdev.validity.check(&cfg) {
            debug!("spdk {}: {}", cfg.class, msg);
            return Err(BdevError::InvalidConfig(msg));
        }

        let cfg_path = cfg_dir.as_ref().join(CONFIG_FILE_NAME);

        cfg.vos_env = bdev.vos_env.to_string();
        cfg.config_path = cfg_path.to_string_lossy().to_string();

        debug!(vos_env = %cfg.vos_env, path = %cfg.config_path, "config file required");

        Ok(Self {
            cfg,
            cfg_path: Some(cfg_path),
            bdev,
            initialized: false,
        })
    }

    /// Backend class handled by this provider.
    pub fn class(&self) -> BdevClass {
        self.cfg.class
    }

    /// Path of the config file to generate, if one is needed.
    pub fn config_path(&self) -> Option<&Path> {
        self.cfg_path.as_deref()
    }

    /// Whether [`gen_config_file`](Self::gen_config_file) will write a file.
    pub fn needs_config_file(&self) -> bool {
        self.cfg_path.is_some()
    }

    /// Backend configuration including the written-back fields.
    pub fn config(&self) -> &BackendConfig {
        &self.cfg
    }

    /// Consume the provider, returning the backend configuration.
    pub fn into_config(self) -> BackendConfig {
        self.cfg
    }

    /// Render the config file contents for the current device list.
    ///
    /// No init routine is run, so the output reflects the device list as it
    /// stands.
    pub fn render(&self) -> Result<String> {
        render_config(&self.cfg, self.bdev.template)
    }

    /// Render the config file as [`gen_config_file`](Self::gen_config_file)
    /// would write it, without touching the filesystem.
    ///
    /// Device list rewriting is applied to a copy of the config; backing
    /// files are not created.
    pub fn preview(&self) -> Result<String> {
        let mut cfg = self.cfg.clone();
        if self.bdev.init == InitRoutine::ResolveVmd {
            self.bdev.init.run(&mut cfg)?;
        }
        render_config(&cfg, self.bdev.template)
    }

    /// Prepare the host and write the driver config file.
    ///
    /// Does nothing if no file is needed. The init routine runs once; later
    /// calls rewrite the file from the already prepared device list.
    #[instrument(skip(self), fields(class = %self.cfg.class))]
    pub fn gen_config_file(&mut self) -> Result<()> {
        let Some(path) = self.cfg_path.clone() else {
            return Ok(());
        };

        if !self.initialized {
            self.bdev
                .init
                .run(&mut self.cfg)
                .map_err(|e| BdevError::DeviceInit(Box::new(e)))?;
            self.initialized = true;
        }

        let conf = self.render()?;
        if conf.is_empty() {
            return Err(BdevError::EmptyOutput(path));
        }

        write_config(&path, conf.as_bytes())?;

        info!(path = %path.display(), devices = self.cfg.device_list.len(), "Driver config generated");
        Ok(())
    }
}

/// Writer whose buffered data can be flushed to stable storage.
trait SyncWrite: Write {
    fn sync(&mut self) -> io::Result<()>;
}

impl SyncWrite for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

fn write_config(path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        BdevError::io(format!("spdk: failed to create NVMe config file {}", path.display()), e)
    })?;

    write_and_sync(&mut file, path, contents)
}

// The write error wins; a sync error is only reported after a clean write.
// Syncing surfaces errors that would otherwise be lost when the handle drops.
fn write_and_sync<W: SyncWrite>(out: &mut W, path: &Path, contents: &[u8]) -> Result<()> {
    out.write_all(contents).map_err(|e| {
        BdevError::io(format!("spdk: failed to write NVMe config to file {}", path.display()), e)
    })?;

    out.sync().map_err(|e| {
        BdevError::io(format!("spdk: failed to close NVMe config file {}", path.display()), e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_backend_generates_nothing() {
        let dir = tempfile::tempdir().unwrap();

        for class in [BdevClass::None, BdevClass::Nvme, BdevClass::Kdev, BdevClass::File, BdevClass::Malloc] {
            let mut provider = ClassProvider::new(dir.path(), BackendConfig::new(class)).unwrap();

            assert!(!provider.needs_config_file());
            assert!(provider.config_path().is_none());
            assert!(provider.config().config_path.is_empty());
            assert!(provider.config().vos_env.is_empty());

            provider.gen_config_file().unwrap();
        }

        assert!(!dir.path().join(CONFIG_FILE_NAME).exists());
    }

    #[test]
    fn test_empty_entry_rejected() {
        let dir = tempfile::tempdir().unwrap();

        for class in [BdevClass::None, BdevClass::Nvme, BdevClass::Kdev] {
            let cfg = BackendConfig::new(class).with_devices(["0000:81:00.0", ""]);
            let err = ClassProvider::new(dir.path(), cfg).unwrap_err();
            assert!(matches!(err, BdevError::InvalidConfig(ref m) if m.contains("index 1")));
        }
    }

    #[test]
    fn test_bad_file_size_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = BackendConfig::new(BdevClass::File)
            .with_devices([dir.path().join("aio0").to_string_lossy().to_string()]);

        let err = ClassProvider::new(dir.path(), cfg).unwrap_err();

        assert!(matches!(err, BdevError::InvalidConfig(_)));
        assert!(err.to_string().contains("backfile_size"));
        assert!(!dir.path().join("aio0").exists());
    }

    #[test]
    fn test_malloc_generates_lun_block() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = BackendConfig::new(BdevClass::Malloc)
            .with_device_count(1)
            .with_file_size(1);

        let mut provider = ClassProvider::new(dir.path(), cfg).unwrap();
        provider.gen_config_file().unwrap();

        let conf = std::fs::read_to_string(dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(conf, "[Malloc]\n    NumberOfLuns 1\n    LunSizeInMB 1000\n");
        assert_eq!(provider.config().vos_env, "MALLOC");
    }

    #[test]
    fn test_write_back() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = BackendConfig::new(BdevClass::Nvme)
            .with_devices(["0000:81:00.0"])
            .with_hostname("node1");

        let provider = ClassProvider::new(dir.path(), cfg).unwrap();
        let expected = dir.path().join(CONFIG_FILE_NAME);

        assert_eq!(provider.config_path(), Some(expected.as_path()));
        let cfg = provider.into_config();
        assert_eq!(cfg.vos_env, "NVME");
        assert_eq!(cfg.config_path, expected.to_string_lossy());
    }

    #[test]
    fn test_render_without_init() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = BackendConfig::new(BdevClass::Kdev)
            .with_devices(["/dev/sdb", "/dev/sdc"])
            .with_hostname("h");

        let provider = ClassProvider::new(dir.path(), cfg).unwrap();

        assert_eq!(
            provider.render().unwrap(),
            "[AIO]\n    AIO /dev/sdb AIO_h_0\n    AIO /dev/sdc AIO_h_1\n"
        );
        assert!(!dir.path().join(CONFIG_FILE_NAME).exists());
    }

    #[test]
    fn test_preview_resolves_vmd() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = BackendConfig::new(BdevClass::Nvme)
            .with_devices(["0000:85:05.5"])
            .with_vmd_devices(["0000:85:05.5", "850505:00:00.0"])
            .with_hostname("node1");

        let provider = ClassProvider::new(dir.path(), cfg).unwrap();
        let conf = provider.preview().unwrap();

        assert!(conf.starts_with("[VMD]\n    Enable True\n\n[Nvme]\n"));
        assert!(conf.contains("traddr:850505:00:00.0\" Nvme_node1_0"));
        assert_eq!(provider.config().device_list, vec!["0000:85:05.5"]);
        assert!(!dir.path().join(CONFIG_FILE_NAME).exists());
    }

    #[test]
    fn test_regenerate_keeps_resolved_devices() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = BackendConfig::new(BdevClass::Nvme)
            .with_devices(["0000:85:05.5"])
            .with_vmd_devices(["0000:85:05.5", "850505:00:00.0"])
            .with_hostname("node1");

        let mut provider = ClassProvider::new(dir.path(), cfg).unwrap();
        provider.gen_config_file().unwrap();
        let first = std::fs::read_to_string(dir.path().join(CONFIG_FILE_NAME)).unwrap();

        provider.gen_config_file().unwrap();
        let second = std::fs::read_to_string(dir.path().join(CONFIG_FILE_NAME)).unwrap();

        assert_eq!(provider.config().device_list, vec!["850505:00:00.0"]);
        assert!(second.contains("traddr:850505:00:00.0\" Nvme_node1_0"));
        assert_eq!(first, second);
    }

    /// In-memory writer with injectable write and sync failures.
    #[derive(Default)]
    struct FlakyWriter {
        data: Vec<u8>,
        fail_write: bool,
        fail_sync: bool,
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_write {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SyncWrite for FlakyWriter {
        fn sync(&mut self) -> io::Result<()> {
            if self.fail_sync {
                return Err(io::Error::new(io::ErrorKind::Other, "deferred close failure"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_sync_error_reported_after_write() {
        let path = Path::new("/run/daos_nvme.conf");
        let mut out = FlakyWriter {
            fail_sync: true,
            ..Default::default()
        };

        let err = write_and_sync(&mut out, path, b"[AIO]\n").unwrap_err();

        assert_eq!(out.data, b"[AIO]\n");
        assert!(err.to_string().contains("failed to close NVMe config file"));
    }

    #[test]
    fn test_write_error_takes_precedence() {
        let path = Path::new("/run/daos_nvme.conf");
        let mut out = FlakyWriter {
            fail_write: true,
            fail_sync: true,
            ..Default::default()
        };

        let err = write_and_sync(&mut out, path, b"[AIO]\n").unwrap_err();

        assert!(err.to_string().contains("failed to write NVMe config to file"));
    }

    #[test]
    fn test_missing_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = BackendConfig::new(BdevClass::Kdev).with_devices(["/dev/sdb"]);

        let mut provider = ClassProvider::new(dir.path().join("missing"), cfg).unwrap();
        let err = provider.gen_config_file().unwrap_err();

        assert!(matches!(err, BdevError::Io { .. }));
        assert!(err.to_string().contains("failed to create NVMe config file"));
    }
}
