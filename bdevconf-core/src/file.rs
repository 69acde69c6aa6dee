//! Backing files for emulated block devices.
//!
//! The file class drives plain files through AIO. Each configured path must
//! exist with the requested size before the driver starts; missing files are
//! created and preallocated here.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, info, instrument, warn};

use crate::error::{BdevError, Result};

/// Bytes per GB as used for backing file sizes.
pub const GBYTE: u64 = 1_000_000_000;

/// Device block size; backing file sizes are aligned down to it.
pub const BLOCK_SIZE: u64 = 4096;

/// Size in bytes of a backing file of `size_gb` GB, aligned to [`BLOCK_SIZE`].
pub fn backing_file_size(size_gb: i64) -> Result<u64> {
    u64::try_from(size_gb)
        .ok()
        .and_then(|gb| gb.checked_mul(GBYTE))
        .map(|bytes| bytes / BLOCK_SIZE * BLOCK_SIZE)
        .ok_or_else(|| BdevError::InvalidConfig(format!("invalid backing file size {} GB", size_gb)))
}

/// Create every path in `device_list` as a backing file of `size_gb` GB.
pub fn prepare_backing_files(device_list: &[String], size_gb: i64) -> Result<()> {
    let size = backing_file_size(size_gb)?;

    for path in device_list {
        create_empty_file(Path::new(path), size)?;
    }

    Ok(())
}

/// Create `path` with `size` bytes reserved.
///
/// Existing files are left untouched. Space is preallocated where the
/// filesystem supports it, otherwise the file is truncated to `size`.
#[instrument(skip_all, fields(path = %path.display(), size_bytes = size))]
pub fn create_empty_file(path: &Path, size: u64) -> Result<()> {
    if !path.is_absolute() {
        return Err(BdevError::PathNotAbsolute(path.to_path_buf()));
    }

    match std::fs::metadata(path) {
        Ok(_) => {
            debug!("Backing file already exists");
            return Ok(());
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(source) => {
            return Err(BdevError::PathStat {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| BdevError::io(format!("failed to create {}", path.display()), e))?;

    let sized = match preallocate(&file, size) {
        Ok(()) => Ok(()),
        Err(Preallocate::Unsupported(reason)) => {
            warn!(reason = %reason, "Fallocate not supported, attempting truncate");
            file.set_len(size)
                .map_err(|e| BdevError::io(format!("failed to truncate {}", path.display()), e))
        }
        Err(Preallocate::Failed(e)) => {
            Err(BdevError::io(format!("failed to preallocate {}", path.display()), e))
        }
    };
    drop(file);

    if let Err(e) = sized {
        // An undersized file would pass the existence check on the next run
        if let Err(rm) = std::fs::remove_file(path) {
            warn!(error = %rm, "Failed to remove partially created backing file");
        }
        return Err(e);
    }

    info!("Backing file created");
    Ok(())
}

/// Outcome of a failed preallocation attempt.
#[derive(Debug)]
enum Preallocate {
    /// The platform or filesystem has no preallocation primitive.
    Unsupported(String),
    /// Preallocation is supported but failed.
    Failed(std::io::Error),
}

#[cfg(target_os = "linux")]
fn preallocate(file: &File, size: u64) -> std::result::Result<(), Preallocate> {
    use nix::fcntl::{fallocate, FallocateFlags};
    use std::os::unix::io::AsRawFd;

    let len = libc::off_t::try_from(size).map_err(|_| {
        Preallocate::Failed(std::io::Error::new(
            ErrorKind::InvalidInput,
            format!("size {} exceeds off_t", size),
        ))
    })?;

    fallocate(file.as_raw_fd(), FallocateFlags::empty(), 0, len).map_err(classify)
}

/// Map a `fallocate(2)` errno to the fallback it calls for.
#[cfg(target_os = "linux")]
fn classify(e: nix::errno::Errno) -> Preallocate {
    use nix::errno::Errno;

    match e {
        Errno::ENOSYS | Errno::EOPNOTSUPP => Preallocate::Unsupported(e.desc().to_string()),
        e => Preallocate::Failed(e.into()),
    }
}

#[cfg(not(target_os = "linux"))]
fn preallocate(_file: &File, _size: u64) -> std::result::Result<(), Preallocate> {
    Err(Preallocate::Unsupported(format!(
        "no fallocate on {}",
        std::env::consts::OS
    )))
}
