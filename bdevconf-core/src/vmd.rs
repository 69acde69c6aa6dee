//! VMD device list resolution.
//!
//! A Volume Management Device fronts one or more NVMe SSDs. The driver
//! cannot use the VMD address directly, so every VMD entry in the device list
//! is replaced by the backing SSD addresses declared alongside it in the VMD
//! list. A backing SSD is recognised by its PCI domain, which equals the
//! VMD's bus, device and function concatenated (see
//! [`PciAddress::vmd_prefix`]).

use tracing::debug;

use crate::error::Result;
use crate::pci::PciAddress;

/// Replace VMD addresses in `device_list` with their backing devices.
///
/// Non-VMD entries pass through in their original order. Each VMD entry is
/// swapped in place for the matching addresses from `vmd_list`, in
/// `vmd_list` order. With an empty `vmd_list` the device list is returned
/// unchanged.
pub fn resolve_vmd_devices(device_list: &[String], vmd_list: &[String]) -> Result<Vec<String>> {
    if vmd_list.is_empty() {
        return Ok(device_list.to_vec());
    }

    debug!(
        devices = ?device_list,
        vmds = ?vmd_list,
        "VMD: prepare conf device list"
    );

    let mut resolved = Vec::with_capacity(device_list.len());

    for addr in device_list {
        if !vmd_list.contains(addr) {
            resolved.push(addr.clone());
            continue;
        }

        let prefix = PciAddress::parse(addr)?.vmd_prefix();
        debug!(vmd = %addr, prefix = %prefix, "looking for backing devices");

        for candidate in vmd_list {
            if PciAddress::parse(candidate)?.domain == prefix {
                debug!(device = %candidate, "adding backing device");
                resolved.push(candidate.clone());
            }
        }
    }

    debug!(after = ?resolved, "VMD: device list resolved");

    Ok(resolved)
}
