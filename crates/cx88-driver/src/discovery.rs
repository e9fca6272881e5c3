//! Runtime device discovery.
//!
//! Scans the capture nodes the cxadc kernel driver exposes and resolves
//! each node's PCI function through sysfs: the node's char device number
//! leads to `/sys/dev/char/{major}:{minor}/device`, whose `resource0` file
//! is the chip's BAR0, the register window the driver maps.

use crate::device::CxDevice;
use crate::error::{CxError, Result};
use crate::window::MemoryWindow;
use cx88_chip::pcie::bar0;
use rustix::fs::{major, minor};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

/// Node name patterns the cxadc driver registers under.
const NODE_PATTERNS: &[&str] = &["/dev/cxadc", "/dev/swradio"];

/// Device manager for runtime discovery and access.
#[derive(Debug)]
pub struct DeviceManager {
    devices: Vec<DeviceInfo>,
}

/// Information about one discovered capture device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Device index (0, 1, 2, ...).
    pub index: usize,

    /// Capture node path (/dev/cxadc0, /dev/swradio0, ...).
    pub path: PathBuf,

    /// BAR0 resource file backing the register window.
    pub resource0: PathBuf,

    /// PCI bus address (0000:05:00.0, ...).
    pub pci_address: String,
}

impl DeviceInfo {
    /// Capture node path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// PCI bus address.
    #[must_use]
    pub fn pci_address(&self) -> &str {
        &self.pci_address
    }

    /// Map this device's register window.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource file cannot be opened or mapped.
    pub fn open_window(&self) -> Result<MemoryWindow> {
        MemoryWindow::open(&self.resource0, bar0::WINDOW_SIZE)
    }
}

impl DeviceManager {
    /// Discover all CX2388x capture devices on the system.
    ///
    /// # Errors
    ///
    /// Returns [`CxError::NoDevicesFound`] if no nodes are present.
    pub fn discover() -> Result<Self> {
        tracing::info!("Discovering CX2388x capture devices...");

        let mut devices = Vec::new();
        for pattern in NODE_PATTERNS {
            for n in 0..16 {
                let path = PathBuf::from(format!("{pattern}{n}"));
                if !path.exists() {
                    continue;
                }
                tracing::debug!("Found capture node: {}", path.display());
                match Self::resolve_sysfs(&path) {
                    Ok((resource0, pci_address)) => {
                        tracing::info!(
                            "Device {}: {} @ {pci_address}",
                            devices.len(),
                            path.display()
                        );
                        devices.push(DeviceInfo {
                            index: devices.len(),
                            path,
                            resource0,
                            pci_address,
                        });
                    }
                    Err(e) => {
                        tracing::warn!("Cannot resolve sysfs for {}: {e}", path.display());
                    }
                }
            }
        }

        if devices.is_empty() {
            tracing::error!("No CX2388x capture devices found");
            return Err(CxError::NoDevicesFound);
        }
        Ok(Self { devices })
    }

    /// Resolve a capture node's PCI device directory via its char device
    /// number.
    fn resolve_sysfs(node: &Path) -> Result<(PathBuf, String)> {
        let rdev = std::fs::metadata(node)?.rdev();
        let sys_device = PathBuf::from(format!(
            "/sys/dev/char/{}:{}/device",
            major(rdev),
            minor(rdev)
        ));

        let pci_dir = std::fs::canonicalize(&sys_device)?;
        let pci_address = pci_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let resource0 = sys_device.join("resource0");
        if !resource0.exists() {
            return Err(CxError::device_not_found(resource0));
        }
        Ok((resource0, pci_address))
    }

    /// Number of discovered devices.
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// All discovered devices.
    #[must_use]
    pub fn devices(&self) -> &[DeviceInfo] {
        &self.devices
    }

    /// Device info by index.
    ///
    /// # Errors
    ///
    /// Returns [`CxError::NotFound`] if the index is out of range.
    pub fn device(&self, index: usize) -> Result<&DeviceInfo> {
        self.devices
            .get(index)
            .ok_or_else(|| CxError::not_found(format!("device {index}")))
    }

    /// Open the capture node of the device at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is invalid or the node cannot be
    /// opened.
    pub fn open(&self, index: usize) -> Result<CxDevice> {
        CxDevice::open(self.device(index)?)
    }

    /// Open the first discovered device.
    ///
    /// # Errors
    ///
    /// See [`DeviceManager::open`].
    pub fn open_first(&self) -> Result<CxDevice> {
        self.open(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires hardware
    fn discover_and_map() {
        let manager = DeviceManager::discover().expect("no capture devices");
        let info = manager.device(0).unwrap();
        let window = info.open_window().unwrap();
        assert_eq!(window.size(), bar0::WINDOW_SIZE);
    }
}
