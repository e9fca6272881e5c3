//! Capture device handle.

use crate::acquire::SampleSource;
use crate::discovery::DeviceInfo;
use crate::error::{CxError, Result};
use crate::io::IoHandle;
use std::fs::{File, OpenOptions};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;

/// An open CX2388x capture device.
///
/// Reads block at the sample rate: the kernel driver wakes the reader as
/// DMA pages arrive.
#[derive(Debug)]
pub struct CxDevice {
    info: DeviceInfo,
    file: File,
    io: IoHandle,
}

impl CxDevice {
    /// Open the capture node described by `info`.
    ///
    /// # Errors
    ///
    /// Returns [`CxError::DeviceNotFound`] if the node is gone, or an I/O
    /// error if it cannot be opened.
    pub fn open(info: &DeviceInfo) -> Result<Self> {
        tracing::debug!("Opening device {}: {}", info.index, info.path.display());

        if !info.path.exists() {
            return Err(CxError::device_not_found(&info.path));
        }
        let file = OpenOptions::new().read(true).open(&info.path)?;
        let io = IoHandle::new(file.as_raw_fd());

        tracing::info!("Opened device {}: {}", info.index, info.path.display());
        Ok(Self {
            info: info.clone(),
            file,
            io,
        })
    }

    /// Device index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.info.index
    }

    /// Capture node path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.info.path
    }

    /// Discovery information.
    #[must_use]
    pub const fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Raw file descriptor, for advanced use.
    #[must_use]
    pub fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl SampleSource for CxDevice {
    /// One blocking read per ring page. Short reads are surfaced as-is;
    /// the ring treats them as fatal rather than retrying.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.io.read(buf)
    }
}

impl Drop for CxDevice {
    fn drop(&mut self) {
        tracing::info!(
            "Closing device {}: {}",
            self.info.index,
            self.info.path.display()
        );
    }
}
