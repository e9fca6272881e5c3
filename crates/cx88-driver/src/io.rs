//! Low-level reads from the capture device node.

use crate::error::{CxError, Result};
use rustix::fd::BorrowedFd;
use rustix::io::read;
use std::os::unix::io::RawFd;

/// Read handle over a capture device file descriptor.
///
/// Does not own the descriptor; the device keeps it open for the handle's
/// lifetime.
#[derive(Debug)]
pub struct IoHandle {
    fd: RawFd,
}

impl IoHandle {
    /// Create a handle for `fd`.
    #[must_use]
    pub const fn new(fd: RawFd) -> Self {
        Self { fd }
    }

    /// Read raw sample bytes, returning the count actually read.
    ///
    /// # Errors
    ///
    /// Returns [`CxError::Stream`] if the read fails.
    pub fn read(&self, buffer: &mut [u8]) -> Result<usize> {
        // SAFETY: fd stays valid for the lifetime of the owning device.
        let borrowed = unsafe { BorrowedFd::borrow_raw(self.fd) };
        read(borrowed, buffer).map_err(|e| CxError::stream(format!("device read failed: {e}")))
    }
}
