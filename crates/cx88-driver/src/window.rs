//! Memory-mapped register window.
//!
//! Maps the chip's BAR0 resource file and exposes word-granular access with
//! strict alignment checking. Writes are masked read-modify-writes so
//! unmasked bits are preserved. Every access is volatile and issued in call
//! order: registers can be write-triggered or self-clearing, so nothing is
//! batched or reordered.
//!
//! A single internal lock serializes callers; the console thread and the
//! acquisition owner may hold references concurrently.

#![allow(clippy::cast_ptr_alignment)]

use crate::error::{CxError, Result};
use rustix::fs::OFlags;
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsFd;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::Mutex;

/// Memory-mapped register window over a chip's BAR0 resource file.
///
/// Unmapped on drop on every exit path.
#[derive(Debug)]
pub struct MemoryWindow {
    map: Mutex<Mapping>,
    size: usize,
    path: PathBuf,
}

#[derive(Debug)]
struct Mapping {
    ptr: NonNull<u8>,
    size: usize,
    _file: File,
}

// SAFETY: the mapping is owned exclusively; moving it between threads does
// not invalidate mmap'd memory, and all pointer access goes through the
// window's mutex.
unsafe impl Send for Mapping {}

impl MemoryWindow {
    /// Map `size` bytes of the register file at `path`.
    ///
    /// The file is opened read-write with `O_SYNC` so stores reach the
    /// device immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the mapping fails.
    pub fn open(path: impl AsRef<Path>, size: usize) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Mapping register window: {}", path.display());

        #[allow(clippy::cast_possible_wrap)]
        let sync_flag = OFlags::SYNC.bits() as i32;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(sync_flag)
            .open(path)?;

        // SAFETY: fd is valid (just opened), size is the caller's window
        // size, and the pointer is either valid for `size` bytes or mmap
        // returns Err. The mapping is unmapped exactly once, in Drop.
        let ptr = unsafe {
            let addr = mmap(
                std::ptr::null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                file.as_fd(),
                0,
            )
            .map_err(|e| {
                std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("mmap of {} failed: {e}", path.display()),
                )
            })?;
            NonNull::new(addr.cast::<u8>()).ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, "mmap returned null")
            })?
        };

        tracing::info!(
            "Mapped {} ({} KB at {ptr:p})",
            path.display(),
            size / 1024
        );

        Ok(Self {
            map: Mutex::new(Mapping {
                ptr,
                size,
                _file: file,
            }),
            size,
            path: path.to_path_buf(),
        })
    }

    /// Window size in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Path of the mapped resource file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the 32-bit word at `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`CxError::Alignment`] if `addr` is not a multiple of 4, or
    /// [`CxError::NotFound`] if it lies outside the window.
    pub fn read_word(&self, addr: u32) -> Result<u32> {
        self.check(addr, 4)?;
        let map = self.lock();
        // SAFETY: addr + 4 <= size was just checked and the pointer is valid
        // for the whole mapping. Volatile because hardware changes the value.
        let value = unsafe {
            map.ptr
                .as_ptr()
                .add(addr as usize)
                .cast::<u32>()
                .read_volatile()
        };
        tracing::trace!("read  {addr:#08x} = {value:#010x}");
        Ok(value)
    }

    /// Write `value & mask` into the word at `addr`, preserving unmasked
    /// bits via a read-modify-write.
    ///
    /// # Errors
    ///
    /// Returns [`CxError::Alignment`] if `addr` is not a multiple of 4, or
    /// [`CxError::NotFound`] if it lies outside the window.
    pub fn write_word(&self, addr: u32, value: u32, mask: u32) -> Result<()> {
        self.check(addr, 4)?;
        let map = self.lock();
        // SAFETY: bounds checked above; the read and write stay inside the
        // mapping and must both be volatile (registers may be self-clearing).
        unsafe {
            let ptr = map.ptr.as_ptr().add(addr as usize).cast::<u32>();
            let current = ptr.read_volatile();
            ptr.write_volatile((current & !mask) | (value & mask));
        }
        tracing::trace!("write {addr:#08x} = {value:#010x} mask {mask:#010x}");
        Ok(())
    }

    /// Read `length / 4` consecutive words starting at `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`CxError::Alignment`] if `addr` or `length` is not a
    /// multiple of 4, or [`CxError::NotFound`] if the range leaves the
    /// window.
    pub fn read_block(&self, addr: u32, length: u32) -> Result<Vec<u32>> {
        if length % 4 != 0 {
            return Err(CxError::alignment(length));
        }
        self.check(addr, length as usize)?;
        let map = self.lock();
        let mut words = Vec::with_capacity(length as usize / 4);
        for n in (0..length).step_by(4) {
            // SAFETY: the whole range was bounds checked; each word read is
            // volatile and in address order.
            let value = unsafe {
                map.ptr
                    .as_ptr()
                    .add((addr + n) as usize)
                    .cast::<u32>()
                    .read_volatile()
            };
            words.push(value);
        }
        Ok(words)
    }

    fn check(&self, addr: u32, len: usize) -> Result<()> {
        if addr % 4 != 0 {
            return Err(CxError::alignment(addr));
        }
        if addr as usize + len > self.size {
            return Err(CxError::not_found(format!(
                "{addr:#08x}+{len:#x} outside window of {:#x}",
                self.size
            )));
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Mapping> {
        // A poisoned lock means a panic mid-access; the mapping itself is
        // still valid, so continue with the recovered guard.
        self.map.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        // SAFETY: ptr/size are exactly what mmap returned; Drop runs once.
        unsafe {
            if let Err(e) = munmap(self.ptr.as_ptr().cast(), self.size) {
                tracing::error!("munmap failed during drop: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::temp_window;

    #[test]
    fn word_round_trip() {
        let (win, _dir) = temp_window(0x1000);
        win.write_word(0x10, 0xdead_beef, 0xffff_ffff).unwrap();
        assert_eq!(win.read_word(0x10).unwrap(), 0xdead_beef);
    }

    #[test]
    fn masked_write_preserves_bits() {
        let (win, _dir) = temp_window(0x1000);
        win.write_word(0x20, 0xaaaa_5555, 0xffff_ffff).unwrap();
        win.write_word(0x20, 0xffff_ffff, 0x0000_00f0).unwrap();
        assert_eq!(win.read_word(0x20).unwrap(), 0xaaaa_55f5);
    }

    #[test]
    fn misaligned_access_rejected() {
        let (win, _dir) = temp_window(0x1000);
        assert!(matches!(
            win.read_word(0x11),
            Err(CxError::Alignment { addr: 0x11 })
        ));
        assert!(matches!(
            win.write_word(0x2, 0, 0xffff_ffff),
            Err(CxError::Alignment { addr: 0x2 })
        ));
        assert!(matches!(
            win.read_block(0x0, 6),
            Err(CxError::Alignment { addr: 6 })
        ));
        assert!(matches!(
            win.read_block(0x3, 8),
            Err(CxError::Alignment { addr: 0x3 })
        ));
    }

    #[test]
    fn block_reads_in_address_order() {
        let (win, _dir) = temp_window(0x1000);
        for n in 0..8u32 {
            win.write_word(0x40 + n * 4, n + 1, 0xffff_ffff).unwrap();
        }
        let words = win.read_block(0x40, 32).unwrap();
        assert_eq!(words, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn out_of_bounds_reported() {
        let (win, _dir) = temp_window(0x100);
        assert!(matches!(win.read_word(0x100), Err(CxError::NotFound { .. })));
        assert!(matches!(
            win.read_block(0xf8, 16),
            Err(CxError::NotFound { .. })
        ));
    }
}
