//! Shared helpers for the in-crate tests: file-backed register windows
//! standing in for BAR0.

use crate::window::MemoryWindow;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Directory removed on drop.
pub struct TempDir(PathBuf);

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// Create a zero-filled file of `size` bytes and map it as a window.
pub fn temp_window(size: usize) -> (MemoryWindow, TempDir) {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let dir = std::env::temp_dir().join(format!(
        "cx88-test-{}-{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join("resource0");
    std::fs::write(&path, vec![0u8; size]).expect("write window file");
    let window = MemoryWindow::open(&path, size).expect("map window file");
    (window, TempDir(dir))
}
