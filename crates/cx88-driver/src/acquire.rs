//! Sample acquisition ring: one producer thread, one consumer.
//!
//! The reader thread pulls raw bytes from a [`SampleSource`] one page at a
//! time into a bounded circular buffer, maintains a running moving-average
//! filter into a parallel ring, and derives a black/white cutoff from a per
//! page histogram of the filtered values. The consumer pulls filtered bytes
//! with [`AcquisitionBuffer::read_into`], one frame per refresh tick.
//!
//! Producer and consumer communicate only through two monotonic byte
//! counters with acquire/release ordering: a page is published by advancing
//! the producer counter only after all raw, filtered and histogram writes
//! for it are complete. Until then the page is exclusively the producer's;
//! afterwards the consumer reads it and never mutates it. Head/tail page
//! indices are derived from the counters mod the page count.

use crate::error::{CxError, Result};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Default page size in bytes. Power of two; the unit of handoff.
pub const PAGE_SIZE: usize = 0x1_0000;

/// Default page count. The ring is `PAGE_SIZE * PAGE_COUNT` bytes.
pub const PAGE_COUNT: usize = 64;

/// Moving-average window length. Power of two.
pub const FILTER_WINDOW: usize = 512;

const FILTER_SHIFT: u32 = FILTER_WINDOW.trailing_zeros();
const FILTER_MARGIN: usize = FILTER_WINDOW / 2;

/// Poll interval for both blocking points (producer free-space wait,
/// consumer byte wait). Bounded so stop() is honoured promptly.
const POLL_INTERVAL: Duration = Duration::from_micros(500);

const STATE_STOPPED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPING: u8 = 2;

/// A raw byte-stream source the reader thread pulls from.
///
/// One call per ring page. Returning fewer bytes than `buf.len()` is a
/// stream failure; the ring never retries a short read.
pub trait SampleSource: Send + 'static {
    /// Read the next raw samples into `buf`, returning the byte count.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying device read fails.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

struct Shared {
    page_size: usize,
    page_count: usize,
    ring_len: usize,
    raw: UnsafeCell<Box<[u8]>>,
    filtered: UnsafeCell<Box<[u8]>>,
    /// Bytes published by the producer, page granular, monotonic.
    produced: AtomicU64,
    /// Bytes consumed by the consumer, monotonic.
    consumed: AtomicU64,
    state: AtomicU8,
    cutoff: AtomicU32,
    failure: Mutex<Option<String>>,
}

// SAFETY: the byte rings are partitioned by the produced/consumed counters.
// The producer writes raw bytes in [produced, consumed + ring_len) and
// filtered bytes from produced - FILTER_MARGIN upward, publishing with a
// Release store; the consumer reads filtered bytes strictly below
// produced - FILTER_MARGIN after an Acquire load. No byte is touched by
// both sides at once.
unsafe impl Sync for Shared {}

impl Shared {
    fn record_failure(&self, reason: String) {
        tracing::error!("Acquisition reader failed: {reason}");
        let mut slot = self
            .failure
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        slot.get_or_insert(reason);
    }

    fn failure_reason(&self) -> Option<String> {
        self.failure
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

/// Bounded circular acquisition buffer with a spawned reader thread.
#[derive(Debug)]
pub struct AcquisitionBuffer {
    shared: Arc<Shared>,
    reader: Option<JoinHandle<()>>,
    /// Consumer cursor. Mirrors `shared.consumed`; owned by the single
    /// consumer, which holds `&mut self` for reads.
    read_pos: u64,
}

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared")
            .field("page_size", &self.page_size)
            .field("page_count", &self.page_count)
            .field("produced", &self.produced.load(Ordering::Relaxed))
            .field("consumed", &self.consumed.load(Ordering::Relaxed))
            .field("state", &self.state.load(Ordering::Relaxed))
            .finish()
    }
}

impl AcquisitionBuffer {
    /// Create a stopped buffer with the default geometry.
    ///
    /// # Errors
    ///
    /// Does not fail with the default geometry; kept fallible to match
    /// [`AcquisitionBuffer::with_geometry`].
    pub fn new() -> Result<Self> {
        Self::with_geometry(PAGE_SIZE, PAGE_COUNT)
    }

    /// Create a stopped buffer with explicit geometry.
    ///
    /// # Errors
    ///
    /// Returns [`CxError::InvalidState`] if `page_size` is not a power of
    /// two at least the filter window, or `page_count` is not in 2..=256.
    pub fn with_geometry(page_size: usize, page_count: usize) -> Result<Self> {
        if !page_size.is_power_of_two() || page_size < FILTER_WINDOW {
            return Err(CxError::invalid_state(format!(
                "page size {page_size} must be a power of two >= {FILTER_WINDOW}"
            )));
        }
        if !(2..=256).contains(&page_count) {
            return Err(CxError::invalid_state(format!(
                "page count {page_count} out of range 2..=256"
            )));
        }
        let ring_len = page_size * page_count;
        Ok(Self {
            shared: Arc::new(Shared {
                page_size,
                page_count,
                ring_len,
                raw: UnsafeCell::new(vec![0u8; ring_len].into_boxed_slice()),
                filtered: UnsafeCell::new(vec![0u8; ring_len].into_boxed_slice()),
                produced: AtomicU64::new(0),
                consumed: AtomicU64::new(0),
                state: AtomicU8::new(STATE_STOPPED),
                cutoff: AtomicU32::new(0),
                failure: Mutex::new(None),
            }),
            reader: None,
            read_pos: 0,
        })
    }

    /// Start streaming: spawn exactly one reader pulling from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`CxError::InvalidState`] if already running, or an I/O
    /// error if the thread cannot be spawned.
    pub fn start(&mut self, source: impl SampleSource) -> Result<()> {
        if self.reader.is_some() {
            return Err(CxError::invalid_state("already running"));
        }

        self.shared.produced.store(0, Ordering::Relaxed);
        self.shared.consumed.store(0, Ordering::Relaxed);
        self.shared.cutoff.store(0, Ordering::Relaxed);
        *self
            .shared
            .failure
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
        self.read_pos = 0;

        self.shared.state.store(STATE_RUNNING, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name("cx88-reader".into())
            .spawn(move || reader_main(&shared, source))?;
        self.reader = Some(handle);

        tracing::info!(
            "Acquisition started: {} pages of {} bytes",
            self.shared.page_count,
            self.shared.page_size
        );
        Ok(())
    }

    /// Stop streaming and join the reader. No reader survives this call.
    ///
    /// # Errors
    ///
    /// Returns [`CxError::InvalidState`] if not running, or
    /// [`CxError::Stream`] if the reader terminated on a source failure.
    pub fn stop(&mut self) -> Result<()> {
        let handle = self
            .reader
            .take()
            .ok_or_else(|| CxError::invalid_state("not running"))?;

        self.shared.state.store(STATE_STOPPING, Ordering::Release);
        let join = handle.join();
        self.shared.state.store(STATE_STOPPED, Ordering::Release);
        tracing::info!("Acquisition stopped");

        if join.is_err() {
            return Err(CxError::stream("reader thread panicked"));
        }
        match self.shared.failure_reason() {
            Some(reason) => Err(CxError::stream(reason)),
            None => Ok(()),
        }
    }

    /// True while the reader is live and healthy.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.state.load(Ordering::Acquire) == STATE_RUNNING
            && self.shared.failure_reason().is_none()
    }

    /// Block until `out.len()` filtered bytes are available, then copy them
    /// and advance the read cursor. Polls on a bounded interval; wraps
    /// across the ring boundary in at most two copies. Never reads past the
    /// filter's half-window trailing margin.
    ///
    /// # Errors
    ///
    /// Returns [`CxError::InvalidState`] if `out` exceeds what the ring can
    /// ever hold, or [`CxError::Stream`] if streaming stopped or the reader
    /// failed while waiting.
    pub fn read_into(&mut self, out: &mut [u8]) -> Result<()> {
        let count = out.len();
        if count == 0 {
            return Ok(());
        }
        let capacity = (self.shared.page_count - 1) * self.shared.page_size - FILTER_MARGIN;
        if count > capacity {
            return Err(CxError::invalid_state(format!(
                "read of {count} bytes exceeds ring capacity {capacity}"
            )));
        }

        loop {
            let produced = self.shared.produced.load(Ordering::Acquire);
            let readable = produced
                .saturating_sub(FILTER_MARGIN as u64)
                .saturating_sub(self.read_pos);
            if readable >= count as u64 {
                break;
            }
            if self.shared.state.load(Ordering::Acquire) != STATE_RUNNING {
                return Err(match self.shared.failure_reason() {
                    Some(reason) => CxError::stream(reason),
                    None => CxError::stream("acquisition stopped while waiting for samples"),
                });
            }
            if let Some(reason) = self.shared.failure_reason() {
                return Err(CxError::stream(reason));
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        let start = (self.read_pos % self.shared.ring_len as u64) as usize;
        let first = count.min(self.shared.ring_len - start);
        // SAFETY: every byte in [read_pos, read_pos + count) is below
        // produced - FILTER_MARGIN (checked above with an Acquire load), so
        // the producer has published it and will not touch it again until
        // consumed advances past it.
        unsafe {
            let base = (*self.shared.filtered.get()).as_ptr();
            std::ptr::copy_nonoverlapping(base.add(start), out.as_mut_ptr(), first);
            if first < count {
                std::ptr::copy_nonoverlapping(base, out[first..].as_mut_ptr(), count - first);
            }
        }

        self.read_pos += count as u64;
        self.shared.consumed.store(self.read_pos, Ordering::Release);
        Ok(())
    }

    /// Next page the producer will fill, mod the page count.
    #[must_use]
    pub fn head_page(&self) -> usize {
        let produced = self.shared.produced.load(Ordering::Acquire);
        ((produced / self.shared.page_size as u64) % self.shared.page_count as u64) as usize
    }

    /// Oldest unread page, mod the page count.
    #[must_use]
    pub fn tail_page(&self) -> usize {
        let consumed = self.shared.consumed.load(Ordering::Acquire);
        ((consumed / self.shared.page_size as u64) % self.shared.page_count as u64) as usize
    }

    /// Filtered bytes currently available to read.
    #[must_use]
    pub fn available(&self) -> usize {
        let produced = self.shared.produced.load(Ordering::Acquire);
        produced
            .saturating_sub(FILTER_MARGIN as u64)
            .saturating_sub(self.read_pos) as usize
    }

    /// Latest histogram-derived black/white cutoff estimate.
    #[must_use]
    pub fn cutoff(&self) -> u8 {
        self.shared.cutoff.load(Ordering::Relaxed) as u8
    }

    /// Ring capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.ring_len
    }
}

impl Drop for AcquisitionBuffer {
    fn drop(&mut self) {
        if self.reader.is_some() {
            let _ = self.stop();
        }
    }
}

/// Reader thread body: fill page, filter, histogram, publish, repeat.
fn reader_main(shared: &Shared, mut source: impl SampleSource) {
    let page_size = shared.page_size;
    let mut acc: u32 = 0;
    let mut history = [0u8; FILTER_WINDOW];
    let mut pos: u64 = 0;

    loop {
        if shared.state.load(Ordering::Acquire) != STATE_RUNNING {
            break;
        }

        // Wait for a free page, always leaving one page unfilled so the
        // producer never catches the consumer's tail.
        let full_mark = (shared.ring_len - page_size) as u64;
        loop {
            let consumed = shared.consumed.load(Ordering::Acquire);
            if shared.produced.load(Ordering::Relaxed) - consumed < full_mark {
                break;
            }
            if shared.state.load(Ordering::Acquire) != STATE_RUNNING {
                return;
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        let page_start = (pos % shared.ring_len as u64) as usize;
        // SAFETY: this page lies at or above `produced` and below
        // `consumed + ring_len - page_size`, so the consumer cannot be
        // reading it; the producer owns it until the Release store below.
        let page: &mut [u8] = unsafe {
            &mut (&mut *shared.raw.get())[page_start..page_start + page_size]
        };

        match source.read(page) {
            Ok(n) if n == page_size => {}
            Ok(n) => {
                shared.record_failure(format!("short read: {n} of {page_size} bytes"));
                return;
            }
            Err(e) => {
                shared.record_failure(e.to_string());
                return;
            }
        }

        // Moving average over the trailing FILTER_WINDOW samples, written a
        // half window behind the raw cursor. Exact integer shift.
        let mut histogram = [0u32; 256];
        for (i, &sample) in page.iter().enumerate() {
            let slot = (pos as usize + i) % FILTER_WINDOW;
            acc += u32::from(sample);
            acc -= u32::from(history[slot]);
            history[slot] = sample;

            let absolute = pos + i as u64;
            if absolute >= FILTER_MARGIN as u64 {
                let value = (acc >> FILTER_SHIFT) as u8;
                let at = ((absolute - FILTER_MARGIN as u64) % shared.ring_len as u64) as usize;
                // SAFETY: filtered positions >= produced - FILTER_MARGIN are
                // producer-owned; the consumer stops FILTER_MARGIN bytes
                // short of the publish point. Raw pointer write, no &mut
                // over the buffer the consumer is copying from.
                unsafe {
                    (*shared.filtered.get()).as_mut_ptr().add(at).write(value);
                }
                histogram[usize::from(value)] += 1;
            }
        }

        shared
            .cutoff
            .store(u32::from(auto_cutoff(&histogram, page_size)), Ordering::Relaxed);

        pos += page_size as u64;
        shared.produced.store(pos, Ordering::Release);
    }
}

/// Percentile-midpoint cutoff: bin `a` where the cumulative count first
/// exceeds 1/16 of the page, bin `b` where it first exceeds 15/16, result
/// `(a + b) / 2` with integer floor.
fn auto_cutoff(histogram: &[u32; 256], page_size: usize) -> u8 {
    let low_mark = (page_size / 16) as u32;
    let high_mark = (page_size * 15 / 16) as u32;
    let mut cumulative = 0u32;
    let mut a: u32 = 255;
    let mut b: u32 = 255;
    let mut a_found = false;
    for (bin, &count) in histogram.iter().enumerate() {
        cumulative += count;
        if !a_found && cumulative > low_mark {
            a = bin as u32;
            a_found = true;
        }
        if cumulative > high_mark {
            b = bin as u32;
            break;
        }
    }
    ((a + b) / 2) as u8
}
