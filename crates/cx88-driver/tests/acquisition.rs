//! End-to-end acquisition tests with scripted sample sources.

use cx88_driver::{AcquisitionBuffer, CxError, Result, SampleSource, FILTER_WINDOW};

const HALF: usize = FILTER_WINDOW / 2;

/// Endless modular counter pattern.
struct PatternSource {
    next: u64,
}

impl SampleSource for PatternSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        for b in buf.iter_mut() {
            *b = (self.next % 251) as u8;
            self.next += 1;
        }
        Ok(buf.len())
    }
}

/// Endless constant level.
struct ConstSource(u8);

impl SampleSource for ConstSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        buf.fill(self.0);
        Ok(buf.len())
    }
}

/// Fails after a number of good pages.
struct FailingSource {
    pages_left: usize,
    short: bool,
}

impl SampleSource for FailingSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.pages_left == 0 {
            if self.short {
                return Ok(buf.len() - 1);
            }
            return Err(CxError::stream("simulated device failure"));
        }
        self.pages_left -= 1;
        buf.fill(0x30);
        Ok(buf.len())
    }
}

/// The exact integer moving average the ring maintains, recomputed
/// independently for the counter pattern.
fn expected_filtered(total: usize) -> Vec<u8> {
    let shift = FILTER_WINDOW.trailing_zeros();
    let mut acc = 0u32;
    let mut history = [0u8; FILTER_WINDOW];
    let mut out = vec![0u8; total];
    for p in 0..total + HALF {
        let sample = (p % 251) as u8;
        let slot = p % FILTER_WINDOW;
        acc += u32::from(sample);
        acc -= u32::from(history[slot]);
        history[slot] = sample;
        if p >= HALF {
            let idx = p - HALF;
            if idx < total {
                out[idx] = (acc >> shift) as u8;
            }
        }
    }
    out
}

#[test]
fn bytes_arrive_in_order_across_wraps() {
    // Small ring (4 KiB) so 8 KiB of reads forces two full wraps.
    let mut ring = AcquisitionBuffer::with_geometry(1024, 4).unwrap();
    ring.start(PatternSource { next: 0 }).unwrap();

    let total = 8192usize;
    let mut got = vec![0u8; total];
    for chunk in got.chunks_mut(512) {
        ring.read_into(chunk).unwrap();
    }
    ring.stop().unwrap();

    assert_eq!(got, expected_filtered(total), "gap or duplicate across wrap");
}

#[test]
fn constant_input_reaches_steady_state() {
    let mut ring = AcquisitionBuffer::with_geometry(1024, 8).unwrap();
    ring.start(ConstSource(0x55)).unwrap();

    let mut frame = vec![0u8; 3072];
    ring.read_into(&mut frame).unwrap();

    // Once the window is full the moving average is exactly the input.
    assert!(frame[FILTER_WINDOW..].iter().all(|&b| b == 0x55));
    // The warm-up ramp never overshoots.
    assert!(frame[..FILTER_WINDOW].iter().all(|&b| b <= 0x55));

    // At least three pages are published by now; the per-page histogram
    // collapses onto the constant.
    assert_eq!(ring.cutoff(), 0x55);

    ring.stop().unwrap();
}

#[test]
fn head_and_tail_pages_track_counters() {
    let mut ring = AcquisitionBuffer::with_geometry(1024, 4).unwrap();
    assert_eq!(ring.head_page(), 0);
    assert_eq!(ring.tail_page(), 0);

    ring.start(ConstSource(1)).unwrap();
    let mut buf = vec![0u8; 2048];
    ring.read_into(&mut buf).unwrap();
    ring.stop().unwrap();

    // 2048 consumed = 2 pages mod 4.
    assert_eq!(ring.tail_page(), 2);
    assert!(ring.head_page() < 4);
}

#[test]
fn source_error_is_fatal_and_surfaces() {
    let mut ring = AcquisitionBuffer::with_geometry(1024, 4).unwrap();
    ring.start(FailingSource {
        pages_left: 2,
        short: false,
    })
    .unwrap();

    // Two pages minus the filter margin are readable; asking for more has
    // to surface the recorded failure rather than block forever.
    let mut buf = vec![0u8; 2048];
    let err = ring.read_into(&mut buf).unwrap_err();
    assert!(matches!(err, CxError::Stream { .. }));

    let err = ring.stop().unwrap_err();
    assert!(err.to_string().contains("simulated device failure"));
    assert!(!ring.is_running());
}

#[test]
fn short_read_is_fatal() {
    let mut ring = AcquisitionBuffer::with_geometry(1024, 4).unwrap();
    ring.start(FailingSource {
        pages_left: 1,
        short: true,
    })
    .unwrap();

    // The reader hits the short read on its second page; wait for it to
    // record the failure before stopping.
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while ring.is_running() && std::time::Instant::now() < deadline {
        std::thread::sleep(std::time::Duration::from_millis(1));
    }

    let err = ring.stop().unwrap_err();
    assert!(err.to_string().contains("short read"));
}

#[test]
fn stop_joins_and_restart_begins_clean() {
    let mut ring = AcquisitionBuffer::with_geometry(1024, 4).unwrap();

    ring.start(ConstSource(0x11)).unwrap();
    let mut buf = vec![0u8; 1024];
    ring.read_into(&mut buf).unwrap();
    ring.stop().unwrap();
    assert!(!ring.is_running());
    assert!(matches!(ring.stop(), Err(CxError::InvalidState { .. })));

    // A second session starts from byte zero with fresh filter state.
    ring.start(PatternSource { next: 0 }).unwrap();
    assert!(matches!(
        ring.start(PatternSource { next: 0 }),
        Err(CxError::InvalidState { .. })
    ));
    let mut buf = vec![0u8; 2048];
    ring.read_into(&mut buf).unwrap();
    ring.stop().unwrap();
    assert_eq!(buf, expected_filtered(2048));
}
