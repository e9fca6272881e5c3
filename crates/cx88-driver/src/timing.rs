//! Video timing model: sample rate vs refresh vs line count.
//!
//! The sample clock and the display refresh are not integer multiples of
//! each other (NTSC refresh is 29.97 Hz), so the samples-per-frame figure
//! has a fractional remainder. The remainder is carried across frames and
//! consumed as whole extra samples, so the long-run average rate is exact by
//! construction.

/// Derived frame/line sample geometry for one video standard.
#[derive(Debug, Clone)]
pub struct TimingModel {
    sample_rate: u32,
    refresh: f64,
    lines: u32,
    samples_per_line: u32,
    samples_per_frame: u32,
    frac: f64,
    carry: f64,
}

impl TimingModel {
    /// Derive timings for `sample_rate` Hz at `refresh` Hz over `lines`
    /// lines per frame.
    #[must_use]
    pub fn new(sample_rate: u32, refresh: f64, lines: u32) -> Self {
        let mut model = Self {
            sample_rate,
            refresh,
            lines,
            samples_per_line: 0,
            samples_per_frame: 0,
            frac: 0.0,
            carry: 0.0,
        };
        model.recompute(sample_rate, refresh, lines);
        model
    }

    /// PAL: 25 Hz, 625 lines.
    #[must_use]
    pub fn pal(sample_rate: u32) -> Self {
        Self::new(sample_rate, 25.0, 625)
    }

    /// NTSC: 29.97 Hz, 525 lines.
    #[must_use]
    pub fn ntsc(sample_rate: u32) -> Self {
        Self::new(sample_rate, 29.97, 525)
    }

    /// Recompute all derived figures. Resets the fractional carry.
    pub fn recompute(&mut self, sample_rate: u32, refresh: f64, lines: u32) {
        let per_frame = f64::from(sample_rate) / refresh;
        self.sample_rate = sample_rate;
        self.refresh = refresh;
        self.lines = lines;
        self.samples_per_line = (per_frame / f64::from(lines)).round() as u32;
        self.samples_per_frame = per_frame.floor() as u32;
        self.frac = per_frame - f64::from(self.samples_per_frame);
        self.carry = 0.0;

        tracing::debug!(
            "Timing: {} Hz / {} Hz / {} lines -> {} per line, {} per frame + {:.4}",
            sample_rate,
            refresh,
            lines,
            self.samples_per_line,
            self.samples_per_frame,
            self.frac
        );
    }

    /// Switch standard in place, keeping the sample rate.
    pub fn set_standard(&mut self, refresh: f64, lines: u32) {
        self.recompute(self.sample_rate, refresh, lines);
    }

    /// Sample clock in Hz.
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Lines per frame.
    #[must_use]
    pub const fn lines(&self) -> u32 {
        self.lines
    }

    /// Samples per line, rounded to nearest.
    #[must_use]
    pub const fn samples_per_line(&self) -> u32 {
        self.samples_per_line
    }

    /// Whole samples per frame (floor).
    #[must_use]
    pub const fn samples_per_frame(&self) -> u32 {
        self.samples_per_frame
    }

    /// Fractional samples per frame carried between frames.
    #[must_use]
    pub const fn frac(&self) -> f64 {
        self.frac
    }

    /// Accumulate the fractional remainder and return the whole extra
    /// samples to consume this frame. Call once per frame.
    pub fn next_frame_extra(&mut self) -> u32 {
        self.carry += self.frac;
        let extra = self.carry.floor();
        self.carry -= extra;
        extra as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XTAL: u32 = 28_636_363;

    #[test]
    fn pal_geometry() {
        let model = TimingModel::pal(XTAL);
        // 28636363 / (25 * 625) = 1832.73 -> 1833
        assert_eq!(model.samples_per_line(), 1833);
        // floor(28636363 / 25) = floor(1145454.52)
        assert_eq!(model.samples_per_frame(), 1_145_454);
        assert!((model.frac() - 0.52).abs() < 1e-6);
    }

    #[test]
    fn integer_ratio_has_no_carry() {
        // 28636363 / (30 * 525) = 1818.18 -> 1818 per line
        let mut model = TimingModel::new(XTAL, 30.0, 525);
        assert_eq!(model.samples_per_line(), 1818);

        let mut exact = TimingModel::new(1_000_000, 25.0, 625);
        assert_eq!(exact.samples_per_frame(), 40_000);
        for _ in 0..1000 {
            assert_eq!(exact.next_frame_extra(), 0);
        }
        // Non-integer ratios do produce extras.
        let total: u32 = (0..100).map(|_| model.next_frame_extra()).sum();
        assert!(total > 0);
    }

    #[test]
    fn carry_never_drifts() {
        let mut model = TimingModel::ntsc(XTAL);
        let frames: u64 = 10_000;
        let mut consumed: u64 = 0;
        for _ in 0..frames {
            consumed += u64::from(model.samples_per_frame());
            consumed += u64::from(model.next_frame_extra());
        }
        let ideal = f64::from(XTAL) / 29.97 * frames as f64;
        // Cumulative error stays below one sample; the carry is exact.
        assert!((consumed as f64 - ideal).abs() < 1.0);
    }

    #[test]
    fn extra_sample_cadence() {
        let mut model = TimingModel::pal(XTAL);
        // frac = 0.52: two consecutive frames yield one extra sample each
        // roughly every other frame, never two at once.
        let extras: Vec<u32> = (0..10).map(|_| model.next_frame_extra()).collect();
        assert_eq!(extras.iter().sum::<u32>(), 5);
        assert!(extras.iter().all(|&e| e <= 1));
    }

    #[test]
    fn set_standard_recomputes() {
        let mut model = TimingModel::pal(XTAL);
        model.next_frame_extra();
        model.set_standard(29.97, 525);
        assert_eq!(model.lines(), 525);
        assert_eq!(
            model.samples_per_frame(),
            (f64::from(XTAL) / 29.97).floor() as u32
        );
    }
}
