//! Deterministic frame clock.
//!
//! Time advances in whole frames of a fixed interval. The interval is stored in
//! integer microseconds so elapsed time never drifts, and read back as
//! milliseconds for timers.

const DEFAULT_FRAME_US: u64 = 16_667;

#[derive(Debug, Clone)]
pub struct FrameClock {
    pub frame_interval_us: u64,
    elapsed_us: u64,
    pub frame_count: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_interval_us(DEFAULT_FRAME_US)
    }

    pub fn with_interval_us(frame_interval_us: u64) -> Self {
        if frame_interval_us == 0 {
            log::warn!("Frame interval of 0us requested, using {DEFAULT_FRAME_US}us");
        }
        Self {
            frame_interval_us: if frame_interval_us == 0 {
                DEFAULT_FRAME_US
            } else {
                frame_interval_us
            },
            elapsed_us: 0,
            frame_count: 0,
        }
    }

    pub fn advance(&mut self) {
        self.elapsed_us = self.elapsed_us.saturating_add(self.frame_interval_us);
        self.frame_count += 1;
    }

    /// Jump forward by an arbitrary amount without counting a frame.
    pub fn advance_ms(&mut self, ms: u64) {
        self.elapsed_us = self.elapsed_us.saturating_add(ms.saturating_mul(1000));
    }

    pub fn now_ms(&self) -> u64 {
        self.elapsed_us / 1000
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
