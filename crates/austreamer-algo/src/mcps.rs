//! Load measurement around kernel calls.
//!
//! The meter times every `algo_process` call and converts the average busy
//! time per frame into millions of cycles per second at a nominal core
//! clock:
//!
//! ```text
//! MCPS = busy_per_frame / frame_period × clock_MHz
//! ```

use std::time::{Duration, Instant};

/// Nominal core clock used when none is configured.
pub const DEFAULT_CLOCK_MHZ: u32 = 96;

/// Accumulates kernel busy time between reports.
#[derive(Debug, Clone)]
pub struct McpsMeter {
    clock_mhz: u32,
    frame_micros: u64,
    busy: Duration,
    frames: u64,
}

impl Default for McpsMeter {
    fn default() -> Self {
        Self::new(DEFAULT_CLOCK_MHZ)
    }
}

impl McpsMeter {
    /// Meter for a core running at `clock_mhz`.
    pub fn new(clock_mhz: u32) -> Self {
        Self {
            clock_mhz,
            frame_micros: 0,
            busy: Duration::ZERO,
            frames: 0,
        }
    }

    /// Sets the real-time period of one frame.
    pub fn set_frame_micros(&mut self, micros: u64) {
        self.frame_micros = micros;
    }

    /// Runs `f`, charging its duration to the current window.
    pub fn measure<R>(&mut self, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let r = f();
        self.record(start.elapsed());
        r
    }

    /// Charges one frame of `busy` time.
    pub fn record(&mut self, busy: Duration) {
        self.busy += busy;
        self.frames += 1;
    }

    /// Frames measured in the current window.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Load of the current window in thousandths of MCPS.
    pub fn milli_mcps(&self) -> u32 {
        let period_ns = u128::from(self.frames) * u128::from(self.frame_micros) * 1000;
        if period_ns == 0 {
            return 0;
        }
        let load = self.busy.as_nanos() * u128::from(self.clock_mhz) * 1000 / period_ns;
        u32::try_from(load).unwrap_or(u32::MAX)
    }

    /// Reads the current window and starts a new one.
    pub fn take(&mut self) -> u32 {
        let load = self.milli_mcps();
        self.busy = Duration::ZERO;
        self.frames = 0;
        load
    }
}
