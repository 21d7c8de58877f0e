//! Periodic "need data" tick generator.
//!
//! The scheduler turns the stream format into a processing interval and
//! decides, per timer expiry, whether the pipeline should pull its sources.
//! It only ticks between `PauseToPlay` and `PlayToPause`. After each start
//! the first `frames_to_stable` expiries are swallowed to let hardware
//! clocks settle.
//!
//! The scheduler does not own a timer. A host drives it either by calling
//! [`Scheduler::on_timer`] from its own periodic callback, or by feeding
//! elapsed wall-clock time to [`Scheduler::advance`].

use std::time::Duration;

use crate::format::{BYTES_PER_SAMPLE, StreamFormat};
use crate::state::Transition;

/// Tick generator for one pipeline.
#[derive(Debug, Clone)]
pub struct Scheduler {
    format: StreamFormat,
    samples_per_tick: u32,
    frames_to_stable: u32,
    skip_left: u32,
    running: bool,
    carry: Duration,
    ticks: u64,
}

impl Scheduler {
    /// One tick per frame of `format`.
    pub fn new(format: StreamFormat) -> Self {
        Self {
            format,
            samples_per_tick: format.frame_samples,
            frames_to_stable: 0,
            skip_left: 0,
            running: false,
            carry: Duration::ZERO,
            ticks: 0,
        }
    }

    /// Overrides the per-channel sample count consumed per tick.
    #[must_use]
    pub fn with_samples_per_tick(mut self, samples: u32) -> Self {
        self.samples_per_tick = samples;
        self
    }

    /// Sets the per-channel sample count consumed per tick.
    pub fn set_samples_per_tick(&mut self, samples: u32) {
        self.samples_per_tick = samples;
    }

    /// Sets how many expiries to swallow after each start.
    pub fn set_frames_to_stable(&mut self, frames: u32) {
        self.frames_to_stable = frames;
    }

    /// Expiries swallowed after each start.
    pub fn frames_to_stable(&self) -> u32 {
        self.frames_to_stable
    }

    /// Time between ticks.
    pub fn interval(&self) -> Duration {
        if self.format.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(
            u64::from(self.samples_per_tick) * 1_000_000_000 / u64::from(self.format.sample_rate),
        )
    }

    /// Bytes the sources produce per tick across all channels.
    pub fn bytes_per_tick(&self) -> usize {
        self.samples_per_tick as usize * usize::from(self.format.channels) * BYTES_PER_SAMPLE
    }

    /// Whether ticks are being produced.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Ticks emitted since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Starts ticking; re-arms the stabilisation counter.
    pub fn start(&mut self) {
        if !self.running {
            self.running = true;
            self.skip_left = self.frames_to_stable;
            self.carry = Duration::ZERO;
            tracing::debug!("scheduler_start: interval {:?}", self.interval());
        }
    }

    /// Stops ticking.
    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            tracing::debug!("scheduler_stop: {} ticks", self.ticks);
        }
    }

    /// Mirrors the pipeline lifecycle: runs in Play only.
    pub fn change_state(&mut self, transition: Transition) {
        match transition {
            Transition::PauseToPlay => self.start(),
            Transition::PlayToPause => self.stop(),
            _ => {}
        }
    }

    /// Handles one timer expiry; `true` when sources should be pulled.
    pub fn on_timer(&mut self) -> bool {
        if !self.running {
            return false;
        }
        if self.skip_left > 0 {
            self.skip_left -= 1;
            return false;
        }
        self.ticks += 1;
        true
    }

    /// Feeds elapsed time; returns how many ticks are due.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        let interval = self.interval();
        if !self.running || interval.is_zero() {
            return 0;
        }
        self.carry += elapsed;
        let mut due = 0;
        while self.carry >= interval {
            self.carry -= interval;
            if self.on_timer() {
                due += 1;
            }
        }
        due
    }
}
