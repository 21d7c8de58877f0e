//! Built-in elements.
//!
//! - [`WaveSrc`] - tone/noise generator pulled by the scheduler
//! - [`Reframe`] - fixed-size re-chunking
//! - [`Splitter`] - zero-copy fan-out
//! - [`CaptureSink`] - records frames for inspection
//! - [`DeviceSink`] / [`DeviceSource`] - DMA hardware with async bring-up

mod capture;
mod device;
mod reframe;
mod splitter;
mod wave_src;

pub use capture::{Capture, CaptureSink};
pub use device::{AudioDevice, DeviceSink, DeviceSource, DmaFeed};
pub use reframe::Reframe;
pub use splitter::Splitter;
pub use wave_src::{WaveSrc, Waveform};
