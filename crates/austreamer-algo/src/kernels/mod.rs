//! Signal processing kernels, one per [`AlgoKind`](austreamer_config::AlgoKind).
//!
//! | Kernel | Kinds | Inputs |
//! |--------|-------|--------|
//! | [`Aec`] | UL AEC | mic, far-end reference |
//! | [`Agc`] | UL AGC | 1 |
//! | [`Ns`] | UL NS | 1 |
//! | [`Wnr`] | UL WNR | 1 |
//! | [`Vad`] | UL VAD | 1 (pass-through, publishes voice state) |
//! | [`Peq`] | UL/DL PEQ | 1 |
//! | [`Drc`] | UL/DL DRC | 1 |
//! | [`Mbdrc`] | DL MBDRC | 1 |
//! | [`Gain`] | DL gain | 1 |
//! | [`Mixer`] | DL mixer | tone, speech, music, record |
//! | [`Resample`] | resampler | 1 |
//!
//! Every kernel works on interleaved samples and keeps separate filter
//! state per channel where it filters.

mod aec;
mod agc;
mod drc;
mod gain;
mod mbdrc;
mod mixer;
mod ns;
mod peq;
mod resample;
mod vad;
mod wnr;

pub use aec::Aec;
pub use agc::Agc;
pub use drc::Drc;
pub use gain::Gain;
pub use mbdrc::Mbdrc;
pub use mixer::Mixer;
pub use ns::Ns;
pub use peq::Peq;
pub use resample::Resample;
pub use vad::Vad;
pub use wnr::Wnr;
