//! Multiband compressor.
//!
//! Band edges split the signal with complementary low-pass stages:
//!
//! ```text
//! band0 = lp(edge0)(x)          rest0 = x - band0
//! band1 = lp(edge1)(rest0)      rest1 = rest0 - band1
//! ...
//! out   = Σ compress_i(band_i) + rest_last
//! ```
//!
//! Bands sum back to the input exactly when nothing is compressed.

use austreamer_config::{AlgoKind, MbdrcBand, MbdrcParams, ParamBlock};
use austreamer_core::StreamFormat;

use super::drc::GainCurve;
use crate::dsp::{Biquad, Coefficients, EnvelopeFollower};
use crate::kernel::AlgoKernel;

const ATTACK_MS: f32 = 5.0;
const RELEASE_MS: f32 = 100.0;

struct Band {
    curve: GainCurve,
    /// one splitter per channel
    split: Vec<Biquad>,
    env: EnvelopeFollower,
}

/// Compressor with up to three independently compressed bands.
#[derive(Default)]
pub struct Mbdrc {
    params: MbdrcParams,
    sample_rate: f32,
    channels: usize,
    bands: Vec<Band>,
    mixed: Vec<f32>,
    lows: Vec<f32>,
}

impl Mbdrc {
    /// Compressor with factory parameters.
    pub fn new() -> Self {
        Self::default()
    }

    fn band(&self, b: &MbdrcBand) -> Band {
        let c = Coefficients::lowpass(f32::from(b.bound_hz), core::f32::consts::FRAC_1_SQRT_2, self.sample_rate);
        Band {
            curve: GainCurve {
                knee_db: f32::from(b.threshold_db),
                slope: f32::from(b.slope_pct.min(100)) / 100.0,
                gate_db: None,
            },
            split: vec![Biquad::new(c); self.channels],
            env: EnvelopeFollower::new(ATTACK_MS, RELEASE_MS, self.sample_rate),
        }
    }
}

impl AlgoKernel for Mbdrc {
    fn kind(&self) -> AlgoKind {
        AlgoKind::Mbdrc
    }

    fn get_config(&mut self, params: &ParamBlock) -> bool {
        let ParamBlock::Mbdrc(p) = params else {
            return false;
        };
        if p.bands.windows(2).any(|w| w[0].bound_hz >= w[1].bound_hz) {
            return false;
        }
        self.params = p.clone();
        if self.sample_rate > 0.0 {
            self.bands = self.params.bands.iter().map(|b| self.band(b)).collect();
        }
        true
    }

    fn init_algo(&mut self, format: &StreamFormat) -> bool {
        self.sample_rate = format.sample_rate as f32;
        self.channels = usize::from(format.channels.max(1));
        if self
            .params
            .bands
            .iter()
            .any(|b| f32::from(b.bound_hz) >= self.sample_rate / 2.0)
        {
            return false;
        }
        self.bands = self.params.bands.iter().map(|b| self.band(b)).collect();
        true
    }

    fn deinit_algo(&mut self) {
        self.bands = Vec::new();
        self.mixed = Vec::new();
        self.lows = Vec::new();
    }

    fn algo_process(&mut self, inputs: &[&[f32]], output: &mut Vec<f32>) {
        // output carries the remainder, mixed the compressed bands
        output.extend_from_slice(inputs[0]);
        self.mixed.clear();
        self.mixed.resize(output.len(), 0.0);
        self.lows.resize(self.channels, 0.0);
        let channels = self.channels;
        for band in &mut self.bands {
            for (frame, acc) in output.chunks_mut(channels).zip(self.mixed.chunks_mut(channels)) {
                let mut peak = 0.0f32;
                for (ch, s) in frame.iter_mut().enumerate() {
                    let low = band.split[ch].process(*s);
                    *s -= low;
                    self.lows[ch] = low;
                    peak = peak.max(low.abs());
                }
                let g = band.curve.gain(band.env.process(peak));
                for (a, low) in acc.iter_mut().zip(&self.lows) {
                    *a += low * g;
                }
            }
        }
        for (o, m) in output.iter_mut().zip(&self.mixed) {
            *o += m;
        }
    }
}
