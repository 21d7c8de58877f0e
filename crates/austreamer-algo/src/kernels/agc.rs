//! Automatic gain control.

use austreamer_config::{AgcParams, AlgoKind, ParamBlock};
use austreamer_core::StreamFormat;

use crate::dsp::{EnvelopeFollower, db_to_linear};
use crate::kernel::AlgoKernel;

const MAX_GAIN_DB: f32 = 30.0;
const MIN_GAIN_DB: f32 = -20.0;
/// Envelope below which the signal is treated as silence and the gain held.
const SILENCE: f32 = 1e-4;

/// Drives the signal envelope toward a target level.
#[derive(Default)]
pub struct Agc {
    params: AgcParams,
    sample_rate: f32,
    channels: usize,
    env: Option<EnvelopeFollower>,
    gain: f32,
}

impl Agc {
    /// AGC with factory parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gain applied to the last sample.
    pub fn gain(&self) -> f32 {
        self.gain
    }
}

impl AlgoKernel for Agc {
    fn kind(&self) -> AlgoKind {
        AlgoKind::Agc
    }

    fn get_config(&mut self, params: &ParamBlock) -> bool {
        let ParamBlock::Agc(p) = params else {
            return false;
        };
        self.params = *p;
        if let Some(env) = self.env.as_mut() {
            env.set_times(f32::from(p.attack_ms), f32::from(p.decay_ms), self.sample_rate);
        }
        true
    }

    fn init_algo(&mut self, format: &StreamFormat) -> bool {
        self.sample_rate = format.sample_rate as f32;
        self.channels = usize::from(format.channels.max(1));
        self.env = Some(EnvelopeFollower::new(
            f32::from(self.params.attack_ms),
            f32::from(self.params.decay_ms),
            self.sample_rate,
        ));
        self.gain = 1.0;
        true
    }

    fn deinit_algo(&mut self) {
        self.env = None;
    }

    fn algo_process(&mut self, inputs: &[&[f32]], output: &mut Vec<f32>) {
        let input = inputs[0];
        let Some(env) = self.env.as_mut() else {
            output.extend_from_slice(input);
            return;
        };
        let target = db_to_linear(f32::from(self.params.target_db));
        let (lo, hi) = (db_to_linear(MIN_GAIN_DB), db_to_linear(MAX_GAIN_DB));
        for frame in input.chunks(self.channels) {
            let peak = frame.iter().fold(0.0f32, |m, s| m.max(s.abs()));
            let level = env.process(peak);
            if level > SILENCE {
                self.gain = (target / level).clamp(lo, hi);
            }
            output.extend(frame.iter().map(|s| s * self.gain));
        }
    }
}
