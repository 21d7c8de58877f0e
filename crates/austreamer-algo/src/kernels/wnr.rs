//! Wind noise reduction.
//!
//! The signal is split at the cutoff into a low band and its complement.
//! While the low band carries most of the frame energy (wind rumble) it is
//! attenuated by the configured level; otherwise the bands recombine to the
//! input.

use austreamer_config::{AlgoKind, ParamBlock, WnrParams};
use austreamer_core::StreamFormat;

use crate::dsp::{Biquad, Coefficients, db_to_linear};
use crate::kernel::AlgoKernel;

const BUTTERWORTH_Q: f32 = core::f32::consts::FRAC_1_SQRT_2;
/// Low-band share of frame energy above which wind is assumed.
const WIND_RATIO: f32 = 0.5;

/// Low-band attenuator driven by a low/total energy detector.
#[derive(Default)]
pub struct Wnr {
    params: WnrParams,
    sample_rate: f32,
    channels: usize,
    lows: Vec<Biquad>,
    low: Vec<f32>,
    gain: f32,
    wind: bool,
}

impl Wnr {
    /// Reducer with factory parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the last frame was classified as wind.
    pub fn wind_detected(&self) -> bool {
        self.wind
    }

    fn design(&mut self) {
        let c = Coefficients::lowpass(f32::from(self.params.cutoff_hz), BUTTERWORTH_Q, self.sample_rate);
        for f in &mut self.lows {
            f.set(c);
        }
    }
}

impl AlgoKernel for Wnr {
    fn kind(&self) -> AlgoKind {
        AlgoKind::Wnr
    }

    fn get_config(&mut self, params: &ParamBlock) -> bool {
        match params {
            ParamBlock::Wnr(p) if !p.enable || p.cutoff_hz > 0 => {
                self.params = *p;
                if !self.lows.is_empty() {
                    self.design();
                }
                true
            }
            _ => false,
        }
    }

    fn init_algo(&mut self, format: &StreamFormat) -> bool {
        self.sample_rate = format.sample_rate as f32;
        self.channels = usize::from(format.channels.max(1));
        self.lows = vec![Biquad::default(); self.channels];
        self.design();
        self.gain = 1.0;
        self.wind = false;
        true
    }

    fn deinit_algo(&mut self) {
        self.lows = Vec::new();
        self.low = Vec::new();
    }

    fn algo_process(&mut self, inputs: &[&[f32]], output: &mut Vec<f32>) {
        let input = inputs[0];
        self.low.clear();
        let (mut low_energy, mut total) = (0.0f32, 0.0f32);
        for (n, &s) in input.iter().enumerate() {
            let l = self.lows[n % self.channels].process(s);
            self.low.push(l);
            low_energy += l * l;
            total += s * s;
        }
        self.wind = total > 0.0 && low_energy > WIND_RATIO * total;
        let target = if self.wind {
            db_to_linear(-f32::from(self.params.level_db))
        } else {
            1.0
        };
        let start = self.gain;
        let frames = (input.len() / self.channels).max(1) as f32;
        for (n, (&s, &l)) in input.iter().zip(&self.low).enumerate() {
            let g = start + (target - start) * ((n / self.channels) + 1) as f32 / frames;
            output.push(s - l + l * g);
        }
        self.gain = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::rms;
    use crate::kernels::test_util::{run, sine};

    fn wnr() -> Wnr {
        let mut wnr = Wnr::new();
        assert!(wnr.get_config(&ParamBlock::Wnr(WnrParams {
            enable: true,
            cutoff_hz: 200,
            level_db: 20,
        })));
        assert!(wnr.init_algo(&StreamFormat::new(16_000, 1, 256)));
        wnr
    }

    #[test]
    fn rumble_is_attenuated() {
        let mut wnr = wnr();
        let out = run(|i, o| wnr.algo_process(&[i], o), 40.0, 0.5, 16_000.0, 256, 40);
        let last = sine(40.0, 0.5, 16_000.0, 39 * 256, 256);
        assert!(wnr.wind_detected());
        assert!(rms(&out) < 0.5 * rms(&last), "{}", rms(&out));
    }

    #[test]
    fn voice_band_is_kept() {
        let mut wnr = wnr();
        let out = run(|i, o| wnr.algo_process(&[i], o), 1000.0, 0.5, 16_000.0, 256, 40);
        assert!(!wnr.wind_detected());
        assert!((rms(&out) - 0.5 * core::f32::consts::FRAC_1_SQRT_2).abs() < 0.01);
    }
}
