//! Acoustic echo canceller: NLMS adaptive filter plus residual suppression.

use austreamer_config::{AecParams, AlgoKind, ParamBlock};
use austreamer_core::StreamFormat;

use crate::dsp::{EnvelopeFollower, db_to_linear};
use crate::kernel::AlgoKernel;

const STEP: f32 = 0.5;
const REGULARISATION: f32 = 1e-3;
const FAR_ACTIVE: f32 = 1e-3;

/// Echo canceller. Input 0 is the microphone, input 1 the far-end signal
/// played on the speaker. Mono only.
#[derive(Default)]
pub struct Aec {
    params: AecParams,
    weights: Vec<f32>,
    line: Vec<f32>,
    pos: usize,
    far_env: Option<EnvelopeFollower>,
    mic_env: Option<EnvelopeFollower>,
    res_env: Option<EnvelopeFollower>,
    nlp_gain: f32,
}

impl Aec {
    /// Canceller with factory parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current filter taps.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    fn reference(&self, k: usize) -> f32 {
        let len = self.line.len();
        let delay = usize::from(self.params.fixed_delay);
        self.line[(self.pos + len - ((delay + k) % len)) % len]
    }
}

impl AlgoKernel for Aec {
    fn kind(&self) -> AlgoKind {
        AlgoKind::Aec
    }

    fn inputs(&self) -> usize {
        2
    }

    fn get_config(&mut self, params: &ParamBlock) -> bool {
        match params {
            ParamBlock::Aec(p) if !p.enable || p.filter_len > 0 => {
                self.params = *p;
                true
            }
            _ => false,
        }
    }

    fn apply_params(&mut self, params: &ParamBlock) -> bool {
        // the delay line is sized at init; only NLP settings change live
        match params {
            ParamBlock::Aec(p)
                if p.filter_len == self.params.filter_len && p.fixed_delay == self.params.fixed_delay =>
            {
                self.params = *p;
                true
            }
            _ => false,
        }
    }

    fn init_algo(&mut self, format: &StreamFormat) -> bool {
        if format.channels != 1 {
            return false;
        }
        let taps = usize::from(self.params.filter_len.max(1));
        let sr = format.sample_rate as f32;
        self.weights = vec![0.0; taps];
        self.line = vec![0.0; taps + usize::from(self.params.fixed_delay)];
        self.pos = 0;
        self.far_env = Some(EnvelopeFollower::new(1.0, 150.0, sr));
        self.mic_env = Some(EnvelopeFollower::new(1.0, 150.0, sr));
        self.res_env = Some(EnvelopeFollower::new(1.0, 150.0, sr));
        self.nlp_gain = 1.0;
        true
    }

    fn deinit_algo(&mut self) {
        self.weights = Vec::new();
        self.line = Vec::new();
        self.far_env = None;
        self.mic_env = None;
        self.res_env = None;
    }

    fn algo_process(&mut self, inputs: &[&[f32]], output: &mut Vec<f32>) {
        let mic = inputs[0];
        let far = inputs.get(1).copied().unwrap_or(&[]);
        if self.line.is_empty() {
            output.extend_from_slice(mic);
            return;
        }
        let suppression = db_to_linear(-f32::from(self.params.nlp_level));
        for (n, &m) in mic.iter().enumerate() {
            let x = far.get(n).copied().unwrap_or(0.0);
            self.pos = (self.pos + 1) % self.line.len();
            self.line[self.pos] = x;

            let mut estimate = 0.0;
            let mut energy = REGULARISATION;
            for k in 0..self.weights.len() {
                let r = self.reference(k);
                estimate += self.weights[k] * r;
                energy += r * r;
            }
            let residual = m - estimate;
            let mu = STEP * residual / energy;
            for k in 0..self.weights.len() {
                let r = self.reference(k);
                self.weights[k] += mu * r;
            }

            let (Some(far_env), Some(mic_env), Some(res_env)) =
                (self.far_env.as_mut(), self.mic_env.as_mut(), self.res_env.as_mut())
            else {
                output.push(residual);
                continue;
            };
            let far_level = far_env.process(x);
            let mic_level = mic_env.process(m);
            let res_level = res_env.process(residual);
            // echo-only: far end talking and the filter removed most of the mic
            let target = if self.params.nlp_enable && far_level > FAR_ACTIVE && res_level < 0.5 * mic_level {
                suppression
            } else {
                1.0
            };
            self.nlp_gain += 0.01 * (target - self.nlp_gain);
            output.push(residual * self.nlp_gain);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::rms;

    fn configured(filter_len: u16, fixed_delay: u16) -> Aec {
        let mut aec = Aec::new();
        assert!(aec.get_config(&ParamBlock::Aec(AecParams {
            enable: true,
            filter_len,
            fixed_delay,
            nlp_enable: false,
            nlp_level: 0,
        })));
        assert!(aec.init_algo(&StreamFormat::new(16_000, 1, 160)));
        aec
    }

    fn noise(seed: &mut u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|_| {
                *seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (*seed >> 8) as f32 / (1u32 << 24) as f32 - 0.5
            })
            .collect()
    }

    #[test]
    fn converges_on_delayed_echo() {
        let mut aec = configured(32, 4);
        let mut seed = 1;
        let mut history = vec![0.0f32; 10];
        let mut out = Vec::new();
        let mut last_ratio = 1.0;
        for _ in 0..200 {
            let far = noise(&mut seed, 160);
            // echo path: 0.6 gain, 7 samples total delay
            history.extend_from_slice(&far);
            let start = history.len() - 160 - 7;
            let mic: Vec<f32> = history[start..start + 160].iter().map(|s| s * 0.6).collect();
            history.drain(..history.len() - 16);
            out.clear();
            aec.algo_process(&[&mic, &far], &mut out);
            last_ratio = rms(&out) / rms(&mic);
        }
        assert!(last_ratio < 0.05, "residual ratio {last_ratio}");
    }

    #[test]
    fn silent_reference_leaves_mic_untouched() {
        let mut aec = configured(16, 0);
        let mic = vec![0.25; 160];
        let mut out = Vec::new();
        aec.algo_process(&[&mic, &[]], &mut out);
        assert_eq!(out, mic);
    }

    #[test]
    fn stereo_is_refused() {
        let mut aec = Aec::new();
        assert!(aec.get_config(&ParamBlock::default_for(AlgoKind::Aec)));
        assert!(!aec.init_algo(&StreamFormat::new(16_000, 2, 160)));
    }

    #[test]
    fn live_update_cannot_resize() {
        let mut aec = configured(16, 0);
        let bigger = AecParams {
            enable: true,
            filter_len: 64,
            fixed_delay: 0,
            nlp_enable: true,
            nlp_level: 10,
        };
        assert!(!aec.apply_params(&ParamBlock::Aec(bigger)));
        assert!(aec.apply_params(&ParamBlock::Aec(AecParams { filter_len: 16, ..bigger })));
    }
}
