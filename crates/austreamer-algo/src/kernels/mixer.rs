//! Four-input mixer with Q1.14 gains.

use austreamer_config::{AlgoKind, MixerParams, ParamBlock, q14_to_linear};
use austreamer_core::StreamFormat;

use crate::kernel::AlgoKernel;

/// Sums tone, speech, music and record inputs, in that pad order. Shorter
/// or missing inputs contribute silence past their end.
#[derive(Default)]
pub struct Mixer {
    gains: [f32; 4],
}

impl Mixer {
    /// Mixer with unity gains.
    pub fn new() -> Self {
        let mut m = Self::default();
        m.set(&MixerParams::default());
        m
    }

    fn set(&mut self, p: &MixerParams) {
        self.gains = p.gains().map(q14_to_linear);
    }
}

impl AlgoKernel for Mixer {
    fn kind(&self) -> AlgoKind {
        AlgoKind::Mixer
    }

    fn inputs(&self) -> usize {
        4
    }

    fn get_config(&mut self, params: &ParamBlock) -> bool {
        let ParamBlock::Mixer(p) = params else {
            return false;
        };
        self.set(p);
        true
    }

    fn init_algo(&mut self, _format: &StreamFormat) -> bool {
        true
    }

    fn algo_process(&mut self, inputs: &[&[f32]], output: &mut Vec<f32>) {
        let len = inputs.iter().map(|i| i.len()).max().unwrap_or(0);
        output.resize(len, 0.0);
        for (input, g) in inputs.iter().zip(self.gains) {
            for (o, s) in output.iter_mut().zip(input.iter()) {
                *o += s * g;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use austreamer_config::Q14_ONE;

    #[test]
    fn weighted_sum_with_ragged_inputs() {
        let mut m = Mixer::new();
        assert!(m.get_config(&ParamBlock::Mixer(MixerParams {
            tone: Q14_ONE / 2,
            speech: Q14_ONE,
            music: 0,
            record: Q14_ONE * 2,
        })));
        let mut out = Vec::new();
        m.algo_process(&[&[0.5, 0.5], &[0.25], &[1.0, 1.0], &[]], &mut out);
        assert_eq!(out, vec![0.5, 0.25]);
    }
}
