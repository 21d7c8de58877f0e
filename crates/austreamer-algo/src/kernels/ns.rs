//! Noise suppressor: frame-level downward expander over a tracked noise
//! floor.
//!
//! The floor follows the quietest recent frames: it drops immediately to a
//! quieter frame and creeps up slowly otherwise. Frames within 6 dB of the
//! floor are attenuated by the configured level; gain changes are ramped
//! across the frame.

use austreamer_config::{AlgoKind, NsParams, ParamBlock};
use austreamer_core::StreamFormat;

use crate::dsp::{db_to_linear, rms};
use crate::kernel::AlgoKernel;

/// Per-frame floor rise.
const FLOOR_RISE: f32 = 1.002;
/// Frames above `floor × MARGIN` count as signal.
const MARGIN: f32 = 2.0;

/// Attenuates frames that sit at the noise floor.
#[derive(Default)]
pub struct Ns {
    params: NsParams,
    floor: Option<f32>,
    gain: f32,
}

impl Ns {
    /// Suppressor with factory parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current noise floor estimate.
    pub fn floor(&self) -> Option<f32> {
        self.floor
    }
}

impl AlgoKernel for Ns {
    fn kind(&self) -> AlgoKind {
        AlgoKind::Ns
    }

    fn get_config(&mut self, params: &ParamBlock) -> bool {
        let ParamBlock::Ns(p) = params else {
            return false;
        };
        self.params = *p;
        true
    }

    fn init_algo(&mut self, _format: &StreamFormat) -> bool {
        self.floor = None;
        self.gain = 1.0;
        true
    }

    fn algo_process(&mut self, inputs: &[&[f32]], output: &mut Vec<f32>) {
        let input = inputs[0];
        let level = rms(input);
        let floor = match self.floor {
            Some(f) if level < f => level,
            Some(f) => f * FLOOR_RISE,
            None => level,
        };
        self.floor = Some(floor);

        let target = if level <= floor * MARGIN {
            db_to_linear(-f32::from(self.params.level_db))
        } else {
            1.0
        };
        let start = self.gain;
        let step = (target - start) / input.len().max(1) as f32;
        output.extend(
            input
                .iter()
                .enumerate()
                .map(|(n, s)| s * (start + step * (n + 1) as f32)),
        );
        self.gain = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::test_util::sine;

    fn ns() -> Ns {
        let mut ns = Ns::new();
        assert!(ns.get_config(&ParamBlock::Ns(NsParams {
            enable: true,
            level_db: 20,
        })));
        assert!(ns.init_algo(&StreamFormat::default()));
        ns
    }

    #[test]
    fn steady_hiss_is_attenuated() {
        let mut ns = ns();
        let mut out = Vec::new();
        for i in 0..20 {
            out.clear();
            let hiss = sine(3000.0, 0.01, 16_000.0, i * 256, 256);
            ns.algo_process(&[&hiss], &mut out);
        }
        assert!(rms(&out) < 0.01 * 0.71 * 0.2, "{}", rms(&out));
    }

    #[test]
    fn speech_above_floor_passes() {
        let mut ns = ns();
        let mut out = Vec::new();
        for i in 0..10 {
            out.clear();
            ns.algo_process(&[&sine(3000.0, 0.01, 16_000.0, i * 256, 256)], &mut out);
        }
        for i in 10..12 {
            out.clear();
            ns.algo_process(&[&sine(300.0, 0.5, 16_000.0, i * 256, 256)], &mut out);
        }
        let expected = rms(&sine(300.0, 0.5, 16_000.0, 11 * 256, 256));
        assert!((rms(&out) - expected).abs() < 1e-3);
        assert!(ns.floor().unwrap() < 0.01);
    }
}
