//! Dynamic range compressor with noise gate.
//!
//! ```text
//! level < noise_gate          → muted
//! noise_gate ≤ level ≤ knee   → unity
//! level > knee                → reduced by (level - knee) × slope%
//! ```

use austreamer_config::{AlgoKind, DrcParams, ParamBlock};
use austreamer_core::StreamFormat;

use crate::dsp::{EnvelopeFollower, db_to_linear, linear_to_db};
use crate::kernel::AlgoKernel;

/// Static gain curve shared with the multiband compressor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct GainCurve {
    pub knee_db: f32,
    pub slope: f32,
    pub gate_db: Option<f32>,
}

impl GainCurve {
    /// Linear gain for an envelope level.
    pub fn gain(&self, level: f32) -> f32 {
        let db = linear_to_db(level);
        if self.gate_db.is_some_and(|gate| db < gate) {
            return 0.0;
        }
        if db <= self.knee_db {
            return 1.0;
        }
        db_to_linear(-(db - self.knee_db) * self.slope)
    }
}

/// Single-band compressor. Serves both the uplink and the downlink DRC.
pub struct Drc {
    kind: AlgoKind,
    params: DrcParams,
    sample_rate: f32,
    channels: usize,
    env: Option<EnvelopeFollower>,
}

impl Drc {
    /// Uplink compressor.
    pub fn uplink() -> Self {
        Self::with_kind(AlgoKind::UlDrc)
    }

    /// Downlink compressor.
    pub fn downlink() -> Self {
        Self::with_kind(AlgoKind::DlDrc)
    }

    fn with_kind(kind: AlgoKind) -> Self {
        Self {
            kind,
            params: DrcParams::default(),
            sample_rate: 0.0,
            channels: 1,
            env: None,
        }
    }

    fn curve(&self) -> GainCurve {
        GainCurve {
            knee_db: f32::from(self.params.knee_db),
            slope: f32::from(self.params.slope_pct.clamp(0, 100)) / 100.0,
            gate_db: Some(f32::from(self.params.noise_gate_db)),
        }
    }
}

impl AlgoKernel for Drc {
    fn kind(&self) -> AlgoKind {
        self.kind
    }

    fn get_config(&mut self, params: &ParamBlock) -> bool {
        match params {
            ParamBlock::Drc(p) if p.noise_gate_db <= p.knee_db => {
                self.params = *p;
                if let Some(env) = self.env.as_mut() {
                    env.set_times(f32::from(p.attack_ms), f32::from(p.decay_ms), self.sample_rate);
                }
                true
            }
            _ => false,
        }
    }

    fn init_algo(&mut self, format: &StreamFormat) -> bool {
        self.sample_rate = format.sample_rate as f32;
        self.channels = usize::from(format.channels.max(1));
        self.env = Some(EnvelopeFollower::new(
            f32::from(self.params.attack_ms),
            f32::from(self.params.decay_ms),
            self.sample_rate,
        ));
        true
    }

    fn deinit_algo(&mut self) {
        self.env = None;
    }

    fn algo_process(&mut self, inputs: &[&[f32]], output: &mut Vec<f32>) {
        let input = inputs[0];
        let curve = self.curve();
        let Some(env) = self.env.as_mut() else {
            output.extend_from_slice(input);
            return;
        };
        // channels are linked: one envelope over the frame peak
        for frame in input.chunks(self.channels) {
            let peak = frame.iter().fold(0.0f32, |m, s| m.max(s.abs()));
            let g = curve.gain(env.process(peak));
            output.extend(frame.iter().map(|s| s * g));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::test_util::run;

    fn drc() -> Drc {
        let mut drc = Drc::downlink();
        assert!(drc.get_config(&ParamBlock::Drc(DrcParams {
            enable: true,
            attack_ms: 1,
            decay_ms: 50,
            knee_db: -20,
            noise_gate_db: -60,
            slope_pct: 50,
        })));
        assert!(drc.init_algo(&StreamFormat::new(16_000, 1, 256)));
        drc
    }

    fn peak(x: &[f32]) -> f32 {
        x.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    #[test]
    fn curve_regions() {
        let c = GainCurve {
            knee_db: -20.0,
            slope: 0.5,
            gate_db: Some(-60.0),
        };
        assert_eq!(c.gain(db_to_linear(-70.0)), 0.0);
        assert_eq!(c.gain(db_to_linear(-30.0)), 1.0);
        assert!((linear_to_db(c.gain(db_to_linear(0.0))) + 10.0).abs() < 0.01);
    }

    #[test]
    fn loud_signal_is_compressed() {
        let mut drc = drc();
        let out = run(|i, o| drc.algo_process(&[i], o), 500.0, 1.0, 16_000.0, 256, 20);
        // 0 dB in, knee -20, half slope: about -10 dB out
        let p = peak(&out);
        assert!(p > 0.25 && p < 0.4, "{p}");
    }

    #[test]
    fn below_knee_is_untouched() {
        let mut drc = drc();
        let input = crate::kernels::test_util::sine(500.0, 0.05, 16_000.0, 0, 256);
        let mut out = Vec::new();
        for _ in 0..4 {
            out.clear();
            drc.algo_process(&[&input], &mut out);
        }
        assert!(out.iter().zip(&input).all(|(o, i)| (o - i).abs() < 1e-6));
    }

    #[test]
    fn gate_above_knee_is_refused() {
        let mut drc = Drc::uplink();
        let bad = DrcParams {
            noise_gate_db: 0,
            knee_db: -20,
            ..DrcParams::default()
        };
        assert!(!drc.get_config(&ParamBlock::Drc(bad)));
    }
}
