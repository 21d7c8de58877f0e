//! Parametric equaliser: cascade of peaking sections.

use austreamer_config::{AlgoKind, EqBand, ParamBlock, PeqParams};
use austreamer_core::StreamFormat;

use crate::dsp::{Biquad, Coefficients};
use crate::kernel::AlgoKernel;

/// Up to three peaking bands per channel. Serves both the uplink and the
/// downlink EQ.
pub struct Peq {
    kind: AlgoKind,
    params: PeqParams,
    sample_rate: f32,
    channels: usize,
    /// `sections[band][channel]`
    sections: Vec<Vec<Biquad>>,
}

impl Peq {
    /// Uplink EQ.
    pub fn uplink() -> Self {
        Self::with_kind(AlgoKind::UlPeq)
    }

    /// Downlink EQ.
    pub fn downlink() -> Self {
        Self::with_kind(AlgoKind::DlPeq)
    }

    fn with_kind(kind: AlgoKind) -> Self {
        Self {
            kind,
            params: PeqParams::default(),
            sample_rate: 0.0,
            channels: 1,
            sections: Vec::new(),
        }
    }

    fn coefficients(&self, band: &EqBand) -> Coefficients {
        Coefficients::peaking(
            f32::from(band.freq_hz),
            f32::from(band.q_tenths) / 10.0,
            f32::from(band.gain_db),
            self.sample_rate,
        )
    }

    fn design(&mut self) {
        // flat bands cost nothing
        let active: Vec<Coefficients> = self
            .params
            .bands
            .iter()
            .filter(|b| b.gain_db != 0)
            .map(|b| self.coefficients(b))
            .collect();
        self.sections.resize_with(active.len(), Vec::new);
        for (band, c) in self.sections.iter_mut().zip(active) {
            band.resize_with(self.channels, Biquad::default);
            for f in band.iter_mut() {
                f.set(c);
            }
        }
    }
}

impl AlgoKernel for Peq {
    fn kind(&self) -> AlgoKind {
        self.kind
    }

    fn get_config(&mut self, params: &ParamBlock) -> bool {
        let ParamBlock::Peq(p) = params else {
            return false;
        };
        if p.bands.iter().any(|b| b.freq_hz == 0 || b.q_tenths == 0) {
            return false;
        }
        self.params = p.clone();
        if self.sample_rate > 0.0 {
            self.design();
        }
        true
    }

    fn init_algo(&mut self, format: &StreamFormat) -> bool {
        self.sample_rate = format.sample_rate as f32;
        self.channels = usize::from(format.channels.max(1));
        self.sections.clear();
        self.design();
        true
    }

    fn deinit_algo(&mut self) {
        self.sections = Vec::new();
    }

    fn algo_process(&mut self, inputs: &[&[f32]], output: &mut Vec<f32>) {
        output.extend_from_slice(inputs[0]);
        for band in &mut self.sections {
            for (n, s) in output.iter_mut().enumerate() {
                *s = band[n % self.channels].process(*s);
            }
        }
    }
}
