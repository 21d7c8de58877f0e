//! Fixed gain stage, scaled by the logical volume.

use austreamer_config::{AlgoKind, GainParams, ParamBlock};
use austreamer_core::{Message, MessageBody, MsgId, StreamFormat};

use crate::dsp::db_to_linear;
use crate::kernel::AlgoKernel;

/// Full-scale logical volume.
pub const VOLUME_MAX: u8 = 100;

/// Gain in dB times `volume / 100`.
pub struct Gain {
    params: GainParams,
    volume: u8,
}

impl Default for Gain {
    fn default() -> Self {
        Self {
            params: GainParams::default(),
            volume: VOLUME_MAX,
        }
    }
}

impl Gain {
    /// Unity gain at full volume.
    pub fn new() -> Self {
        Self::default()
    }

    /// Linear factor currently applied.
    pub fn factor(&self) -> f32 {
        db_to_linear(f32::from(self.params.gain_db)) * f32::from(self.volume) / f32::from(VOLUME_MAX)
    }
}

impl AlgoKernel for Gain {
    fn kind(&self) -> AlgoKind {
        AlgoKind::Gain
    }

    fn get_config(&mut self, params: &ParamBlock) -> bool {
        let ParamBlock::Gain(p) = params else {
            return false;
        };
        self.params = *p;
        true
    }

    fn init_algo(&mut self, _format: &StreamFormat) -> bool {
        true
    }

    fn algo_process(&mut self, inputs: &[&[f32]], output: &mut Vec<f32>) {
        let g = self.factor();
        output.extend(inputs[0].iter().map(|s| s * g));
    }

    fn handle_message(&mut self, msg: &Message) {
        if let (MsgId::VOLUME, MessageBody::Volume(level)) = (msg.id, &msg.body) {
            self.volume = (*level).min(VOLUME_MAX);
        }
    }
}
