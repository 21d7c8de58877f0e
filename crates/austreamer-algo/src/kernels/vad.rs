//! Energy voice activity detector.
//!
//! Audio passes through unchanged. A frame whose level is above the
//! threshold marks voice; voice is held for the hangover count of quiet
//! frames before it drops. Every change of decision is published as
//! [`MsgId::VAD_STATE`], which gates elements with `vad_gate` set.

use austreamer_config::{AlgoKind, ParamBlock, VadParams};
use austreamer_core::{MessageBody, MsgId, StreamFormat};

use crate::dsp::{linear_to_db, rms};
use crate::kernel::AlgoKernel;

/// Frame energy detector with hangover.
#[derive(Default)]
pub struct Vad {
    params: VadParams,
    voice: Option<bool>,
    quiet_frames: u16,
    changed: bool,
}

impl Vad {
    /// Detector with factory parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last decision; `None` before the first frame.
    pub fn voice(&self) -> Option<bool> {
        self.voice
    }
}

impl AlgoKernel for Vad {
    fn kind(&self) -> AlgoKind {
        AlgoKind::Vad
    }

    fn get_config(&mut self, params: &ParamBlock) -> bool {
        let ParamBlock::Vad(p) = params else {
            return false;
        };
        self.params = *p;
        true
    }

    fn init_algo(&mut self, _format: &StreamFormat) -> bool {
        self.voice = None;
        self.quiet_frames = 0;
        self.changed = false;
        true
    }

    fn algo_process(&mut self, inputs: &[&[f32]], output: &mut Vec<f32>) {
        let input = inputs[0];
        output.extend_from_slice(input);

        let loud = linear_to_db(rms(input)) > f32::from(self.params.threshold_db);
        let voice = if loud {
            self.quiet_frames = 0;
            true
        } else {
            self.quiet_frames = self.quiet_frames.saturating_add(1);
            self.voice == Some(true) && self.quiet_frames <= self.params.hangover_frames
        };
        if self.voice != Some(voice) {
            self.voice = Some(voice);
            self.changed = true;
        }
    }

    fn poll_event(&mut self) -> Option<(MsgId, MessageBody)> {
        if !std::mem::take(&mut self.changed) {
            return None;
        }
        self.voice.map(|v| (MsgId::VAD_STATE, MessageBody::Vad(v)))
    }
}
