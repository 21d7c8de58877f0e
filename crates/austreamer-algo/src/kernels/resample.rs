//! Sample rate converter: linear interpolation with phase carried across
//! frames.

use austreamer_config::{AlgoKind, ParamBlock, ResampleParams, SUPPORTED_RATES};
use austreamer_core::StreamFormat;

use crate::kernel::AlgoKernel;

/// Converts from the element's input rate to the configured output rate.
pub struct Resample {
    params: ResampleParams,
    in_rate: u32,
    channels: usize,
    step: f64,
    /// Read position in input frames, relative to the current frame; -1
    /// addresses the last frame of the previous call.
    pos: f64,
    prev: Vec<f32>,
}

impl Default for Resample {
    fn default() -> Self {
        Self {
            params: ResampleParams::default(),
            in_rate: 0,
            channels: 1,
            step: 1.0,
            pos: 0.0,
            prev: Vec::new(),
        }
    }
}

impl Resample {
    /// Converter with factory parameters.
    pub fn new() -> Self {
        Self::default()
    }
}

impl AlgoKernel for Resample {
    fn kind(&self) -> AlgoKind {
        AlgoKind::Resample
    }

    fn get_config(&mut self, params: &ParamBlock) -> bool {
        match params {
            ParamBlock::Resample(p) if !p.enable || SUPPORTED_RATES.contains(&p.out_rate) => {
                self.params = *p;
                true
            }
            _ => false,
        }
    }

    fn apply_params(&mut self, params: &ParamBlock) -> bool {
        // downstream stages were sized for the current output rate
        matches!(params, ParamBlock::Resample(p) if p.out_rate == self.params.out_rate)
            && self.get_config(params)
    }

    fn init_algo(&mut self, format: &StreamFormat) -> bool {
        if format.sample_rate == 0 {
            return false;
        }
        self.in_rate = format.sample_rate;
        self.channels = usize::from(format.channels.max(1));
        self.step = f64::from(self.in_rate) / f64::from(self.params.out_rate.max(1));
        self.pos = 0.0;
        self.prev = vec![0.0; self.channels];
        true
    }

    fn deinit_algo(&mut self) {
        self.prev = Vec::new();
    }

    fn output_rate(&self, input_rate: u32) -> u32 {
        if self.params.enable {
            self.params.out_rate
        } else {
            input_rate
        }
    }

    fn algo_process(&mut self, inputs: &[&[f32]], output: &mut Vec<f32>) {
        let input = inputs[0];
        let ch = self.channels;
        let frames = input.len() / ch;
        if frames == 0 || self.prev.len() != ch {
            return;
        }
        let at = |i: isize, c: usize| -> f32 {
            if i < 0 {
                self.prev[c]
            } else {
                input[i as usize * ch + c]
            }
        };
        let last = (frames - 1) as f64;
        while self.pos <= last {
            let i = self.pos.floor();
            let frac = (self.pos - i) as f32;
            let i = i as isize;
            for c in 0..ch {
                let a = at(i, c);
                let s = if frac == 0.0 { a } else { a + (at(i + 1, c) - a) * frac };
                output.push(s);
            }
            self.pos += self.step;
        }
        self.pos -= frames as f64;
        self.prev.copy_from_slice(&input[(frames - 1) * ch..frames * ch]);
    }
}
