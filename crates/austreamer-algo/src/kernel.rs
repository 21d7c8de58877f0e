//! The contract between an [`AlgoElement`](crate::AlgoElement) and the
//! signal processing it wraps.
//!
//! A kernel only ever sees audio the wrapper decided to process. Bypass,
//! VAD gating, sniffing and load measurement all happen around it, so a
//! kernel implements four things:
//!
//! | Hook | When |
//! |------|------|
//! | [`get_config`](AlgoKernel::get_config) | Idle→Ready, with the stored parameter block |
//! | [`init_algo`](AlgoKernel::init_algo) | Idle→Ready, after a successful `get_config` |
//! | [`algo_process`](AlgoKernel::algo_process) | every frame that is not bypassed |
//! | [`deinit_algo`](AlgoKernel::deinit_algo) | Ready→Idle |
//!
//! Samples are interleaved `f32` in [-1.0, 1.0) at the element's format.

use austreamer_config::{AlgoKind, ParamBlock};
use austreamer_core::{Message, MessageBody, MsgId, StreamFormat};

/// Signal processing behind an algorithm element.
pub trait AlgoKernel: Send {
    /// Sub-block group this kernel is configured from.
    fn kind(&self) -> AlgoKind;

    /// Number of input streams; each gets its own sink pad.
    fn inputs(&self) -> usize {
        1
    }

    /// Accepts a parameter block. Returns `false` when the block is of the
    /// wrong kind or out of range for this kernel.
    fn get_config(&mut self, params: &ParamBlock) -> bool;

    /// Allocates state for `format`. Returns `false` when the format is
    /// not supported.
    fn init_algo(&mut self, format: &StreamFormat) -> bool;

    /// Frees everything allocated in `init_algo`.
    fn deinit_algo(&mut self) {}

    /// Processes one frame. `inputs` holds one slice per input stream,
    /// `output` arrives empty.
    fn algo_process(&mut self, inputs: &[&[f32]], output: &mut Vec<f32>);

    /// Applies a parameter block while streaming. Defaults to `get_config`.
    fn apply_params(&mut self, params: &ParamBlock) -> bool {
        self.get_config(params)
    }

    /// Sample rate of the output for a given input rate.
    fn output_rate(&self, input_rate: u32) -> u32 {
        input_rate
    }

    /// Event to publish after the last `algo_process`, if any.
    fn poll_event(&mut self) -> Option<(MsgId, MessageBody)> {
        None
    }

    /// Bus messages the wrapper does not consume itself.
    fn handle_message(&mut self, _msg: &Message) {}
}
