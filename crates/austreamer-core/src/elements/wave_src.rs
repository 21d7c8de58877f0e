//! Test tone and prompt generator.
//!
//! Produces one frame of 16-bit PCM per pull, in the pipeline format. With a
//! non-zero `duration_ms` the source stops after that much audio, returns
//! [`Flow::Eof`] and publishes `END_OF_STREAM`.
//!
//! | Property | Type | Default |
//! |----------|------|---------|
//! | `waveform` | string | `"sine"` (`sine`, `triangle`, `square`, `noise`) |
//! | `frequency` | float | 1000.0 Hz |
//! | `amplitude` | float | 0.5 (linear) |
//! | `duration_ms` | int | 0 (endless) |

use std::f32::consts::TAU;
use std::sync::Arc;

use crate::buffer::{Buffer, FrameBuffer, SramPool};
use crate::bus::BusSender;
use crate::element::{Attachment, Element, ElementId, Flow, FlowResult};
use crate::error::FlowError;
use crate::format::{StreamFormat, f32_to_pcm16};
use crate::graph::FlowContext;
use crate::message::{Message, MessageBody, MsgId};
use crate::object::Object;
use crate::state::StateChange;

/// Generated waveform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    /// Sine.
    Sine,
    /// Symmetric triangle.
    Triangle,
    /// 50% duty square.
    Square,
    /// Pseudo-random noise.
    Noise,
}

impl Waveform {
    /// Parses a waveform name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sine" => Some(Self::Sine),
            "triangle" => Some(Self::Triangle),
            "square" => Some(Self::Square),
            "noise" | "pseudo_noise" => Some(Self::Noise),
            _ => None,
        }
    }
}

/// Periodic or noise source.
pub struct WaveSrc {
    obj: Object,
    pool: Option<Arc<SramPool>>,
    out: FrameBuffer,
    format: StreamFormat,
    bus: Option<(ElementId, BusSender)>,
    waveform: Waveform,
    phase_inc: f32,
    amplitude: f32,
    phase: f32,
    noise: u32,
    scratch: Vec<f32>,
    remaining: Option<u64>,
    finished: bool,
}

impl WaveSrc {
    /// New generator with default properties.
    pub fn new(name: &str) -> Self {
        Self {
            obj: Object::new(name)
                .with("waveform", "sine")
                .with("frequency", 1000.0)
                .with("amplitude", 0.5)
                .with("duration_ms", 0),
            pool: None,
            out: FrameBuffer::heap(),
            format: StreamFormat::default(),
            bus: None,
            waveform: Waveform::Sine,
            phase_inc: 0.0,
            amplitude: 0.0,
            phase: 0.0,
            noise: 0x1234_5678,
            scratch: Vec::new(),
            remaining: None,
            finished: false,
        }
    }

    /// Draws output frames from `pool` instead of the heap.
    #[must_use]
    pub fn with_pool(mut self, pool: Arc<SramPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    fn next_sample(&mut self) -> f32 {
        let p = self.phase;
        self.phase = (self.phase + self.phase_inc).fract();
        match self.waveform {
            Waveform::Sine => libm::sinf(TAU * p),
            Waveform::Triangle => 1.0 - 4.0 * (p - 0.5).abs(),
            Waveform::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Noise => {
                self.noise = self.noise.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (self.noise >> 8) as f32 / (1u32 << 23) as f32 - 1.0
            }
        }
    }

    fn load_properties(&mut self) -> Option<()> {
        self.waveform = Waveform::from_name(self.obj.get_str("waveform").ok()?)?;
        let freq = self.obj.get_float("frequency").ok()? as f32;
        self.amplitude = self.obj.get_float("amplitude").ok()? as f32;
        let rate = self.format.sample_rate.max(1) as f32;
        self.phase_inc = (freq / rate).rem_euclid(1.0);
        let ms = u64::try_from(self.obj.get_int("duration_ms").ok()?).ok()?;
        self.remaining = (ms > 0).then(|| ms * u64::from(self.format.sample_rate) / 1000);
        Some(())
    }
}

impl Element for WaveSrc {
    fn object(&self) -> &Object {
        &self.obj
    }

    fn object_mut(&mut self) -> &mut Object {
        &mut self.obj
    }

    fn sink_pads(&self) -> usize {
        0
    }

    fn source_pads(&self) -> usize {
        1
    }

    fn attach(&mut self, attachment: Attachment) {
        self.format = attachment.format;
        self.bus = Some((attachment.id, attachment.bus));
    }

    fn is_scheduled(&self) -> bool {
        true
    }

    fn idle_to_ready(&mut self) -> StateChange {
        if self.load_properties().is_none() {
            tracing::warn!("{}: invalid properties", self.obj.name());
            return StateChange::Fail;
        }
        self.out = FrameBuffer::with_pool(self.pool.clone());
        self.phase = 0.0;
        self.finished = false;
        StateChange::Success
    }

    fn ready_to_idle(&mut self) -> StateChange {
        self.out.release();
        self.scratch = Vec::new();
        StateChange::Success
    }

    fn pull(&mut self, ctx: &mut FlowContext<'_>) -> FlowResult {
        if self.finished {
            return Ok(Flow::Eof);
        }
        let channels = usize::from(self.format.channels.max(1));
        let mut frames = self.format.frame_samples as usize;
        if let Some(left) = self.remaining {
            frames = frames.min(usize::try_from(left).unwrap_or(usize::MAX));
        }
        self.scratch.clear();
        for _ in 0..frames {
            let s = self.next_sample() * self.amplitude;
            self.scratch.extend(std::iter::repeat_n(s, channels));
        }
        let bytes = self.scratch.len() * 2;
        let payload = self.out.require(bytes).ok_or(FlowError::Backpressure(bytes))?;
        f32_to_pcm16(&self.scratch, payload);
        let result = ctx.submit(0, &self.out);
        self.out.release();

        if let Some(left) = self.remaining.as_mut() {
            *left -= frames as u64;
            if *left == 0 {
                self.finished = true;
                if let Some((id, bus)) = &self.bus {
                    let msg = Message::with_body(MsgId::END_OF_STREAM, MessageBody::Element(*id))
                        .from_element(*id);
                    if let Err(err) = bus.publish(msg) {
                        tracing::warn!("{}: {err}", self.obj.name());
                    }
                }
                return result.map(|_| Flow::Eof);
            }
        }
        result
    }
}
