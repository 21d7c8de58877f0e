//! Re-chunks incoming frames to a fixed output size.
//!
//! | Property | Type | Default |
//! |----------|------|---------|
//! | `out_frame_bytes` | int | 0 (pipeline frame size) |
//! | `frame_count` | int | 4 |

use crate::buffer::{Buffer, ReframeBuffer};
use crate::element::{Attachment, Element, Flow, FlowResult};
use crate::error::FlowError;
use crate::format::StreamFormat;
use crate::graph::FlowContext;
use crate::object::Object;
use crate::state::StateChange;

/// Fixed-size re-framer between stages with different frame sizes.
pub struct Reframe {
    obj: Object,
    format: StreamFormat,
    ring: Option<ReframeBuffer>,
}

impl Reframe {
    /// New re-framer with default properties.
    pub fn new(name: &str) -> Self {
        Self {
            obj: Object::new(name)
                .with("out_frame_bytes", 0)
                .with("frame_count", 4),
            format: StreamFormat::default(),
            ring: None,
        }
    }

    /// Output frame size in bytes.
    #[must_use]
    pub fn with_out_frame_bytes(self, bytes: usize) -> Self {
        self.with_usize("out_frame_bytes", bytes)
    }

    /// Depth of the ring in output frames.
    #[must_use]
    pub fn with_frame_count(self, count: usize) -> Self {
        self.with_usize("frame_count", count)
    }

    fn with_usize(mut self, key: &str, value: usize) -> Self {
        let set = self.obj.set(key, value as i64);
        debug_assert!(set.is_ok(), "{key}: {set:?}");
        self
    }
}

impl Element for Reframe {
    fn object(&self) -> &Object {
        &self.obj
    }

    fn object_mut(&mut self) -> &mut Object {
        &mut self.obj
    }

    fn sink_pads(&self) -> usize {
        1
    }

    fn source_pads(&self) -> usize {
        1
    }

    fn attach(&mut self, attachment: Attachment) {
        self.format = attachment.format;
    }

    fn idle_to_ready(&mut self) -> StateChange {
        let (Ok(out), Ok(count)) = (
            self.obj.get_usize("out_frame_bytes"),
            self.obj.get_usize("frame_count"),
        ) else {
            return StateChange::Fail;
        };
        let out = if out == 0 { self.format.frame_bytes() } else { out };
        if out == 0 || count == 0 {
            return StateChange::Fail;
        }
        self.ring = Some(ReframeBuffer::new(out, count));
        StateChange::Success
    }

    fn pause_to_ready(&mut self) -> StateChange {
        if let Some(ring) = self.ring.as_mut() {
            ring.clear();
        }
        StateChange::Success
    }

    fn ready_to_idle(&mut self) -> StateChange {
        self.ring = None;
        StateChange::Success
    }

    fn process(&mut self, ctx: &mut FlowContext<'_>, _pad: usize, buffer: &dyn Buffer) -> FlowResult {
        let ring = self.ring.as_mut().ok_or(FlowError::NotPrepared)?;
        let data = buffer.payload().ok_or(FlowError::NullPayload)?;
        let mut rest = data;
        loop {
            let taken = ring.fill_from(rest);
            rest = &rest[taken..];
            while ring.advance() {
                let result = ctx.submit(0, &*ring);
                ring.release();
                result?;
            }
            if rest.is_empty() {
                return Ok(Flow::Continue);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_ring_geometry() {
        let r = Reframe::new("r").with_out_frame_bytes(320).with_frame_count(1);
        assert_eq!(r.object().get_usize("out_frame_bytes"), Ok(320));
        assert_eq!(r.object().get_usize("frame_count"), Ok(1));
    }
}
