//! Terminal sink that records every frame it receives.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::Buffer;
use crate::element::{Element, Flow, FlowResult};
use crate::error::FlowError;
use crate::graph::FlowContext;
use crate::message::{Message, MsgId};
use crate::object::Object;

/// Frames collected by a [`CaptureSink`], readable from any thread.
#[derive(Clone, Default)]
pub struct Capture {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
    messages: Arc<Mutex<Vec<Message>>>,
}

impl Capture {
    /// Number of frames received.
    pub fn frame_count(&self) -> usize {
        self.frames.lock().len()
    }

    /// Copies of all received frames, oldest first.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().clone()
    }

    /// All received bytes, concatenated.
    pub fn bytes(&self) -> Vec<u8> {
        self.frames.lock().concat()
    }

    /// Bus messages seen by the sink, excluding scheduler ticks.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    /// Drops everything recorded so far.
    pub fn clear(&self) {
        self.frames.lock().clear();
        self.messages.lock().clear();
    }
}

/// Sink that copies each incoming payload into a shared [`Capture`].
pub struct CaptureSink {
    obj: Object,
    capture: Capture,
}

impl CaptureSink {
    /// New sink and the handle to read what it captures.
    pub fn new(name: &str) -> (Self, Capture) {
        let capture = Capture::default();
        (
            Self {
                obj: Object::new(name),
                capture: capture.clone(),
            },
            capture,
        )
    }

    /// Sink recording into an existing handle.
    pub fn with_capture(name: &str, capture: Capture) -> Self {
        Self {
            obj: Object::new(name),
            capture,
        }
    }
}

impl Element for CaptureSink {
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
        0
    }

    fn process(&mut self, _ctx: &mut FlowContext<'_>, _pad: usize, buffer: &dyn Buffer) -> FlowResult {
        let data = buffer.payload().ok_or(FlowError::NullPayload)?;
        self.capture.frames.lock().push(data.to_vec());
        Ok(Flow::Continue)
    }

    fn handle_message(&mut self, msg: &Message) {
        if msg.id != MsgId::NEED_DATA {
            self.capture.messages.lock().push(msg.clone());
        }
    }
}
