//! Hardware-backed sink and source elements.
//!
//! Both elements finish `IdleToReady` asynchronously: bring-up completes
//! only once the device's DMA-ready interrupt has fired. Interrupt-side code
//! holds a [`DmaFeed`] (source) or flips the device's own ready state (sink)
//! and publishes `DEVICE_READY`, which makes the pipeline poll its pending
//! step.
//!
//! Captured frames reach the source through the claim/finish [`Queue`];
//! each delivery publishes `DATA_READY` so the pipeline pulls the source.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::buffer::{Buffer, FrameBuffer, SramPool};
use crate::bus::BusSender;
use crate::element::{Attachment, Element, ElementId, Flow, FlowResult};
use crate::error::{BusError, FlowError};
use crate::format::StreamFormat;
use crate::graph::FlowContext;
use crate::message::{Message, MessageBody, MsgId};
use crate::object::Object;
use crate::queue::Queue;
use crate::state::{StateChange, Transition};

/// Playback hardware driven by a [`DeviceSink`].
pub trait AudioDevice: Send {
    /// Configures the device for `format`.
    fn open(&mut self, format: &StreamFormat) -> bool;
    /// Whether the DMA-ready interrupt has fired since `open`.
    fn is_ready(&self) -> bool;
    /// Starts the DMA clock.
    fn start(&mut self) -> bool;
    /// Stops the DMA clock.
    fn stop(&mut self);
    /// Releases the device.
    fn close(&mut self);
    /// Queues one frame for output.
    fn write(&mut self, frame: &[u8]) -> bool;
    /// Applies a logical volume level.
    fn set_volume(&mut self, _level: u8) {}
}

/// Sink writing frames to an [`AudioDevice`].
pub struct DeviceSink<D> {
    obj: Object,
    device: D,
    format: StreamFormat,
}

impl<D: AudioDevice> DeviceSink<D> {
    /// Wraps `device`.
    pub fn new(name: &str, device: D) -> Self {
        Self {
            obj: Object::new(name),
            device,
            format: StreamFormat::default(),
        }
    }

    /// The wrapped device.
    pub fn device(&self) -> &D {
        &self.device
    }
}

impl<D: AudioDevice> Element for DeviceSink<D> {
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

    fn attach(&mut self, attachment: Attachment) {
        self.format = attachment.format;
    }

    fn idle_to_ready(&mut self) -> StateChange {
        if !self.device.open(&self.format) {
            return StateChange::Fail;
        }
        if self.device.is_ready() {
            StateChange::Success
        } else {
            StateChange::Async
        }
    }

    fn poll_transition(&mut self, transition: Transition) -> StateChange {
        match transition {
            Transition::IdleToReady if !self.device.is_ready() => StateChange::Async,
            _ => StateChange::Success,
        }
    }

    fn pause_to_play(&mut self) -> StateChange {
        if self.device.start() {
            StateChange::Success
        } else {
            StateChange::Fail
        }
    }

    fn play_to_pause(&mut self) -> StateChange {
        self.device.stop();
        StateChange::Success
    }

    fn ready_to_idle(&mut self) -> StateChange {
        self.device.close();
        StateChange::Success
    }

    fn process(&mut self, _ctx: &mut FlowContext<'_>, _pad: usize, buffer: &dyn Buffer) -> FlowResult {
        let frame = buffer.payload().ok_or(FlowError::NullPayload)?;
        if self.device.write(frame) {
            Ok(Flow::Continue)
        } else {
            Err(FlowError::Device)
        }
    }

    fn handle_message(&mut self, msg: &Message) {
        if let (MsgId::VOLUME, MessageBody::Volume(level)) = (msg.id, &msg.body) {
            self.device.set_volume(*level);
        }
    }
}

struct FeedShared {
    frames: Queue<Vec<u8>>,
    ready: AtomicBool,
    route: OnceLock<(ElementId, BusSender)>,
}

/// Interrupt-side handle of a [`DeviceSource`].
#[derive(Clone)]
pub struct DmaFeed {
    shared: Arc<FeedShared>,
}

impl DmaFeed {
    /// Signals that the capture DMA is running.
    pub fn mark_ready(&self) -> Result<(), BusError> {
        self.shared.ready.store(true, Ordering::Release);
        match self.shared.route.get() {
            Some((id, bus)) => bus.publish(Message::new(MsgId::DEVICE_READY).from_element(*id)),
            None => Ok(()),
        }
    }

    /// Hands a captured frame to the source. Gives the frame back when the
    /// queue is full.
    pub fn deliver(&self, frame: Vec<u8>) -> Result<(), Vec<u8>> {
        self.shared.frames.push(frame)?;
        if let Some((id, bus)) = self.shared.route.get() {
            let msg = Message::with_body(MsgId::DATA_READY, MessageBody::Element(*id));
            if bus.publish(msg).is_err() {
                tracing::trace!("data ready notification dropped, bus full");
            }
        }
        Ok(())
    }

    /// Frames waiting to be pulled.
    pub fn queued(&self) -> usize {
        self.shared.frames.len()
    }
}

/// Source fed by capture hardware through a [`DmaFeed`].
pub struct DeviceSource {
    obj: Object,
    shared: Arc<FeedShared>,
    pool: Option<Arc<SramPool>>,
    out: FrameBuffer,
}

impl DeviceSource {
    /// New source with a frame queue of `depth` entries, and its feed handle.
    pub fn new(name: &str, depth: usize) -> (Self, DmaFeed) {
        let shared = Arc::new(FeedShared {
            frames: Queue::new(depth),
            ready: AtomicBool::new(false),
            route: OnceLock::new(),
        });
        (
            Self {
                obj: Object::new(name),
                shared: Arc::clone(&shared),
                pool: None,
                out: FrameBuffer::heap(),
            },
            DmaFeed { shared },
        )
    }

    /// Draws output frames from `pool`.
    #[must_use]
    pub fn with_pool(mut self, pool: Arc<SramPool>) -> Self {
        self.pool = Some(pool);
        self
    }
}

impl Element for DeviceSource {
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
        let _ = self.shared.route.set((attachment.id, attachment.bus));
    }

    fn idle_to_ready(&mut self) -> StateChange {
        self.out = FrameBuffer::with_pool(self.pool.clone());
        self.poll_transition(Transition::IdleToReady)
    }

    fn poll_transition(&mut self, _transition: Transition) -> StateChange {
        if self.shared.ready.load(Ordering::Acquire) {
            StateChange::Success
        } else {
            StateChange::Async
        }
    }

    fn ready_to_idle(&mut self) -> StateChange {
        self.shared.ready.store(false, Ordering::Release);
        while self.shared.frames.pop().is_some() {}
        StateChange::Success
    }

    fn pull(&mut self, ctx: &mut FlowContext<'_>) -> FlowResult {
        while let Some(claim) = self.shared.frames.claim_read() {
            // The entry stays queued until it has been copied out.
            let filled = claim.peek(|frame| {
                self.out
                    .fill_from(frame)
                    .ok_or(FlowError::Backpressure(frame.len()))
            });
            match filled {
                Some(Ok(())) => {}
                Some(Err(err)) => return Err(err),
                None => {
                    claim.finish();
                    continue;
                }
            }
            claim.finish();
            let result = ctx.submit(0, &self.out);
            self.out.release();
            result?;
        }
        Ok(Flow::Continue)
    }
}
