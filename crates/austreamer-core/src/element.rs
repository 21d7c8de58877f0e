//! The processing unit of a pipeline.
//!
//! An [`Element`] declares how many sink and source pads it has, takes part
//! in the lifecycle state machine and processes buffers arriving on its sink
//! pads. Everything else (linking, delivery, bus fan-out) is done by the
//! pipeline that owns it.
//!
//! # Lifecycle hooks
//!
//! Each transition has its own hook, defaulting to
//! [`StateChange::Success`]. Elements only override the ones they care
//! about. A hook returning [`StateChange::Async`] parks the element in
//! [`ElementState::Pending`](crate::ElementState::Pending) until
//! [`poll_transition`](Element::poll_transition) reports completion.
//!
//! # Data flow
//!
//! - [`process`](Element::process) runs synchronously inside the upstream
//!   element's `submit` call. The buffer is borrowed for that call only.
//! - [`pull`](Element::pull) is how the pipeline asks a source element for
//!   its next frame (scheduler tick or device data ready).

use std::fmt;

use crate::bus::BusSender;
use crate::error::{FlowError, PropertyError};
use crate::format::StreamFormat;
use crate::graph::FlowContext;
use crate::message::Message;
use crate::object::{Object, PropValue};
use crate::state::{StateChange, Transition};
use crate::buffer::Buffer;

/// Index of an element inside its pipeline.
///
/// Ids are assigned in insertion order and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) u32);

impl ElementId {
    /// Raw index.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({})", self.0)
    }
}

/// Successful outcome of a data-path call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Keep streaming.
    Continue,
    /// The source has no more data.
    Eof,
}

/// Result of `submit`, `process` and `pull`.
pub type FlowResult = Result<Flow, FlowError>;

/// What an element learns when it is added to a pipeline.
#[derive(Clone)]
pub struct Attachment {
    /// Id assigned by the pipeline.
    pub id: ElementId,
    /// Producer handle onto the pipeline bus.
    pub bus: BusSender,
    /// Pipeline stream format.
    pub format: StreamFormat,
}

/// A pipeline stage.
pub trait Element: Send {
    /// Property bag; its name is the element name.
    fn object(&self) -> &Object;

    /// Mutable property bag.
    fn object_mut(&mut self) -> &mut Object;

    /// Element name.
    fn name(&self) -> &str {
        self.object().name()
    }

    /// Number of sink pads, fixed for the element's lifetime.
    fn sink_pads(&self) -> usize;

    /// Number of source pads, fixed for the element's lifetime.
    fn source_pads(&self) -> usize;

    /// Called once when the element joins a pipeline.
    fn attach(&mut self, _attachment: Attachment) {}

    /// Whether the element receives bus messages.
    fn listens(&self) -> bool {
        true
    }

    /// Whether the scheduler tick should pull this element.
    fn is_scheduled(&self) -> bool {
        false
    }

    /// Sets a property. Takes effect at the next Idle→Ready.
    fn set_property(&mut self, key: &str, value: PropValue) -> Result<(), PropertyError> {
        self.object_mut().set(key, value)
    }

    /// Idle → Ready: allocate and load configuration.
    fn idle_to_ready(&mut self) -> StateChange {
        StateChange::Success
    }

    /// Ready → Pause.
    fn ready_to_pause(&mut self) -> StateChange {
        StateChange::Success
    }

    /// Pause → Play: start streaming.
    fn pause_to_play(&mut self) -> StateChange {
        StateChange::Success
    }

    /// Play → Pause: stop streaming.
    fn play_to_pause(&mut self) -> StateChange {
        StateChange::Success
    }

    /// Pause → Ready.
    fn pause_to_ready(&mut self) -> StateChange {
        StateChange::Success
    }

    /// Ready → Idle: free everything acquired in `idle_to_ready`.
    fn ready_to_idle(&mut self) -> StateChange {
        StateChange::Success
    }

    /// Dispatches `transition` to its hook.
    fn change_state(&mut self, transition: Transition) -> StateChange {
        match transition {
            Transition::IdleToReady => self.idle_to_ready(),
            Transition::ReadyToPause => self.ready_to_pause(),
            Transition::PauseToPlay => self.pause_to_play(),
            Transition::PlayToPause => self.play_to_pause(),
            Transition::PauseToReady => self.pause_to_ready(),
            Transition::ReadyToIdle => self.ready_to_idle(),
        }
    }

    /// Re-checks a transition that returned [`StateChange::Async`].
    fn poll_transition(&mut self, _transition: Transition) -> StateChange {
        StateChange::Success
    }

    /// Handles a buffer arriving on sink pad `pad`.
    fn process(
        &mut self,
        ctx: &mut FlowContext<'_>,
        pad: usize,
        _buffer: &dyn Buffer,
    ) -> FlowResult {
        Err(FlowError::NoSuchPad {
            element: ctx.element(),
            pad,
        })
    }

    /// Produces the next frame, if this element is a source.
    fn pull(&mut self, _ctx: &mut FlowContext<'_>) -> FlowResult {
        Ok(Flow::Continue)
    }

    /// Handles a bus message.
    fn handle_message(&mut self, _msg: &Message) {}
}
