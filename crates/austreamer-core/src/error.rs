//! Error types for the pipeline engine.
//!
//! Data-path failures surface as [`FlowError`] from `submit`/`process`,
//! topology mistakes as [`LinkError`], lifecycle failures as
//! [`PipelineError`]. None of these panic; every failure is returned to the
//! caller that can act on it.

use thiserror::Error;

use crate::element::ElementId;
use crate::message::MsgId;
use crate::state::{State, Transition};

/// Errors raised on the per-frame data path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// A buffer without payload was offered to `submit`.
    #[error("refusing to submit a buffer without payload")]
    NullPayload,
    /// The source pad has no peer.
    #[error("source pad {pad} of {element} is not linked")]
    NotLinked {
        /// Element owning the pad.
        element: ElementId,
        /// Source pad index.
        pad: usize,
    },
    /// The pad index is out of range for the element.
    #[error("{element} has no pad {pad}")]
    NoSuchPad {
        /// Element that was addressed.
        element: ElementId,
        /// Offending pad index.
        pad: usize,
    },
    /// A pad already carries a buffer in this call chain.
    #[error("pad {pad} of {element} already holds a buffer")]
    PadBusy {
        /// Element owning the pad.
        element: ElementId,
        /// Pad index.
        pad: usize,
    },
    /// The peer element is already executing further up this call chain.
    #[error("{0} re-entered while processing")]
    Reentrant(ElementId),
    /// A payload could not be allocated (pool exhausted or buffer held).
    #[error("no payload available ({0} bytes requested)")]
    Backpressure(usize),
    /// A reframe ring could not accept the incoming bytes.
    #[error("reframe ring overflow: {incoming} bytes offered, {free} free")]
    Overflow {
        /// Bytes offered.
        incoming: usize,
        /// Bytes still free in the ring.
        free: usize,
    },
    /// The incoming frame does not match the negotiated format.
    #[error("frame of {actual} bytes does not match expected {expected}")]
    FrameSize {
        /// Expected byte count.
        expected: usize,
        /// Received byte count.
        actual: usize,
    },
    /// The element was asked to process before it reached Ready.
    #[error("element is not prepared for data")]
    NotPrepared,
    /// A hardware write or read failed.
    #[error("device transfer failed")]
    Device,
}

/// Errors raised while wiring elements together.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The element id does not belong to this pipeline.
    #[error("unknown element {0}")]
    UnknownElement(ElementId),
    /// No unlinked source pad is left on the upstream element.
    #[error("{0} has no free source pad")]
    NoFreeSourcePad(ElementId),
    /// No unlinked sink pad is left on the downstream element.
    #[error("{0} has no free sink pad")]
    NoFreeSinkPad(ElementId),
    /// The named pad is out of range or already linked.
    #[error("pad {pad} of {element} is unavailable")]
    PadUnavailable {
        /// Element owning the pad.
        element: ElementId,
        /// Pad index.
        pad: usize,
    },
    /// The link would close a cycle.
    #[error("linking {from} to {to} would create a cycle")]
    Cycle {
        /// Upstream element.
        from: ElementId,
        /// Downstream element.
        to: ElementId,
    },
}

/// Errors raised by the message bus.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The bounded queue has no free slot.
    #[error("bus queue full, dropped message {0}")]
    Full(MsgId),
}

/// Errors raised by property access on an [`Object`](crate::Object).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// The key was never declared on the object.
    #[error("unknown property '{0}'")]
    Unknown(String),
    /// The value has a different type than the declared default.
    #[error("property '{key}' expects {expected}, got {found}")]
    TypeMismatch {
        /// Property key.
        key: String,
        /// Declared type name.
        expected: &'static str,
        /// Offered type name.
        found: &'static str,
    },
    /// The value does not fit the requested numeric type.
    #[error("property '{0}' is out of range")]
    OutOfRange(String),
}

/// Errors raised by pipeline lifecycle operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An element refused a transition and the abort policy rolled it back.
    #[error("element '{element}' failed {transition:?}")]
    TransitionFailed {
        /// Name of the failing element.
        element: String,
        /// Transition that failed.
        transition: Transition,
    },
    /// Topology changes are only allowed in Idle.
    #[error("pipeline must be idle to change topology (currently {0:?})")]
    NotIdle(State),
    /// The element id does not belong to this pipeline.
    #[error("unknown element {0}")]
    UnknownElement(ElementId),
    /// Linking failed.
    #[error(transparent)]
    Link(#[from] LinkError),
    /// Property update failed.
    #[error(transparent)]
    Property(#[from] PropertyError),
    /// Publishing on the bus failed.
    #[error(transparent)]
    Bus(#[from] BusError),
}
