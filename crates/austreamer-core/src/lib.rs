//! AUStreamer Core - audio streaming pipeline engine
//!
//! A pipeline is a directed acyclic graph of [`Element`]s connected through
//! pads. Sources push one frame at a time downstream; every hop is a
//! synchronous call, so a frame is fully processed before the source
//! returns. Control traffic travels separately over a bounded message
//! [`Bus`].
//!
//! # Building Blocks
//!
//! ## Data Path
//!
//! - [`Buffer`] - object-safe frame contract with heap, SRAM, shadow,
//!   reframe and empty variants
//! - [`SramPool`] - atomic byte budget for SRAM-backed buffers
//! - [`Queue`] - bounded claim/finish ring for cross-thread hand-off
//!
//! ## Graph
//!
//! - [`Element`] - processing unit with lifecycle hooks
//! - [`Pad`] - link endpoint; [`Graph`] owns elements and pads
//! - [`FlowContext`] - how an element submits downstream
//!
//! ## Control
//!
//! - [`Pipeline`] - ordered state machine over all elements
//! - [`Bus`] / [`Message`] - publish/subscribe with ordered listeners
//! - [`Scheduler`] - periodic need-data ticks
//! - [`Object`] - typed property bag
//!
//! # Example
//!
//! ```rust
//! use austreamer_core::elements::{CaptureSink, Reframe, WaveSrc};
//! use austreamer_core::{EventType, Pipeline, State, StreamFormat};
//!
//! let mut pipeline = Pipeline::new("tone", EventType::Prompt, StreamFormat::new(16_000, 1, 256));
//! let src = pipeline.add_element(WaveSrc::new("src")).unwrap();
//! let reframe = pipeline.add_element(Reframe::new("reframe").with_out_frame_bytes(320)).unwrap();
//! let (sink, capture) = CaptureSink::new("sink");
//! let sink = pipeline.add_element(sink).unwrap();
//! pipeline.link_chain(&[src, reframe, sink]).unwrap();
//!
//! pipeline.set_state(State::Play).unwrap();
//! pipeline.tick().unwrap();
//! assert_eq!(capture.frame_count(), 1);
//! ```

pub mod buffer;
pub mod bus;
pub mod element;
pub mod elements;
pub mod error;
pub mod format;
pub mod graph;
pub mod message;
pub mod object;
pub mod pad;
pub mod pipeline;
pub mod queue;
pub mod scheduler;
pub mod state;

pub use buffer::{
    Buffer, BufferKind, EmptyBuffer, FrameBuffer, Payload, PoolLease, ReframeBuffer, ShadowBuffer,
    ShadowGroup, SramPool,
};
pub use bus::{BUS_CAPACITY, Bus, BusSender, EventFlag, EventType};
pub use element::{Attachment, Element, ElementId, Flow, FlowResult};
pub use error::{BusError, FlowError, LinkError, PipelineError, PropertyError};
pub use format::{BYTES_PER_SAMPLE, StreamFormat, f32_to_pcm16, pcm16_to_f32};
pub use graph::{FlowContext, Graph};
pub use message::{Message, MessageBody, MsgId, SniffPoint};
pub use object::{Object, PropValue};
pub use pad::{Pad, PadDirection, PadRef};
pub use pipeline::{AbortPolicy, Pipeline, PipelineHandle, StateOutcome};
pub use queue::{Queue, ReadClaim, WriteClaim};
pub use scheduler::Scheduler;
pub use state::{Direction, ElementState, State, StateChange, Transition};
