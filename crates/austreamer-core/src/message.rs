//! Messages carried on a pipeline [`Bus`](crate::Bus).
//!
//! The [`MsgId`] is the dispatch key: every listener sees every message and
//! decides relevance from the id. Ids below `0x0100` are reserved for
//! transport-level message ids; pipeline ids live above.

use std::fmt;

use crate::element::ElementId;

/// Numeric message identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MsgId(pub u16);

impl MsgId {
    /// Scheduler tick: sources should produce a frame.
    pub const NEED_DATA: Self = Self(0x0100);
    /// Request to move the pipeline to Play.
    pub const START_STREAM: Self = Self(0x0101);
    /// Request to move the pipeline to Pause.
    pub const STOP_STREAM: Self = Self(0x0102);
    /// Logical volume change, [`MessageBody::Volume`].
    pub const VOLUME: Self = Self(0x0103);
    /// A source reached end of stream, [`MessageBody::Element`].
    pub const END_OF_STREAM: Self = Self(0x0104);
    /// A configuration sub-block changed, [`MessageBody::SubBlock`].
    pub const PARAM_UPDATE: Self = Self(0x0105);
    /// Voice activity changed, [`MessageBody::Vad`].
    pub const VAD_STATE: Self = Self(0x0106);
    /// Measured load of an algorithm, [`MessageBody::Mcps`].
    pub const MCPS_REPORT: Self = Self(0x0107);
    /// A device finished its asynchronous bring-up.
    pub const DEVICE_READY: Self = Self(0x0108);
    /// A hardware-driven source has frames queued, [`MessageBody::Element`].
    pub const DATA_READY: Self = Self(0x0109);
    /// Sniffed PCM from an algorithm element, [`MessageBody::Pcm`].
    pub const NODE_DATA: Self = Self(0x010A);
}

impl fmt::Display for MsgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// Which side of an algorithm a sniffed frame was taken from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SniffPoint {
    /// Kernel input.
    Input,
    /// Kernel output.
    Output,
}

/// Message payload.
#[derive(Clone, Debug, PartialEq)]
pub enum MessageBody {
    /// No payload.
    Empty,
    /// Logical volume level.
    Volume(u8),
    /// Raw 16-byte configuration record.
    SubBlock {
        /// Sub-block id.
        id: u16,
        /// Record bytes.
        data: [u8; 16],
    },
    /// Voice activity.
    Vad(bool),
    /// Refers to an element of the pipeline.
    Element(ElementId),
    /// Algorithm load report.
    Mcps {
        /// Sub-block id the report belongs to.
        id: u16,
        /// Load in thousandths of MCPS.
        milli_mcps: u32,
    },
    /// PCM tapped from an algorithm.
    Pcm {
        /// Tap position.
        point: SniffPoint,
        /// Tap channel index.
        index: u8,
        /// Sample rate of the data.
        sample_rate: u32,
        /// Interleaved channels.
        channels: u16,
        /// Little-endian `i16` samples.
        data: Vec<u8>,
    },
    /// Free-form integer.
    Value(i64),
}

/// A bus message.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    /// Dispatch key.
    pub id: MsgId,
    /// Publishing element, when published by one.
    pub source: Option<ElementId>,
    /// Payload.
    pub body: MessageBody,
}

impl Message {
    /// Message with no payload.
    pub fn new(id: MsgId) -> Self {
        Self {
            id,
            source: None,
            body: MessageBody::Empty,
        }
    }

    /// Message with a payload.
    pub fn with_body(id: MsgId, body: MessageBody) -> Self {
        Self {
            id,
            source: None,
            body,
        }
    }

    /// Tags the message with its publishing element.
    #[must_use]
    pub fn from_element(mut self, element: ElementId) -> Self {
        self.source = Some(element);
        self
    }
}
