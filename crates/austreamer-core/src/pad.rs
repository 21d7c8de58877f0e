//! Connection points between elements.
//!
//! Pads are owned by the pipeline graph, one list of sink pads and one list
//! of source pads per element. A link makes a source pad and a sink pad
//! mutual peers; peers are stored as [`PadRef`] indices, never references.

use crate::element::ElementId;

/// Data flow direction of a pad.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PadDirection {
    /// Emits buffers.
    Source,
    /// Receives buffers.
    Sink,
}

/// Address of a pad inside a pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PadRef {
    /// Owning element.
    pub element: ElementId,
    /// Direction of the addressed pad.
    pub direction: PadDirection,
    /// Index within the owner's pads of that direction.
    pub index: usize,
}

/// One endpoint of a link.
#[derive(Clone, Debug)]
pub struct Pad {
    direction: PadDirection,
    index: usize,
    owner: ElementId,
    peer: Option<PadRef>,
    busy: bool,
}

impl Pad {
    pub(crate) fn new(owner: ElementId, direction: PadDirection, index: usize) -> Self {
        Self {
            direction,
            index,
            owner,
            peer: None,
            busy: false,
        }
    }

    /// Direction of the pad.
    pub fn direction(&self) -> PadDirection {
        self.direction
    }

    /// Index among the owner's pads of the same direction.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Owning element.
    pub fn owner(&self) -> ElementId {
        self.owner
    }

    /// Linked peer, if any.
    pub fn peer(&self) -> Option<PadRef> {
        self.peer
    }

    /// Whether the pad is linked.
    pub fn is_linked(&self) -> bool {
        self.peer.is_some()
    }

    /// Whether a buffer is in flight through this pad.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Address of this pad.
    pub fn address(&self) -> PadRef {
        PadRef {
            element: self.owner,
            direction: self.direction,
            index: self.index,
        }
    }

    pub(crate) fn set_peer(&mut self, peer: PadRef) {
        self.peer = Some(peer);
    }

    pub(crate) fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }
}
