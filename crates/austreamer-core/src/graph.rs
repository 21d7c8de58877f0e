//! Element arena, pad links and synchronous buffer delivery.
//!
//! The [`Graph`] owns every element of a pipeline together with its pads.
//! Elements address each other only through [`ElementId`] and [`PadRef`]
//! indices. During delivery the receiving element is moved out of its slot
//! for the duration of its `process` call, so the element can submit further
//! downstream through the same graph. Finding an empty slot on the way means
//! the call chain looped back on itself.

use crate::buffer::Buffer;
use crate::element::{Element, ElementId, FlowResult};
use crate::error::{FlowError, LinkError};
use crate::pad::{Pad, PadDirection, PadRef};
use crate::state::{ElementState, State};

pub(crate) struct Node {
    pub name: String,
    pub element: Option<Box<dyn Element>>,
    pub sinks: Vec<Pad>,
    pub sources: Vec<Pad>,
    pub state: ElementState,
}

/// Elements plus the links between their pads.
#[derive(Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph holds no element.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> Vec<ElementId> {
        (0..self.nodes.len() as u32).map(ElementId).collect()
    }

    /// Adds an element with its pads; the element starts in Idle.
    pub fn add(&mut self, element: Box<dyn Element>) -> ElementId {
        let id = ElementId(self.nodes.len() as u32);
        let sinks = (0..element.sink_pads())
            .map(|i| Pad::new(id, PadDirection::Sink, i))
            .collect();
        let sources = (0..element.source_pads())
            .map(|i| Pad::new(id, PadDirection::Source, i))
            .collect();
        self.nodes.push(Node {
            name: element.name().to_owned(),
            element: Some(element),
            sinks,
            sources,
            state: ElementState::Settled(State::Idle),
        });
        id
    }

    pub(crate) fn node(&self, id: ElementId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    pub(crate) fn node_mut(&mut self, id: ElementId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)
    }

    /// Element name.
    pub fn name(&self, id: ElementId) -> Option<&str> {
        self.node(id).map(|n| n.name.as_str())
    }

    /// First element with the given name.
    pub fn find(&self, name: &str) -> Option<ElementId> {
        self.nodes
            .iter()
            .position(|n| n.name == name)
            .map(|i| ElementId(i as u32))
    }

    /// Sink pads of an element.
    pub fn sink_pads(&self, id: ElementId) -> Option<&[Pad]> {
        self.node(id).map(|n| n.sinks.as_slice())
    }

    /// Source pads of an element.
    pub fn source_pads(&self, id: ElementId) -> Option<&[Pad]> {
        self.node(id).map(|n| n.sources.as_slice())
    }

    /// Lifecycle position of an element.
    pub fn state(&self, id: ElementId) -> Option<ElementState> {
        self.node(id).map(|n| n.state)
    }

    /// Links the next free source pad of `from` to the next free sink pad of `to`.
    pub fn link(&mut self, from: ElementId, to: ElementId) -> Result<(), LinkError> {
        let src = self
            .node(from)
            .ok_or(LinkError::UnknownElement(from))?
            .sources
            .iter()
            .position(|p| !p.is_linked())
            .ok_or(LinkError::NoFreeSourcePad(from))?;
        let sink = self
            .node(to)
            .ok_or(LinkError::UnknownElement(to))?
            .sinks
            .iter()
            .position(|p| !p.is_linked())
            .ok_or(LinkError::NoFreeSinkPad(to))?;
        self.link_pads(from, src, to, sink)
    }

    /// Links source pad `src` of `from` to sink pad `sink` of `to`.
    pub fn link_pads(
        &mut self,
        from: ElementId,
        src: usize,
        to: ElementId,
        sink: usize,
    ) -> Result<(), LinkError> {
        let free = |pads: Option<&[Pad]>, element: ElementId, pad: usize| match pads {
            None => Err(LinkError::UnknownElement(element)),
            Some(pads) => match pads.get(pad) {
                Some(p) if !p.is_linked() => Ok(p.address()),
                _ => Err(LinkError::PadUnavailable { element, pad }),
            },
        };
        let src_ref = free(self.source_pads(from), from, src)?;
        let sink_ref = free(self.sink_pads(to), to, sink)?;
        if from == to || self.reaches(to, from) {
            return Err(LinkError::Cycle { from, to });
        }
        if let Some(n) = self.node_mut(from) {
            n.sources[src].set_peer(sink_ref);
        }
        if let Some(n) = self.node_mut(to) {
            n.sinks[sink].set_peer(src_ref);
        }
        tracing::debug!(
            "pipeline_link: {}[{src}] -> {}[{sink}]",
            self.nodes[from.0 as usize].name,
            self.nodes[to.0 as usize].name
        );
        Ok(())
    }

    /// Whether data leaving `from` can reach `to`.
    fn reaches(&self, from: ElementId, to: ElementId) -> bool {
        let mut stack = vec![from];
        let mut seen = vec![false; self.nodes.len()];
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            let Some(node) = self.node(id) else { continue };
            if std::mem::replace(&mut seen[id.0 as usize], true) {
                continue;
            }
            stack.extend(node.sources.iter().filter_map(|p| p.peer()).map(|p| p.element));
        }
        false
    }

    /// Runs `f` with the element temporarily borrowed out of its slot.
    pub fn with_element<R>(
        &mut self,
        id: ElementId,
        f: impl FnOnce(&mut dyn Element) -> R,
    ) -> Option<R> {
        let element = self.node_mut(id)?.element.as_deref_mut()?;
        Some(f(element))
    }

    /// Asks element `id` to produce its next frame.
    pub fn pull(&mut self, id: ElementId) -> FlowResult {
        self.run(id, |element, ctx| element.pull(ctx))
    }

    /// Delivers `buffer` to sink pad `pad` of element `id`, as if a linked
    /// upstream element had submitted it.
    pub fn feed(&mut self, id: ElementId, pad: usize, buffer: &dyn Buffer) -> FlowResult {
        if buffer.payload().is_none() {
            return Err(FlowError::NullPayload);
        }
        let sink = PadRef {
            element: id,
            direction: PadDirection::Sink,
            index: pad,
        };
        self.deliver(sink, buffer)
    }

    fn run(
        &mut self,
        id: ElementId,
        f: impl FnOnce(&mut dyn Element, &mut FlowContext<'_>) -> FlowResult,
    ) -> FlowResult {
        let node = self.node_mut(id).ok_or(FlowError::Reentrant(id))?;
        let mut element = node.element.take().ok_or(FlowError::Reentrant(id))?;
        let result = {
            let mut ctx = FlowContext {
                graph: self,
                element: id,
            };
            f(element.as_mut(), &mut ctx)
        };
        if let Some(node) = self.node_mut(id) {
            node.element = Some(element);
        }
        result
    }

    fn deliver(&mut self, sink: PadRef, buffer: &dyn Buffer) -> FlowResult {
        let node = self.node_mut(sink.element).ok_or(FlowError::Reentrant(sink.element))?;
        let pad = node.sinks.get_mut(sink.index).ok_or(FlowError::NoSuchPad {
            element: sink.element,
            pad: sink.index,
        })?;
        if pad.is_busy() {
            return Err(FlowError::PadBusy {
                element: sink.element,
                pad: sink.index,
            });
        }
        pad.set_busy(true);
        let result = self.run(sink.element, |element, ctx| {
            element.process(ctx, sink.index, buffer)
        });
        if let Some(node) = self.node_mut(sink.element) {
            node.sinks[sink.index].set_busy(false);
        }
        result
    }

    fn submit(&mut self, from: ElementId, pad: usize, buffer: &dyn Buffer) -> FlowResult {
        if buffer.payload().is_none() {
            return Err(FlowError::NullPayload);
        }
        let node = self.node_mut(from).ok_or(FlowError::Reentrant(from))?;
        let src = node.sources.get_mut(pad).ok_or(FlowError::NoSuchPad { element: from, pad })?;
        let peer = src.peer().ok_or(FlowError::NotLinked { element: from, pad })?;
        if src.is_busy() {
            return Err(FlowError::PadBusy { element: from, pad });
        }
        src.set_busy(true);
        let result = self.deliver(peer, buffer);
        if let Some(node) = self.node_mut(from) {
            node.sources[pad].set_busy(false);
        }
        result
    }
}

/// Handle an element uses to push buffers downstream from inside
/// `process` or `pull`.
pub struct FlowContext<'g> {
    graph: &'g mut Graph,
    element: ElementId,
}

impl FlowContext<'_> {
    /// Id of the element being run.
    pub fn element(&self) -> ElementId {
        self.element
    }

    /// Number of source pads of the running element.
    pub fn source_pads(&self) -> usize {
        self.graph.node(self.element).map_or(0, |n| n.sources.len())
    }

    /// Whether source pad `pad` has a peer.
    pub fn is_linked(&self, pad: usize) -> bool {
        self.graph
            .node(self.element)
            .and_then(|n| n.sources.get(pad))
            .is_some_and(Pad::is_linked)
    }

    /// Whether sink pad `pad` has a peer.
    pub fn is_sink_linked(&self, pad: usize) -> bool {
        self.graph
            .node(self.element)
            .and_then(|n| n.sinks.get(pad))
            .is_some_and(Pad::is_linked)
    }

    /// Hands `buffer` to the peer of source pad `pad` and runs the peer's
    /// `process` before returning.
    pub fn submit(&mut self, pad: usize, buffer: &dyn Buffer) -> FlowResult {
        self.graph.submit(self.element, pad, buffer)
    }
}
