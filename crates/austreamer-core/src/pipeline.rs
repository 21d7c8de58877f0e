//! Pipeline: element graph, bus, scheduler and the collective state machine.
//!
//! # State changes
//!
//! [`Pipeline::set_state`] walks from the current state toward the target
//! one [`Transition`] at a time. Every element must acknowledge a step
//! before the pipeline state advances:
//!
//! | Direction | Element order |
//! |-----------|---------------|
//! | Up (toward Play) | insertion order |
//! | Down (toward Idle) | reverse insertion order |
//!
//! An element answering [`StateChange::Async`] parks the step; the pipeline
//! reports [`StateOutcome::Pending`] and resumes when
//! [`poll_pending`](Pipeline::poll_pending) or
//! [`complete_async`](Pipeline::complete_async) sees every pending element
//! finish. A `DEVICE_READY` bus message triggers the same poll.
//!
//! With [`AbortPolicy::Abort`] a failing element rolls the step back: every
//! element already moved receives the inverse transition and the pipeline
//! stays where it was. [`AbortPolicy::Tolerate`] logs the failure and keeps
//! going.
//!
//! # Messages
//!
//! [`dispatch`](Pipeline::dispatch) drains the bus. Each message reaches
//! every listening element in subscription order (never the element that
//! published it), then the pipeline's own handling (`NEED_DATA` pulls
//! scheduled sources, `START_STREAM`/`STOP_STREAM` change state), then the
//! external handler.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use crate::buffer::Buffer;
use crate::bus::{Bus, BusSender, EventType};
use crate::element::{Attachment, Element, ElementId, Flow, FlowResult};
use crate::error::{BusError, PipelineError};
use crate::format::StreamFormat;
use crate::graph::Graph;
use crate::message::{Message, MessageBody, MsgId};
use crate::object::PropValue;
use crate::scheduler::Scheduler;
use crate::state::{Direction, ElementState, State, StateChange, Transition};

/// What to do when an element fails a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AbortPolicy {
    /// Roll the step back and report the failure.
    #[default]
    Abort,
    /// Log the failure and treat the element as transitioned.
    Tolerate,
}

/// Where a state change request ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateOutcome {
    /// The pipeline is resting in this state.
    Reached(State),
    /// The pipeline waits for asynchronous completion of this step.
    Pending(Transition),
}

type MessageHandler = Box<dyn FnMut(&Message) + Send>;

/// An audio pipeline.
pub struct Pipeline {
    name: String,
    format: StreamFormat,
    graph: Graph,
    bus: Bus,
    sender: BusSender,
    scheduler: Scheduler,
    current: State,
    target: State,
    pending: Option<Transition>,
    policy: AbortPolicy,
    handler: Option<MessageHandler>,
}

impl Pipeline {
    /// Creates an idle pipeline with its own bus and scheduler.
    pub fn new(name: impl Into<String>, event: EventType, format: StreamFormat) -> Self {
        let bus = Bus::new(event);
        let sender = bus.sender();
        Self {
            name: name.into(),
            format,
            graph: Graph::new(),
            bus,
            sender,
            scheduler: Scheduler::new(format),
            current: State::Idle,
            target: State::Idle,
            pending: None,
            policy: AbortPolicy::default(),
            handler: None,
        }
    }

    /// Sets the abort policy.
    #[must_use]
    pub fn with_abort_policy(mut self, policy: AbortPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Pipeline name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stream format.
    pub fn format(&self) -> StreamFormat {
        self.format
    }

    /// Current settled state.
    pub fn state(&self) -> State {
        self.current
    }

    /// State the pipeline is heading for.
    pub fn target(&self) -> State {
        self.target
    }

    /// Step waiting for asynchronous completion.
    pub fn pending(&self) -> Option<Transition> {
        self.pending
    }

    /// Direction of the step in progress, if any.
    pub fn direction(&self) -> Option<Direction> {
        self.pending
            .or_else(|| Transition::step(self.current, self.target))
            .map(Transition::direction)
    }

    /// Element graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Scheduler.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Mutable scheduler, e.g. to set `frames_to_stable`.
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Bus.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// New producer handle onto the bus.
    pub fn bus_sender(&self) -> BusSender {
        self.sender.clone()
    }

    /// Installs the handler that sees every message after the listeners.
    pub fn set_message_handler(&mut self, handler: impl FnMut(&Message) + Send + 'static) {
        self.handler = Some(Box::new(handler));
    }

    /// Adds an element; it is attached to the bus and subscribed as a listener.
    pub fn add(&mut self, element: Box<dyn Element>) -> Result<ElementId, PipelineError> {
        self.ensure_idle()?;
        let listens = element.listens();
        let id = self.graph.add(element);
        let attachment = Attachment {
            id,
            bus: self.sender.clone(),
            format: self.format,
        };
        self.graph.with_element(id, |e| e.attach(attachment));
        if listens {
            self.bus.subscribe(id);
        }
        tracing::debug!("pipeline_add: {} <- {} ({id})", self.name, self.element_name(id));
        Ok(id)
    }

    /// Boxes and adds an element.
    pub fn add_element<E: Element + 'static>(&mut self, element: E) -> Result<ElementId, PipelineError> {
        self.add(Box::new(element))
    }

    /// Links the next free pads of `from` and `to`.
    pub fn link(&mut self, from: ElementId, to: ElementId) -> Result<(), PipelineError> {
        self.ensure_idle()?;
        Ok(self.graph.link(from, to)?)
    }

    /// Links specific pads.
    pub fn link_pads(
        &mut self,
        from: ElementId,
        src: usize,
        to: ElementId,
        sink: usize,
    ) -> Result<(), PipelineError> {
        self.ensure_idle()?;
        Ok(self.graph.link_pads(from, src, to, sink)?)
    }

    /// Links consecutive elements of `chain`.
    pub fn link_chain(&mut self, chain: &[ElementId]) -> Result<(), PipelineError> {
        for pair in chain.windows(2) {
            self.link(pair[0], pair[1])?;
        }
        Ok(())
    }

    /// Looks an element up by name.
    pub fn find(&self, name: &str) -> Option<ElementId> {
        self.graph.find(name)
    }

    /// Lifecycle position of an element.
    pub fn element_state(&self, id: ElementId) -> Option<ElementState> {
        self.graph.state(id)
    }

    /// Runs `f` against an element.
    pub fn with_element<R>(
        &mut self,
        id: ElementId,
        f: impl FnOnce(&mut dyn Element) -> R,
    ) -> Option<R> {
        self.graph.with_element(id, f)
    }

    /// Sets a property on an element.
    pub fn set_property(
        &mut self,
        id: ElementId,
        key: &str,
        value: impl Into<PropValue>,
    ) -> Result<(), PipelineError> {
        let value = value.into();
        self.graph
            .with_element(id, |e| e.set_property(key, value))
            .ok_or(PipelineError::UnknownElement(id))??;
        Ok(())
    }

    /// Delivers `buffer` straight to sink pad `pad` of `id`.
    pub fn feed(&mut self, id: ElementId, pad: usize, buffer: &dyn Buffer) -> FlowResult {
        self.graph.feed(id, pad, buffer)
    }

    /// Asks source `id` for its next frame.
    pub fn pull(&mut self, id: ElementId) -> FlowResult {
        self.graph.pull(id)
    }

    fn ensure_idle(&self) -> Result<(), PipelineError> {
        if self.current == State::Idle && self.pending.is_none() {
            Ok(())
        } else {
            Err(PipelineError::NotIdle(self.current))
        }
    }

    fn element_name(&self, id: ElementId) -> &str {
        self.graph.name(id).unwrap_or("?")
    }

    // ------------------------------------------------------------------
    // State machine
    // ------------------------------------------------------------------

    /// Moves toward `target`, one transition at a time.
    ///
    /// While a step is pending the new target is recorded and picked up
    /// once the step completes.
    pub fn set_state(&mut self, target: State) -> Result<StateOutcome, PipelineError> {
        self.target = target;
        if let Some(step) = self.pending {
            return Ok(StateOutcome::Pending(step));
        }
        self.drive()
    }

    /// Re-checks elements of the pending step and resumes when all are done.
    pub fn poll_pending(&mut self) -> Result<StateOutcome, PipelineError> {
        let Some(step) = self.pending else {
            return self.drive();
        };
        let mut waiting = false;
        for id in self.order(step) {
            if self.graph.state(id) != Some(ElementState::Pending(step)) {
                continue;
            }
            let change = self
                .graph
                .with_element(id, |e| e.poll_transition(step))
                .unwrap_or(StateChange::Fail);
            match change {
                StateChange::Success => self.settle(id, step.to()),
                StateChange::Async => waiting = true,
                StateChange::Fail => self.on_failure(id, step)?,
            }
        }
        if waiting {
            return Ok(StateOutcome::Pending(step));
        }
        self.finish_step(step);
        self.drive()
    }

    /// Marks `id` as done with the pending step, then polls the rest.
    pub fn complete_async(&mut self, id: ElementId) -> Result<StateOutcome, PipelineError> {
        if let Some(step) = self.pending {
            if self.graph.state(id) == Some(ElementState::Pending(step)) {
                self.settle(id, step.to());
            }
        }
        self.poll_pending()
    }

    fn drive(&mut self) -> Result<StateOutcome, PipelineError> {
        while let Some(step) = Transition::step(self.current, self.target) {
            match self.run_step(step) {
                Ok(true) => {}
                Ok(false) => return Ok(StateOutcome::Pending(step)),
                Err(err) => {
                    self.target = self.current;
                    return Err(err);
                }
            }
        }
        tracing::info!("{}: reached {:?}", self.name, self.current);
        Ok(StateOutcome::Reached(self.current))
    }

    /// Element order for a step.
    fn order(&self, step: Transition) -> Vec<ElementId> {
        let mut ids = self.graph.ids();
        if step.direction() == Direction::Down {
            ids.reverse();
        }
        ids
    }

    /// Applies `step` to every element. `Ok(false)` when parked.
    fn run_step(&mut self, step: Transition) -> Result<bool, PipelineError> {
        tracing::debug!("{}: {:?}", self.name, step);
        if step.direction() == Direction::Down {
            self.scheduler.change_state(step);
        }
        let mut waiting = false;
        for id in self.order(step) {
            if self.graph.state(id) != Some(ElementState::Settled(step.from())) {
                continue;
            }
            let change = self
                .graph
                .with_element(id, |e| e.change_state(step))
                .unwrap_or(StateChange::Fail);
            match change {
                StateChange::Success => self.settle(id, step.to()),
                StateChange::Async => {
                    tracing::debug!("{}: {} pending {:?}", self.name, self.element_name(id), step);
                    if let Some(node) = self.graph.node_mut(id) {
                        node.state = ElementState::Pending(step);
                    }
                    waiting = true;
                }
                StateChange::Fail => self.on_failure(id, step)?,
            }
        }
        if waiting {
            self.pending = Some(step);
            return Ok(false);
        }
        self.finish_step(step);
        Ok(true)
    }

    fn settle(&mut self, id: ElementId, state: State) {
        if let Some(node) = self.graph.node_mut(id) {
            node.state = ElementState::Settled(state);
        }
    }

    fn on_failure(&mut self, id: ElementId, step: Transition) -> Result<(), PipelineError> {
        let element = self.element_name(id).to_owned();
        match self.policy {
            AbortPolicy::Tolerate => {
                tracing::warn!("{}: {element} failed {step:?}, continuing", self.name);
                self.settle(id, step.to());
                Ok(())
            }
            AbortPolicy::Abort => {
                tracing::warn!("{}: {element} failed {step:?}, rolling back", self.name);
                self.rollback(step);
                Err(PipelineError::TransitionFailed {
                    element,
                    transition: step,
                })
            }
        }
    }

    /// Undoes `step` for every element that already took it.
    fn rollback(&mut self, step: Transition) {
        let undo = step.inverse();
        for id in self.order(step).into_iter().rev() {
            let moved = match self.graph.state(id) {
                Some(ElementState::Settled(s)) => s == step.to(),
                Some(ElementState::Pending(t)) => t == step,
                None => false,
            };
            if !moved {
                continue;
            }
            let change = self.graph.with_element(id, |e| e.change_state(undo));
            if change != Some(StateChange::Success) {
                tracing::warn!("{}: {} could not undo {step:?}", self.name, self.element_name(id));
            }
            self.settle(id, step.from());
        }
        if step.direction() == Direction::Down {
            self.scheduler.change_state(undo);
        }
        self.pending = None;
        self.target = self.current;
    }

    fn finish_step(&mut self, step: Transition) {
        self.current = step.to();
        self.pending = None;
        if step.direction() == Direction::Up {
            self.scheduler.change_state(step);
        }
    }

    /// Brings every element back to Idle without waiting on anyone.
    ///
    /// A pending step is rolled back first. Elements that answer `Async`
    /// on the way down are treated as done and failures are logged.
    fn force_idle(&mut self) {
        if let Some(step) = self.pending {
            tracing::warn!("{}: dropped with {step:?} pending, rolling back", self.name);
            self.rollback(step);
        }
        self.policy = AbortPolicy::Tolerate;
        self.target = State::Idle;
        loop {
            match self.drive() {
                Ok(StateOutcome::Reached(_)) => break,
                Ok(StateOutcome::Pending(step)) => {
                    tracing::warn!("{}: not waiting on {step:?} during teardown", self.name);
                    for id in self.order(step) {
                        if self.graph.state(id) == Some(ElementState::Pending(step)) {
                            self.settle(id, step.to());
                        }
                    }
                    self.finish_step(step);
                }
                Err(err) => {
                    tracing::warn!("{}: teardown failed: {err}", self.name);
                    break;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Scheduling and messages
    // ------------------------------------------------------------------

    /// Timer expiry: publishes `NEED_DATA` when the scheduler ticks.
    pub fn on_timer(&mut self) -> Result<bool, BusError> {
        if !self.scheduler.on_timer() {
            return Ok(false);
        }
        self.sender.publish(Message::new(MsgId::NEED_DATA))?;
        Ok(true)
    }

    /// Feeds elapsed time to the scheduler and publishes the due ticks.
    pub fn advance(&mut self, elapsed: Duration) -> Result<u32, BusError> {
        let due = self.scheduler.advance(elapsed);
        for _ in 0..due {
            self.sender.publish(Message::new(MsgId::NEED_DATA))?;
        }
        Ok(due)
    }

    /// One timer expiry followed by a full bus drain.
    ///
    /// The bus is drained even when the `NEED_DATA` publish fails, so a
    /// full queue clears on the same tick that reports it.
    pub fn tick(&mut self) -> Result<usize, BusError> {
        let published = self.on_timer();
        let handled = self.dispatch();
        published.map(|_| handled)
    }

    /// Drains the bus; returns the number of messages handled.
    pub fn dispatch(&mut self) -> usize {
        let mut handled = 0;
        while let Some(msg) = self.bus.try_recv() {
            handled += 1;
            self.deliver(&msg);
        }
        handled
    }

    fn deliver(&mut self, msg: &Message) {
        for i in 0..self.bus.listeners().len() {
            let id = self.bus.listeners()[i];
            if msg.source == Some(id) {
                continue;
            }
            self.graph.with_element(id, |e| e.handle_message(msg));
        }
        self.react(msg);
        if let Some(handler) = self.handler.as_mut() {
            handler(msg);
        }
    }

    fn react(&mut self, msg: &Message) {
        match msg.id {
            MsgId::NEED_DATA => {
                for id in self.graph.ids() {
                    let scheduled = self.graph.with_element(id, |e| e.is_scheduled());
                    if scheduled == Some(true) {
                        self.pull_source(id);
                    }
                }
            }
            MsgId::DATA_READY => {
                if let MessageBody::Element(id) = msg.body {
                    self.pull_source(id);
                }
            }
            MsgId::DEVICE_READY if self.pending.is_some() => {
                if let Err(err) = self.poll_pending() {
                    tracing::warn!("{}: {err}", self.name);
                }
            }
            MsgId::START_STREAM => self.request(State::Play),
            MsgId::STOP_STREAM => self.request(State::Pause),
            MsgId::END_OF_STREAM => {
                tracing::debug!("{}: end of stream from {:?}", self.name, msg.source);
            }
            _ => {}
        }
    }

    fn request(&mut self, target: State) {
        if let Err(err) = self.set_state(target) {
            tracing::warn!("{}: {err}", self.name);
        }
    }

    fn pull_source(&mut self, id: ElementId) {
        if self.current != State::Play {
            return;
        }
        match self.graph.pull(id) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Eof) => tracing::trace!("{}: {} at end of stream", self.name, self.element_name(id)),
            Err(err) => tracing::warn!("{}: pull {} failed: {err}", self.name, self.element_name(id)),
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if self.current != State::Idle || self.pending.is_some() {
            self.force_idle();
        }
    }
}

/// Shared, lock-serialised access to a pipeline.
///
/// Every `set_state` runs under the same lock, so callers on different
/// threads see their transitions applied one after another.
#[derive(Clone)]
pub struct PipelineHandle(Arc<Mutex<Pipeline>>);

impl PipelineHandle {
    /// Wraps a pipeline.
    pub fn new(pipeline: Pipeline) -> Self {
        Self(Arc::new(Mutex::new(pipeline)))
    }

    /// Locks the pipeline.
    pub fn lock(&self) -> MutexGuard<'_, Pipeline> {
        self.0.lock()
    }

    /// Serialised [`Pipeline::set_state`].
    pub fn set_state(&self, target: State) -> Result<StateOutcome, PipelineError> {
        self.0.lock().set_state(target)
    }

    /// Serialised [`Pipeline::tick`].
    pub fn tick(&self) -> Result<usize, BusError> {
        self.0.lock().tick()
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.0.lock().state()
    }

    /// Producer handle onto the bus; usable without taking the lock.
    pub fn bus_sender(&self) -> BusSender {
        self.0.lock().bus_sender()
    }
}
