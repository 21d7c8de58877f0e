//! Integration tests for the pipeline engine.
//!
//! Covers the end-to-end data path (tone → reframe → sink), SRAM budget
//! accounting, zero-copy fan-out, ordered state changes with async
//! completion and rollback, bus fan-out order, and hardware-driven sources.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use austreamer_core::elements::{
    AudioDevice, CaptureSink, DeviceSink, DeviceSource, Reframe, Splitter, WaveSrc,
};
use austreamer_core::{
    AbortPolicy, Buffer, BusError, Element, ElementId, ElementState, EventType, Flow, FlowContext,
    FlowError, FlowResult, FrameBuffer, Message, MessageBody, MsgId, Object, Pipeline,
    PipelineError, PipelineHandle, SramPool, State, StateChange, StateOutcome, StreamFormat,
    Transition,
};

fn format_16k_mono() -> StreamFormat {
    StreamFormat::new(16_000, 1, 256)
}

type Log = Arc<Mutex<Vec<(String, Transition)>>>;

/// Records every transition and can be told to fail or defer one.
struct Probe {
    obj: Object,
    log: Log,
    fail_on: Option<Transition>,
    async_on: Option<Transition>,
    ready: Arc<AtomicBool>,
    seen: Arc<Mutex<Vec<MsgId>>>,
}

impl Probe {
    fn new(name: &str, log: &Log) -> Self {
        Self {
            obj: Object::new(name),
            log: Arc::clone(log),
            fail_on: None,
            async_on: None,
            ready: Arc::new(AtomicBool::new(false)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing(mut self, t: Transition) -> Self {
        self.fail_on = Some(t);
        self
    }

    fn deferring(mut self, t: Transition) -> (Self, Arc<AtomicBool>) {
        self.async_on = Some(t);
        let ready = Arc::clone(&self.ready);
        (self, ready)
    }
}

impl Element for Probe {
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

    fn change_state(&mut self, t: Transition) -> StateChange {
        self.log.lock().push((self.obj.name().to_owned(), t));
        if self.fail_on == Some(t) {
            StateChange::Fail
        } else if self.async_on == Some(t) && !self.ready.load(Ordering::SeqCst) {
            StateChange::Async
        } else {
            StateChange::Success
        }
    }

    fn poll_transition(&mut self, _t: Transition) -> StateChange {
        if self.ready.load(Ordering::SeqCst) {
            StateChange::Success
        } else {
            StateChange::Async
        }
    }

    fn process(&mut self, ctx: &mut FlowContext<'_>, _pad: usize, buffer: &dyn Buffer) -> FlowResult {
        ctx.submit(0, buffer)
    }

    fn handle_message(&mut self, msg: &Message) {
        self.seen.lock().push(msg.id);
    }
}

fn names(log: &Log) -> Vec<String> {
    log.lock().iter().map(|(n, _)| n.clone()).collect()
}

// ============================================================================
// 1. Data path
// ============================================================================

#[test]
fn one_tick_yields_exactly_one_reframed_chunk() {
    let mut p = Pipeline::new("scenario-a", EventType::Prompt, format_16k_mono());
    let src = p.add_element(WaveSrc::new("src")).unwrap();
    let reframe = p
        .add_element(Reframe::new("reframe").with_out_frame_bytes(320))
        .unwrap();
    let (sink, capture) = CaptureSink::new("sink");
    let sink = p.add_element(sink).unwrap();
    p.link_chain(&[src, reframe, sink]).unwrap();

    assert_eq!(p.set_state(State::Play).unwrap(), StateOutcome::Reached(State::Play));
    assert!(p.scheduler().is_running());
    p.tick().unwrap();

    let frames = capture.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].len(), 320);
}

#[test]
fn reframed_stream_is_prefix_of_source_stream() {
    let mut p = Pipeline::new("prefix", EventType::Music, format_16k_mono());
    let src = p.add_element(WaveSrc::new("src")).unwrap();
    let split = p.add_element(Splitter::new("split", 2)).unwrap();
    let reframe = p
        .add_element(Reframe::new("reframe").with_out_frame_bytes(300))
        .unwrap();
    let (raw, raw_cap) = CaptureSink::new("raw");
    let raw = p.add_element(raw).unwrap();
    let (framed, framed_cap) = CaptureSink::new("framed");
    let framed = p.add_element(framed).unwrap();
    p.link(src, split).unwrap();
    p.link(split, raw).unwrap();
    p.link(split, reframe).unwrap();
    p.link(reframe, framed).unwrap();

    p.set_state(State::Play).unwrap();
    for _ in 0..5 {
        p.tick().unwrap();
    }
    let raw = raw_cap.bytes();
    let framed = framed_cap.bytes();
    assert_eq!(raw.len(), 5 * 512);
    assert_eq!(framed.len(), (5 * 512 / 300) * 300);
    assert_eq!(&raw[..framed.len()], &framed[..]);
    assert!(framed_cap.frames().iter().all(|f| f.len() == 300));
}

#[test]
fn no_data_flows_outside_play() {
    let mut p = Pipeline::new("paused", EventType::Music, format_16k_mono());
    let src = p.add_element(WaveSrc::new("src")).unwrap();
    let (sink, capture) = CaptureSink::new("sink");
    let sink = p.add_element(sink).unwrap();
    p.link(src, sink).unwrap();
    p.set_state(State::Pause).unwrap();
    p.tick().unwrap();
    p.bus_sender().publish(Message::new(MsgId::NEED_DATA)).unwrap();
    p.dispatch();
    assert_eq!(capture.frame_count(), 0);
}

#[test]
fn finite_source_reports_end_of_stream() {
    let mut p = Pipeline::new("prompt", EventType::Prompt, format_16k_mono());
    let src = p.add_element(WaveSrc::new("src")).unwrap();
    // 40 ms at 16 kHz = 640 samples = 2.5 frames of 256
    p.set_property(src, "duration_ms", 40).unwrap();
    let (sink, capture) = CaptureSink::new("sink");
    let sink = p.add_element(sink).unwrap();
    p.link(src, sink).unwrap();
    let eos = Arc::new(AtomicBool::new(false));
    {
        let eos = Arc::clone(&eos);
        p.set_message_handler(move |m| {
            if m.id == MsgId::END_OF_STREAM {
                eos.store(true, Ordering::SeqCst);
            }
        });
    }
    p.set_state(State::Play).unwrap();
    for _ in 0..5 {
        p.tick().unwrap();
    }
    assert_eq!(capture.bytes().len(), 640 * 2);
    assert_eq!(capture.frame_count(), 3);
    assert!(eos.load(Ordering::SeqCst));
    let sink_saw_eos = capture
        .messages()
        .iter()
        .any(|m| m.id == MsgId::END_OF_STREAM && m.body == MessageBody::Element(src));
    assert!(sink_saw_eos);
    assert_eq!(p.pull(src), Ok(Flow::Eof));
}

#[test]
fn input_larger_than_ring_is_reframed_in_pieces() {
    let mut p = Pipeline::new("big-chunks", EventType::Prompt, format_16k_mono());
    let src = p.add_element(WaveSrc::new("src")).unwrap();
    let reframe = p
        .add_element(Reframe::new("reframe").with_out_frame_bytes(320).with_frame_count(1))
        .unwrap();
    let (sink, capture) = CaptureSink::new("sink");
    let sink = p.add_element(sink).unwrap();
    p.link_chain(&[src, reframe, sink]).unwrap();
    p.set_state(State::Play).unwrap();

    for _ in 0..5 {
        p.tick().unwrap();
    }
    // 5 x 512 bytes in, 8 x 320 bytes out.
    let frames = capture.frames();
    assert_eq!(frames.len(), 8);
    assert!(frames.iter().all(|f| f.len() == 320));
}

// ============================================================================
// 2. SRAM budget
// ============================================================================

#[test]
fn exhausted_pool_is_backpressure_and_release_restores_budget() {
    let pool = SramPool::new(1024);
    let mut held: Vec<FrameBuffer> = (0..4).map(|_| FrameBuffer::sram(Arc::clone(&pool))).collect();
    for b in &mut held {
        assert!(b.require(256).is_some());
    }
    assert_eq!(pool.available(), 0);

    let mut extra = FrameBuffer::sram(Arc::clone(&pool));
    assert!(extra.require(1).is_none());

    held[2].release();
    assert_eq!(pool.available(), 256);
    assert!(extra.require(256).is_some());
    assert_eq!(pool.available(), 0);
}

#[test]
fn source_on_exhausted_pool_submits_nothing() {
    let pool = SramPool::new(100);
    let mut p = Pipeline::new("starved", EventType::Music, format_16k_mono());
    let src = p
        .add_element(WaveSrc::new("src").with_pool(Arc::clone(&pool)))
        .unwrap();
    let (sink, capture) = CaptureSink::new("sink");
    let sink = p.add_element(sink).unwrap();
    p.link(src, sink).unwrap();
    p.set_state(State::Play).unwrap();
    assert_eq!(p.pull(src), Err(FlowError::Backpressure(512)));
    assert_eq!(capture.frame_count(), 0);
    assert_eq!(pool.used(), 0);
}

#[test]
fn fan_out_holds_pool_budget_only_during_delivery() {
    let pool = SramPool::new(4096);
    let mut p = Pipeline::new("fan", EventType::Music, format_16k_mono());
    let src = p
        .add_element(WaveSrc::new("src").with_pool(Arc::clone(&pool)))
        .unwrap();
    let split = p.add_element(Splitter::new("split", 3)).unwrap();
    let caps: Vec<_> = (0..3)
        .map(|i| {
            let (sink, cap) = CaptureSink::new(&format!("sink{i}"));
            let id = p.add_element(sink).unwrap();
            p.link(split, id).unwrap();
            cap
        })
        .collect();
    p.link(src, split).unwrap();
    p.set_state(State::Play).unwrap();
    p.tick().unwrap();
    assert_eq!(pool.used(), 0);
    let first = caps[0].bytes();
    assert_eq!(first.len(), 512);
    assert!(caps.iter().all(|c| c.bytes() == first));
}

// ============================================================================
// 3. State machine
// ============================================================================

#[test]
fn up_runs_in_insertion_order_and_down_in_reverse() {
    let log: Log = Arc::default();
    let mut p = Pipeline::new("order", EventType::Voice, format_16k_mono());
    for name in ["a", "b", "c"] {
        p.add_element(Probe::new(name, &log)).unwrap();
    }
    p.set_state(State::Ready).unwrap();
    assert_eq!(names(&log), ["a", "b", "c"]);
    log.lock().clear();
    p.set_state(State::Idle).unwrap();
    assert_eq!(names(&log), ["c", "b", "a"]);
}

#[test]
fn every_element_matches_pipeline_state_after_each_step() {
    let log: Log = Arc::default();
    let mut p = Pipeline::new("mono", EventType::Voice, format_16k_mono());
    let ids: Vec<ElementId> = (0..4)
        .map(|i| p.add_element(Probe::new(&format!("e{i}"), &log)).unwrap())
        .collect();
    for target in [State::Play, State::Ready, State::Pause, State::Idle, State::Play] {
        p.set_state(target).unwrap();
        assert_eq!(p.state(), target);
        for id in &ids {
            assert_eq!(p.element_state(*id), Some(ElementState::Settled(target)));
        }
    }
    let steps: Vec<Transition> = log.lock().iter().map(|(_, t)| *t).collect();
    // Idle→Play is three steps, each seen by all four elements before the next.
    assert!(steps[..4].iter().all(|t| *t == Transition::IdleToReady));
    assert!(steps[4..8].iter().all(|t| *t == Transition::ReadyToPause));
    assert!(steps[8..12].iter().all(|t| *t == Transition::PauseToPlay));
}

#[test]
fn failure_rolls_back_the_step() {
    let log: Log = Arc::default();
    let mut p = Pipeline::new("abort", EventType::Voice, format_16k_mono());
    let a = p.add_element(Probe::new("a", &log)).unwrap();
    let b = p.add_element(Probe::new("b", &log)).unwrap();
    let c = p
        .add_element(Probe::new("c", &log).failing(Transition::ReadyToPause))
        .unwrap();

    let err = p.set_state(State::Play).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::TransitionFailed { ref element, transition: Transition::ReadyToPause } if element == "c"
    ));
    assert_eq!(p.state(), State::Ready);
    assert_eq!(p.target(), State::Ready);
    for id in [a, b, c] {
        assert_eq!(p.element_state(id), Some(ElementState::Settled(State::Ready)));
    }
    let undo: Vec<_> = log
        .lock()
        .iter()
        .filter(|(_, t)| *t == Transition::PauseToReady)
        .map(|(n, _)| n.clone())
        .collect();
    assert_eq!(undo, ["b", "a"]);
    assert!(!p.scheduler().is_running());
}

#[test]
fn tolerated_failure_keeps_going() {
    let log: Log = Arc::default();
    let mut p = Pipeline::new("tolerate", EventType::Voice, format_16k_mono())
        .with_abort_policy(AbortPolicy::Tolerate);
    let a = p
        .add_element(Probe::new("a", &log).failing(Transition::IdleToReady))
        .unwrap();
    p.add_element(Probe::new("b", &log)).unwrap();
    assert_eq!(p.set_state(State::Pause).unwrap(), StateOutcome::Reached(State::Pause));
    assert_eq!(p.element_state(a), Some(ElementState::Settled(State::Pause)));
}

#[test]
fn async_step_parks_until_completion() {
    let log: Log = Arc::default();
    let mut p = Pipeline::new("async", EventType::Music, format_16k_mono());
    let a = p.add_element(Probe::new("a", &log)).unwrap();
    let (probe, ready) = Probe::new("dev", &log).deferring(Transition::IdleToReady);
    let dev = p.add_element(probe).unwrap();
    let c = p.add_element(Probe::new("c", &log)).unwrap();

    assert_eq!(
        p.set_state(State::Play).unwrap(),
        StateOutcome::Pending(Transition::IdleToReady)
    );
    assert_eq!(p.state(), State::Idle);
    assert_eq!(p.element_state(a), Some(ElementState::Settled(State::Ready)));
    assert_eq!(p.element_state(dev), Some(ElementState::Pending(Transition::IdleToReady)));
    assert_eq!(p.element_state(c), Some(ElementState::Settled(State::Ready)));

    assert_eq!(p.poll_pending().unwrap(), StateOutcome::Pending(Transition::IdleToReady));
    ready.store(true, Ordering::SeqCst);
    p.bus_sender().publish(Message::new(MsgId::DEVICE_READY)).unwrap();
    p.dispatch();
    assert_eq!(p.state(), State::Play);
    assert_eq!(p.element_state(dev), Some(ElementState::Settled(State::Play)));
}

#[test]
fn explicit_completion_resumes_toward_latest_target() {
    let log: Log = Arc::default();
    let mut p = Pipeline::new("complete", EventType::Music, format_16k_mono());
    let (probe, _ready) = Probe::new("dev", &log).deferring(Transition::ReadyToPause);
    let dev = p.add_element(probe).unwrap();
    p.set_state(State::Play).unwrap();
    assert_eq!(p.pending(), Some(Transition::ReadyToPause));
    // Retarget while parked; the pending step still completes first.
    assert_eq!(
        p.set_state(State::Ready).unwrap(),
        StateOutcome::Pending(Transition::ReadyToPause)
    );
    assert_eq!(p.complete_async(dev).unwrap(), StateOutcome::Reached(State::Ready));
    assert_eq!(p.element_state(dev), Some(ElementState::Settled(State::Ready)));
}

#[test]
fn topology_is_frozen_outside_idle() {
    let mut p = Pipeline::new("frozen", EventType::Music, format_16k_mono());
    let src = p.add_element(WaveSrc::new("src")).unwrap();
    p.set_state(State::Ready).unwrap();
    let (sink, _) = CaptureSink::new("late");
    assert!(matches!(p.add_element(sink), Err(PipelineError::NotIdle(State::Ready))));
    assert!(matches!(p.link(src, src), Err(PipelineError::NotIdle(_))));
}

#[test]
fn concurrent_set_state_calls_are_serialised() {
    let log: Log = Arc::default();
    let mut p = Pipeline::new("shared", EventType::Voice, format_16k_mono());
    let ids: Vec<_> = (0..3)
        .map(|i| p.add_element(Probe::new(&format!("e{i}"), &log)).unwrap())
        .collect();
    let handle = PipelineHandle::new(p);
    let workers: Vec<_> = [State::Play, State::Idle, State::Pause, State::Ready]
        .into_iter()
        .map(|target| {
            let handle = handle.clone();
            std::thread::spawn(move || {
                for _ in 0..25 {
                    handle.set_state(target).unwrap();
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }
    let p = handle.lock();
    let state = p.state();
    for id in ids {
        assert_eq!(p.element_state(id), Some(ElementState::Settled(state)));
    }
}

#[test]
fn dropping_mid_transition_tears_down_settled_elements() {
    let log: Log = Arc::default();
    let mut p = Pipeline::new("dropped", EventType::Music, format_16k_mono());
    p.add_element(Probe::new("a", &log)).unwrap();
    let (probe, _ready) = Probe::new("dev", &log).deferring(Transition::IdleToReady);
    p.add_element(probe).unwrap();

    assert_eq!(
        p.set_state(State::Ready).unwrap(),
        StateOutcome::Pending(Transition::IdleToReady)
    );
    drop(p);

    let log = log.lock();
    assert!(log.contains(&("a".to_owned(), Transition::ReadyToIdle)));
    assert!(log.contains(&("dev".to_owned(), Transition::ReadyToIdle)));
}

#[test]
fn dropping_a_playing_pipeline_walks_down_to_idle() {
    let log: Log = Arc::default();
    let mut p = Pipeline::new("playing", EventType::Music, format_16k_mono());
    p.add_element(Probe::new("a", &log)).unwrap();
    p.set_state(State::Play).unwrap();
    log.lock().clear();
    drop(p);

    let steps: Vec<Transition> = log.lock().iter().map(|(_, t)| *t).collect();
    assert_eq!(
        steps,
        vec![Transition::PlayToPause, Transition::PauseToReady, Transition::ReadyToIdle]
    );
}

// ============================================================================
// 4. Bus
// ============================================================================

#[test]
fn listeners_receive_messages_in_publish_and_subscription_order() {
    let log: Log = Arc::default();
    let mut p = Pipeline::new("bus", EventType::Voice, format_16k_mono());
    let probes: Vec<_> = (0..3).map(|i| Probe::new(&format!("l{i}"), &log)).collect();
    let seen: Vec<_> = probes.iter().map(|pr| Arc::clone(&pr.seen)).collect();
    for probe in probes {
        p.add_element(probe).unwrap();
    }
    let order = Arc::new(Mutex::new(Vec::new()));
    {
        let order = Arc::clone(&order);
        let seen = seen.clone();
        p.set_message_handler(move |m| {
            // every listener has seen this message before the external handler
            assert!(seen.iter().all(|s| s.lock().last() == Some(&m.id)));
            order.lock().push(m.id);
        });
    }
    let tx = p.bus_sender();
    let ids = [MsgId(1), MsgId(2), MsgId(3)];
    for id in ids {
        tx.publish(Message::new(id)).unwrap();
    }
    assert_eq!(p.dispatch(), 3);
    for s in &seen {
        assert_eq!(*s.lock(), ids);
    }
    assert_eq!(*order.lock(), ids);
}

#[test]
fn start_and_stop_stream_messages_drive_the_state() {
    let mut p = Pipeline::new("ctl", EventType::Music, format_16k_mono());
    p.add_element(WaveSrc::new("src")).unwrap();
    p.set_state(State::Pause).unwrap();
    let tx = p.bus_sender();
    tx.publish(Message::new(MsgId::START_STREAM)).unwrap();
    p.dispatch();
    assert_eq!(p.state(), State::Play);
    tx.publish(Message::new(MsgId::STOP_STREAM)).unwrap();
    p.dispatch();
    assert_eq!(p.state(), State::Pause);
}

#[test]
fn full_bus_still_drains_on_tick() {
    let mut p = Pipeline::new("flooded", EventType::Music, format_16k_mono());
    let src = p.add_element(WaveSrc::new("src")).unwrap();
    let (sink, capture) = CaptureSink::new("sink");
    let sink = p.add_element(sink).unwrap();
    p.link(src, sink).unwrap();
    p.set_state(State::Play).unwrap();

    let tx = p.bus_sender();
    for _ in 0..austreamer_core::BUS_CAPACITY {
        tx.publish(Message::with_body(MsgId::VOLUME, MessageBody::Volume(50))).unwrap();
    }
    assert_eq!(p.tick(), Err(BusError::Full(MsgId::NEED_DATA)));
    assert_eq!(capture.frame_count(), 0);

    assert!(p.tick().is_ok());
    assert!(p.tick().is_ok());
    assert_eq!(capture.frame_count(), 2);
}

// ============================================================================
// 5. Hardware elements
// ============================================================================

#[derive(Clone, Default)]
struct FakeDac {
    ready: Arc<AtomicBool>,
    written: Arc<Mutex<Vec<Vec<u8>>>>,
    volume: Arc<Mutex<Option<u8>>>,
    running: Arc<AtomicBool>,
}

impl AudioDevice for FakeDac {
    fn open(&mut self, _format: &StreamFormat) -> bool {
        true
    }
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
    fn start(&mut self) -> bool {
        self.running.store(true, Ordering::SeqCst);
        true
    }
    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
    fn close(&mut self) {
        self.ready.store(false, Ordering::SeqCst);
    }
    fn write(&mut self, frame: &[u8]) -> bool {
        self.written.lock().push(frame.to_vec());
        true
    }
    fn set_volume(&mut self, level: u8) {
        *self.volume.lock() = Some(level);
    }
}

#[test]
fn device_sink_waits_for_dma_ready() {
    let dac = FakeDac::default();
    let mut p = Pipeline::new("dac", EventType::Music, format_16k_mono());
    let src = p.add_element(WaveSrc::new("src")).unwrap();
    let sink = p.add_element(DeviceSink::new("dac", dac.clone())).unwrap();
    p.link(src, sink).unwrap();

    assert_eq!(
        p.set_state(State::Play).unwrap(),
        StateOutcome::Pending(Transition::IdleToReady)
    );
    dac.ready.store(true, Ordering::SeqCst);
    assert_eq!(p.poll_pending().unwrap(), StateOutcome::Reached(State::Play));
    assert!(dac.running.load(Ordering::SeqCst));

    p.tick().unwrap();
    assert_eq!(dac.written.lock().len(), 1);

    p.bus_sender()
        .publish(Message::with_body(MsgId::VOLUME, MessageBody::Volume(7)))
        .unwrap();
    p.dispatch();
    assert_eq!(*dac.volume.lock(), Some(7));

    p.set_state(State::Idle).unwrap();
    assert!(!dac.running.load(Ordering::SeqCst));
}

#[test]
fn device_source_is_pulled_on_data_ready() {
    let mut p = Pipeline::new("adc", EventType::Record, format_16k_mono());
    let (source, feed) = DeviceSource::new("adc", 4);
    let src = p.add_element(source).unwrap();
    let (sink, capture) = CaptureSink::new("sink");
    let sink = p.add_element(sink).unwrap();
    p.link(src, sink).unwrap();

    assert!(matches!(p.set_state(State::Play).unwrap(), StateOutcome::Pending(_)));
    feed.mark_ready().unwrap();
    p.dispatch();
    assert_eq!(p.state(), State::Play);

    feed.deliver(vec![1, 2, 3, 4]).unwrap();
    feed.deliver(vec![5, 6]).unwrap();
    p.dispatch();
    assert_eq!(capture.frames(), vec![vec![1, 2, 3, 4], vec![5, 6]]);
    assert_eq!(feed.queued(), 0);
}

#[test]
fn device_frame_survives_backpressure() {
    let pool = SramPool::new(4);
    let mut p = Pipeline::new("adc", EventType::Record, format_16k_mono());
    let (source, feed) = DeviceSource::new("adc", 4);
    let src = p.add_element(source.with_pool(Arc::clone(&pool))).unwrap();
    let (sink, capture) = CaptureSink::new("sink");
    let sink = p.add_element(sink).unwrap();
    p.link(src, sink).unwrap();
    p.set_state(State::Play).unwrap();
    feed.mark_ready().unwrap();
    p.dispatch();
    assert_eq!(p.state(), State::Play);

    let mut hog = FrameBuffer::sram(Arc::clone(&pool));
    assert!(hog.require(4).is_some());
    feed.deliver(vec![1, 2, 3, 4]).unwrap();
    assert_eq!(p.pull(src), Err(FlowError::Backpressure(4)));
    assert_eq!(feed.queued(), 1);

    hog.release();
    assert_eq!(p.pull(src), Ok(Flow::Continue));
    assert_eq!(capture.frames(), vec![vec![1, 2, 3, 4]]);
    assert_eq!(feed.queued(), 0);
}

#[test]
fn submitting_through_unlinked_pad_is_an_error() {
    let mut p = Pipeline::new("dangling", EventType::Music, format_16k_mono());
    let src = p.add_element(WaveSrc::new("src")).unwrap();
    p.set_state(State::Play).unwrap();
    assert_eq!(
        p.pull(src),
        Err(FlowError::NotLinked { element: src, pad: 0 })
    );
}
