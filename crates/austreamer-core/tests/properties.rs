//! Property-based tests for the engine's structural guarantees.
//!
//! - Buffer exclusivity: a held frame cannot be re-required, pool budget is
//!   never oversubscribed
//! - Reframe: output is a prefix of input, in fixed-size frames
//! - Bus: listeners see messages in publish order
//! - Queue: FIFO against a `VecDeque` model
//! - State machine: every element ends up in the pipeline's state

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use proptest::prelude::*;

use austreamer_core::{
    Buffer, Element, ElementState, EventType, FrameBuffer, Message, MsgId, Object, Pipeline,
    Queue, ReframeBuffer, SramPool, State, StreamFormat,
};

struct Listener {
    obj: Object,
    seen: Arc<Mutex<Vec<MsgId>>>,
}

impl Element for Listener {
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
        0
    }

    fn handle_message(&mut self, msg: &Message) {
        self.seen.lock().push(msg.id);
    }
}

fn state_strategy() -> impl Strategy<Value = State> {
    prop::sample::select(State::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // ========================================================================
    // Buffers
    // ========================================================================

    #[test]
    fn held_frame_is_exclusive(first in 1usize..1024, second in 0usize..1024) {
        let mut buf = FrameBuffer::heap();
        prop_assert!(buf.require(first).is_some());
        prop_assert!(buf.require(second).is_none());
        prop_assert_eq!(buf.size(), first);
        buf.release();
        prop_assert!(buf.require(second).is_some());
    }

    #[test]
    fn pool_is_never_oversubscribed(
        capacity in 0usize..4096,
        requests in prop::collection::vec((1usize..512, any::<bool>()), 1..64),
    ) {
        let pool = SramPool::new(capacity);
        let mut held: Vec<FrameBuffer> = Vec::new();
        for (size, release_oldest) in requests {
            let mut buf = FrameBuffer::sram(Arc::clone(&pool));
            let fits = size <= pool.available();
            prop_assert_eq!(buf.require(size).is_some(), fits);
            if fits {
                held.push(buf);
            }
            if release_oldest && !held.is_empty() {
                held.remove(0).release();
            }
            let outstanding: usize = held.iter().map(Buffer::size).sum();
            prop_assert_eq!(pool.used(), outstanding);
            prop_assert!(pool.used() <= capacity);
        }
        held.clear();
        prop_assert_eq!(pool.used(), 0);
    }

    #[test]
    fn reframed_output_is_prefix_of_input(
        out_size in 1usize..64,
        frame_count in 1usize..8,
        seed in prop::collection::vec(any::<u8>(), 0..2048),
        cuts in prop::collection::vec(1usize..512, 1..64),
    ) {
        let mut ring = ReframeBuffer::new(out_size, frame_count);
        let mut input = Vec::new();
        let mut output = Vec::new();
        let mut rest = &seed[..];
        for cut in cuts {
            let (mut chunk, tail) = rest.split_at(cut.min(rest.len()));
            rest = tail;
            input.extend_from_slice(chunk);
            while !chunk.is_empty() {
                let taken = ring.fill_from(chunk);
                prop_assert!(taken > 0 || ring.ready_frames() > 0);
                chunk = &chunk[taken..];
                while ring.advance() {
                    let frame = ring.payload().unwrap_or(&[]);
                    prop_assert_eq!(frame.len(), out_size);
                    output.extend_from_slice(frame);
                    ring.release();
                }
            }
            prop_assert!(ring.buffered() < out_size);
        }
        prop_assert_eq!(output.len(), input.len() / out_size * out_size);
        prop_assert_eq!(&input[..output.len()], &output[..]);
    }

    // ========================================================================
    // Queue
    // ========================================================================

    #[test]
    fn queue_matches_fifo_model(
        capacity in 1usize..16,
        ops in prop::collection::vec(prop::option::of(any::<u32>()), 1..200),
    ) {
        let queue = Queue::new(capacity);
        let mut model = VecDeque::new();
        for op in ops {
            match op {
                Some(v) => {
                    let accepted = queue.push(v).is_ok();
                    prop_assert_eq!(accepted, model.len() < capacity);
                    if accepted {
                        model.push_back(v);
                    }
                }
                None => prop_assert_eq!(queue.pop(), model.pop_front()),
            }
            prop_assert_eq!(queue.len(), model.len());
        }
    }

    // ========================================================================
    // Bus
    // ========================================================================

    #[test]
    fn listeners_see_publish_order(
        listeners in 1usize..6,
        ids in prop::collection::vec(0x200u16..0x300, 0..10),
    ) {
        let mut p = Pipeline::new("bus", EventType::Voice, StreamFormat::default());
        let logs: Vec<_> = (0..listeners)
            .map(|i| {
                let seen = Arc::new(Mutex::new(Vec::new()));
                let listener = Listener { obj: Object::new(format!("l{i}")), seen: Arc::clone(&seen) };
                p.add_element(listener).map(|_| seen)
            })
            .collect::<Result<_, _>>()
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let tx = p.bus_sender();
        for id in &ids {
            prop_assert!(tx.publish(Message::new(MsgId(*id))).is_ok());
        }
        prop_assert_eq!(p.dispatch(), ids.len());
        let expected: Vec<MsgId> = ids.iter().copied().map(MsgId).collect();
        for log in logs {
            prop_assert_eq!(&*log.lock(), &expected);
        }
    }

    // ========================================================================
    // State machine
    // ========================================================================

    #[test]
    fn elements_follow_pipeline_state(
        count in 0usize..5,
        targets in prop::collection::vec(state_strategy(), 1..12),
    ) {
        let mut p = Pipeline::new("fsm", EventType::Music, StreamFormat::default());
        let mut ids = Vec::new();
        for i in 0..count {
            let listener = Listener { obj: Object::new(format!("e{i}")), seen: Arc::default() };
            ids.push(p.add_element(listener).map_err(|e| TestCaseError::fail(e.to_string()))?);
        }
        for target in targets {
            prop_assert!(p.set_state(target).is_ok());
            prop_assert_eq!(p.state(), target);
            prop_assert_eq!(p.scheduler().is_running(), target == State::Play);
            for id in &ids {
                prop_assert_eq!(p.element_state(*id), Some(ElementState::Settled(target)));
            }
        }
    }
}
