//! Bounded claim/finish ring for cross-context hand-off.
//!
//! Producers (any thread or interrupt-like context) reserve a slot with
//! [`Queue::claim_write`], fill it and call [`WriteClaim::finish`]. The
//! single consumer takes slots in claim order with [`Queue::claim_read`].
//! A write claim dropped without `finish` marks its slot skipped so the
//! consumer never stalls behind an abandoned producer.
//!
//! ```text
//!   EMPTY ──claim_write──▶ WRITING ──finish──▶ FULL ──claim_read──▶ READING ──finish──▶ EMPTY
//!                             └──drop──▶ SKIPPED ──(consumer)──────────────────────────▶ EMPTY
//! ```

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use parking_lot::Mutex;

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const FULL: u8 = 2;
const SKIPPED: u8 = 3;
const READING: u8 = 4;

struct Slot<T> {
    state: AtomicU8,
    value: Mutex<Option<T>>,
}

/// Fixed-capacity multi-producer, single-consumer ring.
pub struct Queue<T> {
    slots: Box<[Slot<T>]>,
    /// Next write ticket.
    head: AtomicUsize,
    /// Next read ticket. Only the consumer advances it.
    tail: AtomicUsize,
}

impl<T> Queue<T> {
    /// Creates a queue with room for `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity.max(1))
            .map(|_| Slot {
                state: AtomicU8::new(EMPTY),
                value: Mutex::new(None),
            })
            .collect();
        Self {
            slots,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Claimed slots not yet consumed, including in-flight writes.
    pub fn len(&self) -> usize {
        self.head
            .load(Ordering::Acquire)
            .wrapping_sub(self.tail.load(Ordering::Acquire))
    }

    /// Whether no slot is claimed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether every slot is claimed.
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    /// Reserves the next slot for writing, or `None` when full.
    pub fn claim_write(&self) -> Option<WriteClaim<'_, T>> {
        let mut head = self.head.load(Ordering::Acquire);
        loop {
            let tail = self.tail.load(Ordering::Acquire);
            if head.wrapping_sub(tail) >= self.capacity() {
                return None;
            }
            match self.head.compare_exchange_weak(
                head,
                head.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    let index = head % self.capacity();
                    self.slots[index].state.store(WRITING, Ordering::Release);
                    return Some(WriteClaim {
                        queue: self,
                        index,
                        finished: false,
                    });
                }
                Err(actual) => head = actual,
            }
        }
    }

    /// Claims the oldest finished slot for reading.
    ///
    /// Skipped slots are recycled on the way. Returns `None` when the queue
    /// is empty or the oldest claim is still being written.
    pub fn claim_read(&self) -> Option<ReadClaim<'_, T>> {
        loop {
            let tail = self.tail.load(Ordering::Acquire);
            if tail == self.head.load(Ordering::Acquire) {
                return None;
            }
            let index = tail % self.capacity();
            let slot = &self.slots[index];
            match slot.state.load(Ordering::Acquire) {
                FULL => {
                    slot.state.store(READING, Ordering::Release);
                    return Some(ReadClaim {
                        queue: self,
                        index,
                        finished: false,
                    });
                }
                SKIPPED => {
                    slot.state.store(EMPTY, Ordering::Release);
                    self.tail.store(tail.wrapping_add(1), Ordering::Release);
                }
                _ => return None,
            }
        }
    }

    /// Claims, writes and finishes in one step. Gives `value` back when full.
    pub fn push(&self, value: T) -> Result<(), T> {
        match self.claim_write() {
            Some(claim) => {
                claim.finish(value);
                Ok(())
            }
            None => Err(value),
        }
    }

    /// Takes the oldest finished entry.
    pub fn pop(&self) -> Option<T> {
        self.claim_read().and_then(ReadClaim::finish)
    }
}

/// Reserved write slot. Dropping it without [`finish`](Self::finish) skips the slot.
pub struct WriteClaim<'a, T> {
    queue: &'a Queue<T>,
    index: usize,
    finished: bool,
}

impl<T> WriteClaim<'_, T> {
    /// Stores `value` and publishes the slot to the consumer.
    pub fn finish(mut self, value: T) {
        let slot = &self.queue.slots[self.index];
        *slot.value.lock() = Some(value);
        slot.state.store(FULL, Ordering::Release);
        self.finished = true;
    }
}

impl<T> Drop for WriteClaim<'_, T> {
    fn drop(&mut self) {
        if !self.finished {
            self.queue.slots[self.index]
                .state
                .store(SKIPPED, Ordering::Release);
        }
    }
}

/// Claimed read slot. Dropping it without [`finish`](Self::finish) leaves
/// the entry in place for the next read.
pub struct ReadClaim<'a, T> {
    queue: &'a Queue<T>,
    index: usize,
    finished: bool,
}

impl<T> ReadClaim<'_, T> {
    /// Runs `f` against the entry without consuming it.
    pub fn peek<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.queue.slots[self.index].value.lock().as_ref().map(f)
    }

    /// Takes the entry and frees the slot.
    pub fn finish(mut self) -> Option<T> {
        let slot = &self.queue.slots[self.index];
        let value = slot.value.lock().take();
        slot.state.store(EMPTY, Ordering::Release);
        self.queue.tail.fetch_add(1, Ordering::AcqRel);
        self.finished = true;
        value
    }
}

impl<T> Drop for ReadClaim<'_, T> {
    fn drop(&mut self) {
        if !self.finished {
            self.queue.slots[self.index]
                .state
                .store(FULL, Ordering::Release);
        }
    }
}
