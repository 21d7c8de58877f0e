//! Bounded publish/subscribe channel owned by a pipeline.
//!
//! Producers publish through a cloneable [`BusSender`], which may live on any
//! thread (device callbacks, timers, control transports). The owning
//! pipeline is the single consumer: it drains the queue and hands every
//! message to each listener in subscription order.
//!
//! Buses are sharded by [`EventType`]; a music pipeline and a voice
//! pipeline never see each other's traffic.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::element::ElementId;
use crate::error::BusError;
use crate::message::Message;
use crate::queue::Queue;

/// Bus queue depth.
pub const BUS_CAPACITY: usize = 10;

/// Audio event class a bus serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Media playback.
    Music,
    /// Call audio.
    Voice,
    /// Tones and prompts.
    Prompt,
    /// Capture.
    Record,
}

/// Wake-up signal raised on every publish.
#[derive(Clone, Default)]
pub struct EventFlag {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl EventFlag {
    /// Raises the flag and wakes a waiter.
    pub fn raise(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock() = true;
        cvar.notify_one();
    }

    /// Clears the flag, returning whether it was raised.
    pub fn take(&self) -> bool {
        std::mem::take(&mut *self.inner.0.lock())
    }

    /// Blocks until raised or `timeout` elapses; clears the flag.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let mut raised = lock.lock();
        if !*raised {
            cvar.wait_for(&mut raised, timeout);
        }
        std::mem::take(&mut *raised)
    }
}

/// Producer handle onto a bus.
#[derive(Clone)]
pub struct BusSender {
    queue: Arc<Queue<Message>>,
    flag: EventFlag,
    event: EventType,
}

impl BusSender {
    /// Enqueues `msg` and raises the event flag.
    pub fn publish(&self, msg: Message) -> Result<(), BusError> {
        let id = msg.id;
        self.queue.push(msg).map_err(|_| BusError::Full(id))?;
        self.flag.raise();
        Ok(())
    }

    /// Event class of the bus.
    pub fn event_type(&self) -> EventType {
        self.event
    }
}

/// Message bus: bounded queue, event flag, ordered listeners.
pub struct Bus {
    queue: Arc<Queue<Message>>,
    flag: EventFlag,
    event: EventType,
    listeners: Vec<ElementId>,
}

impl Bus {
    /// Creates a bus with [`BUS_CAPACITY`] slots.
    pub fn new(event: EventType) -> Self {
        Self::with_capacity(event, BUS_CAPACITY)
    }

    /// Creates a bus with a custom depth.
    pub fn with_capacity(event: EventType, capacity: usize) -> Self {
        Self {
            queue: Arc::new(Queue::new(capacity)),
            flag: EventFlag::default(),
            event,
            listeners: Vec::new(),
        }
    }

    /// New producer handle.
    pub fn sender(&self) -> BusSender {
        BusSender {
            queue: Arc::clone(&self.queue),
            flag: self.flag.clone(),
            event: self.event,
        }
    }

    /// Event class of the bus.
    pub fn event_type(&self) -> EventType {
        self.event
    }

    /// Flag raised on publish.
    pub fn flag(&self) -> &EventFlag {
        &self.flag
    }

    /// Appends `id` to the listener list; duplicates are ignored.
    pub fn subscribe(&mut self, id: ElementId) {
        if !self.listeners.contains(&id) {
            self.listeners.push(id);
        }
    }

    /// Removes `id` from the listener list.
    pub fn unsubscribe(&mut self, id: ElementId) {
        self.listeners.retain(|l| *l != id);
    }

    /// Listeners in delivery order.
    pub fn listeners(&self) -> &[ElementId] {
        &self.listeners
    }

    /// Takes the oldest queued message.
    pub fn try_recv(&self) -> Option<Message> {
        self.queue.pop()
    }

    /// Messages waiting in the queue.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MsgId;

    #[test]
    fn publish_is_bounded_and_raises_flag() {
        let bus = Bus::new(EventType::Music);
        let tx = bus.sender();
        for i in 0..BUS_CAPACITY {
            tx.publish(Message::new(MsgId(i as u16))).unwrap();
        }
        assert!(bus.flag().take());
        assert!(!bus.flag().take());
        assert_eq!(
            tx.publish(Message::new(MsgId::NEED_DATA)),
            Err(BusError::Full(MsgId::NEED_DATA))
        );
        assert_eq!(bus.try_recv().unwrap().id, MsgId(0));
        assert_eq!(bus.pending(), BUS_CAPACITY - 1);
    }

    #[test]
    fn listeners_keep_subscription_order() {
        let mut bus = Bus::new(EventType::Voice);
        bus.subscribe(ElementId(2));
        bus.subscribe(ElementId(0));
        bus.subscribe(ElementId(2));
        bus.subscribe(ElementId(1));
        assert_eq!(bus.listeners(), &[ElementId(2), ElementId(0), ElementId(1)]);
        bus.unsubscribe(ElementId(0));
        assert_eq!(bus.listeners(), &[ElementId(2), ElementId(1)]);
    }

    #[test]
    fn wait_returns_after_publish_from_other_thread() {
        let bus = Bus::new(EventType::Record);
        let tx = bus.sender();
        let t = std::thread::spawn(move || tx.publish(Message::new(MsgId::DATA_READY)));
        assert!(bus.flag().wait(Duration::from_secs(5)));
        t.join().unwrap().unwrap();
        assert_eq!(bus.try_recv().map(|m| m.id), Some(MsgId::DATA_READY));
    }
}
