//! PCM taps for offline analysis.
//!
//! A sniffer copies the input and output of a kernel to a debug channel.
//! It is on only while both its own enable sub-block and the global
//! activation sub-block are set. The default channel publishes
//! [`MsgId::NODE_DATA`] messages on the pipeline bus; the transport turns
//! those into node-data notifications.

use austreamer_core::{BusError, BusSender, ElementId, Message, MessageBody, MsgId, SniffPoint};

/// Destination of sniffed frames.
pub trait SniffChannel: Send {
    /// Sends one tapped frame of little-endian `i16` PCM.
    fn send(&mut self, tap: Tap<'_>) -> Result<(), BusError>;
}

/// One tapped frame.
#[derive(Clone, Copy, Debug)]
pub struct Tap<'a> {
    /// Kernel side the frame was taken from.
    pub point: SniffPoint,
    /// Node index of the tapping element.
    pub index: u8,
    /// Sample rate of the frame.
    pub sample_rate: u32,
    /// Interleaved channels.
    pub channels: u16,
    /// PCM bytes.
    pub pcm: &'a [u8],
}

/// Channel publishing taps as bus messages.
pub struct BusSniffer {
    bus: BusSender,
    element: ElementId,
}

impl BusSniffer {
    /// Channel publishing on `bus` on behalf of `element`.
    pub fn new(bus: BusSender, element: ElementId) -> Self {
        Self { bus, element }
    }
}

impl SniffChannel for BusSniffer {
    fn send(&mut self, tap: Tap<'_>) -> Result<(), BusError> {
        let body = MessageBody::Pcm {
            point: tap.point,
            index: tap.index,
            sample_rate: tap.sample_rate,
            channels: tap.channels,
            data: tap.pcm.to_vec(),
        };
        self.bus
            .publish(Message::with_body(MsgId::NODE_DATA, body).from_element(self.element))
    }
}

/// Enable/activate gate in front of a [`SniffChannel`].
#[derive(Default)]
pub struct Sniffer {
    enabled: bool,
    active: bool,
    channel: Option<Box<dyn SniffChannel>>,
}

impl Sniffer {
    /// Static per-element switch.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Dynamic global switch.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Installs the destination.
    pub fn set_channel(&mut self, channel: Box<dyn SniffChannel>) {
        self.channel = Some(channel);
    }

    /// Whether a destination is installed.
    pub fn has_channel(&self) -> bool {
        self.channel.is_some()
    }

    /// Whether frames are currently forwarded.
    pub fn is_on(&self) -> bool {
        self.enabled && self.active && self.channel.is_some()
    }

    /// Forwards `tap` when on. Channel errors are logged, never raised.
    pub fn tap(&mut self, tap: Tap<'_>) {
        if !(self.enabled && self.active) {
            return;
        }
        if let Some(channel) = self.channel.as_mut()
            && let Err(err) = channel.send(tap)
        {
            tracing::warn!("sniffer: {err}");
        }
    }
}
