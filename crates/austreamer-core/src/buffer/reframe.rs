//! Ring buffer that re-chunks variable-size input into fixed-size frames.
//!
//! Bytes are appended in whatever sizes upstream produces them and read back
//! in windows of exactly `out_size` bytes. Concatenating every emitted frame
//! always yields a prefix of the concatenated input.

use crate::error::FlowError;

use super::{Buffer, BufferKind, Payload};

/// Fixed-size output view over a byte ring of `out_size * frame_count` bytes.
#[derive(Debug)]
pub struct ReframeBuffer {
    ring: Vec<u8>,
    out_size: usize,
    read: usize,
    fill: usize,
    frame: Vec<u8>,
    has_frame: bool,
}

impl ReframeBuffer {
    /// Creates a ring holding `frame_count` frames of `out_size` bytes.
    pub fn new(out_size: usize, frame_count: usize) -> Self {
        Self {
            ring: vec![0; out_size * frame_count.max(1)],
            out_size,
            read: 0,
            fill: 0,
            frame: vec![0; out_size],
            has_frame: false,
        }
    }

    /// Output frame size in bytes.
    pub fn out_size(&self) -> usize {
        self.out_size
    }

    /// Ring capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.ring.len()
    }

    /// Bytes buffered and not yet emitted.
    pub fn buffered(&self) -> usize {
        self.fill
    }

    /// Full frames currently available.
    pub fn ready_frames(&self) -> usize {
        if self.out_size == 0 {
            0
        } else {
            self.fill / self.out_size
        }
    }

    /// Bytes that can be appended before the ring is full.
    pub fn free(&self) -> usize {
        self.ring.len() - self.fill
    }

    /// Copies `data` into the ring and returns the number of ready frames.
    ///
    /// Nothing is copied when `data` does not fit.
    pub fn append(&mut self, data: &[u8]) -> Result<usize, FlowError> {
        let free = self.free();
        if data.len() > free {
            return Err(FlowError::Overflow {
                incoming: data.len(),
                free,
            });
        }
        self.write(data);
        Ok(self.ready_frames())
    }

    /// Copies as much of `data` as fits and returns the number of bytes taken.
    ///
    /// Callers drain with [`advance`](Self::advance) and feed the remainder
    /// until the input is used up.
    pub fn fill_from(&mut self, data: &[u8]) -> usize {
        let taken = data.len().min(self.free());
        self.write(&data[..taken]);
        taken
    }

    fn write(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let cap = self.ring.len();
        let write = (self.read + self.fill) % cap.max(1);
        let first = data.len().min(cap - write);
        self.ring[write..write + first].copy_from_slice(&data[..first]);
        self.ring[..data.len() - first].copy_from_slice(&data[first..]);
        self.fill += data.len();
    }

    /// Moves the next full frame into the output window.
    ///
    /// Returns `false` when fewer than `out_size` bytes are buffered.
    pub fn advance(&mut self) -> bool {
        if self.out_size == 0 || self.fill < self.out_size {
            return false;
        }
        let cap = self.ring.len();
        let first = self.out_size.min(cap - self.read);
        self.frame[..first].copy_from_slice(&self.ring[self.read..self.read + first]);
        self.frame[first..].copy_from_slice(&self.ring[..self.out_size - first]);
        self.read = (self.read + self.out_size) % cap;
        self.fill -= self.out_size;
        self.has_frame = true;
        true
    }

    /// Drops all buffered bytes.
    pub fn clear(&mut self) {
        self.read = 0;
        self.fill = 0;
        self.has_frame = false;
    }
}

impl Buffer for ReframeBuffer {
    fn kind(&self) -> BufferKind {
        BufferKind::Reframe
    }

    fn require(&mut self, _size: usize) -> Option<&mut [u8]> {
        None
    }

    fn payload(&self) -> Option<&[u8]> {
        self.has_frame.then_some(self.frame.as_slice())
    }

    fn size(&self) -> usize {
        self.out_size
    }

    fn release(&mut self) {
        self.has_frame = false;
    }

    fn share(&self) -> Option<Payload> {
        self.payload().map(Payload::copy_from)
    }
}
