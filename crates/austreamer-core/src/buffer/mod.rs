//! Frame buffers exchanged between pipeline stages.
//!
//! Every stage hands data downstream as a `&dyn Buffer`. The payload of a
//! buffer is only valid between a successful [`Buffer::require`] and the
//! matching [`Buffer::release`]; a sink that wants to keep data beyond the
//! synchronous `process` call must take a [`Payload`] handle via
//! [`Buffer::share`] or copy.
//!
//! # Variants
//!
//! | Type | Kind | Payload |
//! |------|------|---------|
//! | [`FrameBuffer::heap`] | [`BufferKind::Heap`] | exclusive, heap allocated |
//! | [`FrameBuffer::sram`] | [`BufferKind::Sram`] | exclusive, drawn from an [`SramPool`] budget |
//! | [`ShadowBuffer`] | [`BufferKind::Shadow`] | aliases an upstream payload |
//! | [`ReframeBuffer`] | [`BufferKind::Reframe`] | fixed-size window over a byte ring |
//! | [`EmptyBuffer`] | [`BufferKind::Empty`] | zero bytes |
//!
//! Exclusive buffers refuse a second `require` until `release`; pool
//! exhaustion is reported as `None`, never a panic.

mod empty;
mod frame;
mod pool;
mod reframe;
mod shadow;

use std::ops::Deref;
use std::sync::Arc;

pub use empty::EmptyBuffer;
pub use frame::FrameBuffer;
pub use pool::{PoolLease, SramPool};
pub use reframe::ReframeBuffer;
pub use shadow::{ShadowBuffer, ShadowGroup};

/// Storage class of a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// General purpose heap allocation.
    Heap,
    /// Budgeted on-chip memory.
    Sram,
    /// Zero-copy alias of another buffer's payload.
    Shadow,
    /// Fixed-size view over a ring of appended bytes.
    Reframe,
    /// No payload bytes.
    Empty,
}

/// Object-safe contract shared by all buffer variants.
pub trait Buffer: Send {
    /// Storage class of this buffer.
    fn kind(&self) -> BufferKind;

    /// Acquires a writable payload of `size` bytes.
    ///
    /// Returns `None` when the buffer is already held, when the variant
    /// cannot allocate (shadow, reframe), or when the backing pool is
    /// exhausted.
    fn require(&mut self, size: usize) -> Option<&mut [u8]>;

    /// Readable payload, or `None` outside a require/release window.
    fn payload(&self) -> Option<&[u8]>;

    /// Payload size in bytes; zero when no payload is held.
    fn size(&self) -> usize {
        self.payload().map_or(0, <[u8]>::len)
    }

    /// Ends the require/release window. Releasing twice is a no-op.
    fn release(&mut self);

    /// Shared handle to the payload, if the variant can hand one out
    /// without copying.
    fn share(&self) -> Option<Payload> {
        None
    }
}

/// Backing bytes of a payload plus an optional pool lease.
///
/// The lease returns its bytes to the pool when the last handle drops.
#[derive(Debug)]
pub(crate) struct Chunk {
    pub(crate) bytes: Vec<u8>,
    pub(crate) _lease: Option<PoolLease>,
}

/// Reference-counted, read-only handle to frame bytes.
///
/// Cloning is cheap. The underlying allocation (and any pool budget it
/// holds) is released when the last handle is dropped.
#[derive(Clone, Debug)]
pub struct Payload(pub(crate) Arc<Chunk>);

impl Payload {
    /// Copies `bytes` into a fresh heap payload.
    pub fn copy_from(bytes: &[u8]) -> Self {
        Self(Arc::new(Chunk {
            bytes: bytes.to_vec(),
            _lease: None,
        }))
    }

    /// Payload bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.0.bytes
    }

    /// Number of handles currently alive.
    pub fn handles(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Whether two handles alias the same bytes.
    pub fn ptr_eq(&self, other: &Payload) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for Payload {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}
