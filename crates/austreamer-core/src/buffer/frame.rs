//! Exclusive heap and SRAM-backed frame buffers.

use std::sync::Arc;

use super::{Buffer, BufferKind, Chunk, Payload, SramPool};

/// Exclusive frame buffer, heap allocated or charged against an [`SramPool`].
///
/// A payload obtained with [`require`](Buffer::require) is owned by this
/// buffer until [`release`](Buffer::release). Downstream stages may keep a
/// [`Payload`] handle; the pool budget returns when the last handle drops.
#[derive(Debug)]
pub struct FrameBuffer {
    pool: Option<Arc<SramPool>>,
    held: Option<Arc<Chunk>>,
}

impl FrameBuffer {
    /// Heap-backed buffer.
    pub fn heap() -> Self {
        Self {
            pool: None,
            held: None,
        }
    }

    /// Buffer whose payloads are charged against `pool`.
    pub fn sram(pool: Arc<SramPool>) -> Self {
        Self {
            pool: Some(pool),
            held: None,
        }
    }

    /// Heap buffer, or SRAM buffer when a pool is supplied.
    pub fn with_pool(pool: Option<Arc<SramPool>>) -> Self {
        Self { pool, held: None }
    }

    /// Whether a payload is currently held.
    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }

    /// Requires `bytes.len()` bytes and copies `bytes` in.
    pub fn fill_from(&mut self, bytes: &[u8]) -> Option<()> {
        self.require(bytes.len())?.copy_from_slice(bytes);
        Some(())
    }
}

impl Buffer for FrameBuffer {
    fn kind(&self) -> BufferKind {
        if self.pool.is_some() {
            BufferKind::Sram
        } else {
            BufferKind::Heap
        }
    }

    fn require(&mut self, size: usize) -> Option<&mut [u8]> {
        if self.held.is_some() {
            return None;
        }
        let lease = match &self.pool {
            Some(pool) => Some(pool.lease(size)?),
            None => None,
        };
        let chunk = self.held.insert(Arc::new(Chunk {
            bytes: vec![0; size],
            _lease: lease,
        }));
        Arc::get_mut(chunk).map(|c| c.bytes.as_mut_slice())
    }

    fn payload(&self) -> Option<&[u8]> {
        self.held.as_deref().map(|c| c.bytes.as_slice())
    }

    fn release(&mut self) {
        self.held = None;
    }

    fn share(&self) -> Option<Payload> {
        self.held.as_ref().map(|c| Payload(Arc::clone(c)))
    }
}
