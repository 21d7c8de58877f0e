use super::{Buffer, BufferKind};

/// Zero-byte buffer, used where a stage signals without carrying audio.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyBuffer;

impl Buffer for EmptyBuffer {
    fn kind(&self) -> BufferKind {
        BufferKind::Empty
    }

    fn require(&mut self, size: usize) -> Option<&mut [u8]> {
        if size == 0 { Some(&mut []) } else { None }
    }

    fn payload(&self) -> Option<&[u8]> {
        Some(&[])
    }

    fn release(&mut self) {}
}
