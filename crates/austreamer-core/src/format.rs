//! Stream format and 16-bit PCM helpers.
//!
//! Frames travel between stages as interleaved little-endian `i16` PCM.
//! Processing stages that work in floating point convert at their edges with
//! [`pcm16_to_f32`] and [`f32_to_pcm16`].

/// Bytes per PCM sample.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Negotiated format of a pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Samples per channel in one frame (one scheduler tick).
    pub frame_samples: u32,
}

impl Default for StreamFormat {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            frame_samples: 256,
        }
    }
}

impl StreamFormat {
    /// Creates a format.
    pub fn new(sample_rate: u32, channels: u16, frame_samples: u32) -> Self {
        Self {
            sample_rate,
            channels,
            frame_samples,
        }
    }

    /// Interleaved samples in one frame.
    pub fn frame_len(&self) -> usize {
        self.frame_samples as usize * usize::from(self.channels)
    }

    /// Bytes in one frame.
    pub fn frame_bytes(&self) -> usize {
        self.frame_len() * BYTES_PER_SAMPLE
    }

    /// Frame duration in microseconds.
    pub fn frame_micros(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        u64::from(self.frame_samples) * 1_000_000 / u64::from(self.sample_rate)
    }
}

/// Decodes little-endian `i16` PCM into `out`, scaled to [-1.0, 1.0).
pub fn pcm16_to_f32(bytes: &[u8], out: &mut Vec<f32>) {
    out.clear();
    out.extend(
        bytes
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|b| f32::from(i16::from_le_bytes([b[0], b[1]])) / 32768.0),
    );
}

/// Encodes samples as little-endian `i16` PCM, saturating out-of-range input.
///
/// Writes `min(samples.len(), out.len() / 2)` samples.
pub fn f32_to_pcm16(samples: &[f32], out: &mut [u8]) {
    for (s, b) in samples.iter().zip(out.chunks_exact_mut(BYTES_PER_SAMPLE)) {
        let v = (s * 32768.0).round().clamp(-32768.0, 32767.0) as i16;
        b.copy_from_slice(&v.to_le_bytes());
    }
}
