//! DAC-facing chunk production
//!
//! The output peripheral pulls audio; it periodically asks for a chunk
//! of `channels * frames` words sized to its own register width. A
//! [`ChunkSource`] answers those requests from the shared ring buffer,
//! always returning a full chunk (formatted silence when nothing has
//! arrived yet). Peripheral drivers hold a `ChunkSource` by composition;
//! the word format they need is described by an [`OutputFormat`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::audio::buffer::ChannelRingBuffer;
use crate::audio::format::SampleFormatter;

/// Word format of an output peripheral
#[derive(Debug, Clone, Copy)]
pub struct OutputFormat {
    max_level: u32,
    signed: bool,
}

impl OutputFormat {
    /// PWM-style peripheral: unsigned words, silence at half range.
    /// `range_max` is the peripheral's exclusive range maximum.
    pub const fn pwm(range_max: u32) -> Self {
        Self {
            max_level: range_max - 1,
            signed: false,
        }
    }

    /// I2S-style peripheral: two's-complement words, silence at zero.
    pub const fn i2s(range_max: u32) -> Self {
        Self {
            max_level: range_max - 1,
            signed: true,
        }
    }

    pub const fn max_level(&self) -> u32 {
        self.max_level
    }

    pub const fn signed_samples(&self) -> bool {
        self.signed
    }
}

/// Pulls fixed-size chunks of formatted words from a ring buffer
pub struct ChunkSource {
    fifo: Arc<ChannelRingBuffer>,
    formatter: SampleFormatter,
    channels: usize,
    chunks_filled: AtomicU64,
}

impl ChunkSource {
    pub fn new(fifo: Arc<ChannelRingBuffer>, output: OutputFormat, volume: f32) -> Self {
        let formatter = SampleFormatter::new(volume, output.max_level(), output.signed_samples());
        let channels = fifo.channels();
        Self {
            fifo,
            formatter,
            channels,
            chunks_filled: AtomicU64::new(0),
        }
    }

    /// Fill `out` with frame-interleaved words and return the number of
    /// words written (always `out.len()` rounded down to whole frames).
    pub fn get_chunk(&self, out: &mut [u32]) -> usize {
        let frames = out.len() / self.channels;
        let words = frames * self.channels;
        self.fifo.read(&mut out[..words], frames, &self.formatter);
        self.chunks_filled.fetch_add(1, Ordering::Relaxed);
        words
    }

    /// Number of chunk requests served
    pub fn chunks_filled(&self) -> u64 {
        self.chunks_filled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_levels() {
        let pwm = OutputFormat::pwm(1024);
        assert_eq!(pwm.max_level(), 1023);
        assert!(!pwm.signed_samples());

        let i2s = OutputFormat::i2s(1 << 15);
        assert_eq!(i2s.max_level(), 32767);
        assert!(i2s.signed_samples());
    }

    #[test]
    fn test_chunk_is_always_full() {
        let fifo = Arc::new(ChannelRingBuffer::new(2, 64));
        let source = ChunkSource::new(fifo, OutputFormat::i2s(1 << 15), 1.0);

        // Nothing written yet: a full chunk of silence.
        let mut chunk = vec![0xffff_ffffu32; 2 * 8];
        assert_eq!(source.get_chunk(&mut chunk), 16);
        assert!(chunk.iter().all(|&w| w == 0));
        assert_eq!(source.chunks_filled(), 1);
    }

    #[test]
    fn test_pwm_silence_sits_at_half_scale() {
        let fifo = Arc::new(ChannelRingBuffer::new(2, 64));
        let source = ChunkSource::new(fifo, OutputFormat::pwm(1024), 1.0);

        let mut chunk = vec![0u32; 2 * 4];
        source.get_chunk(&mut chunk);
        assert!(chunk.iter().all(|&w| w == 512));
    }

    #[test]
    fn test_chunk_delivers_buffered_samples() {
        let fifo = Arc::new(ChannelRingBuffer::new(2, 16));
        let left: Vec<i16> = (1..=4).collect();
        let right: Vec<i16> = (11..=14).collect();
        fifo.write(&[&left, &right], 4);

        let source = ChunkSource::new(fifo, OutputFormat::i2s(32769), 1.0);

        // Drain the initial half-buffer gap, then the data arrives in
        // frame-interleaved order.
        let mut gap = vec![0u32; 2 * 8];
        source.get_chunk(&mut gap);

        let mut chunk = vec![0u32; 2 * 4];
        source.get_chunk(&mut chunk);
        assert_eq!(chunk, vec![1, 11, 2, 12, 3, 13, 4, 14]);
    }
}
