//! Channel-demultiplexed ring buffer between network and DAC
//!
//! This is the synchronization point of the whole client: the receive
//! loop writes one packet's worth of per-channel samples at a time, and
//! the DAC's chunk-request callback reads fixed-size frame chunks on its
//! own clock. The two clocks are close but independent, so the buffer
//! absorbs drift; when an index catches its counterpart, the offending
//! index is rewound by half the buffer to re-establish slack instead of
//! blocking or dropping. That recentering is audible as one
//! discontinuity, after which normal operation resumes.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::audio::format::SampleFormatter;

/// Collision log entries suppressed between warnings
const LOG_THROTTLE: u32 = 10_000;

struct Inner {
    /// One sample lane per channel, `length` entries each
    lanes: Vec<Vec<i16>>,
    write_idx: usize,
    read_idx: usize,
    log_throttle: u32,
}

/// Bounded per-channel sample FIFO with a recenter-on-conflict policy
///
/// All index and storage state sits behind a single mutex held across a
/// whole `write` or `read` call; no lock-free claims are made. Writers
/// push channel-blocked samples, readers pull frame-interleaved words
/// already converted for the output peripheral.
pub struct ChannelRingBuffer {
    channels: usize,
    length: usize,
    inner: Mutex<Inner>,
    recenters: AtomicUsize,
}

impl ChannelRingBuffer {
    /// Create a buffer of `length` frames per channel. `length` must be
    /// even so a half-buffer rewind lands on a frame boundary.
    pub fn new(channels: usize, length: usize) -> Self {
        assert!(channels > 0);
        assert!(length >= 2 && length % 2 == 0);

        Self {
            channels,
            length,
            inner: Mutex::new(Inner {
                lanes: vec![vec![0; length]; channels],
                write_idx: 0,
                read_idx: length / 2,
                log_throttle: 0,
            }),
            recenters: AtomicUsize::new(0),
        }
    }

    /// Store `frames` samples per channel. `channel_blocks[c]` holds
    /// channel `c`'s samples in frame order.
    ///
    /// If the write index catches the read index, the write index is
    /// rewound by half the buffer and the event is counted.
    pub fn write(&self, channel_blocks: &[&[i16]], frames: usize) {
        debug_assert_eq!(channel_blocks.len(), self.channels);

        let inner = &mut *self.inner.lock();
        inner.log_throttle = inner.log_throttle.saturating_sub(1);

        for n in 0..frames {
            let idx = inner.write_idx;
            for (lane, block) in inner.lanes.iter_mut().zip(channel_blocks) {
                lane[idx] = block[n];
            }

            inner.write_idx = (idx + 1) % self.length;
            if inner.write_idx == inner.read_idx {
                inner.write_idx = (inner.write_idx + self.length / 2) % self.length;
                self.note_collision(inner, "write");
            }
        }
    }

    /// Fetch `frames` frames, convert each sample through `formatter`,
    /// and store them frame-interleaved into `dest`.
    ///
    /// `dest.len()` must be at least `frames * channels`. If the read
    /// index catches the write index, the read index is rewound by half
    /// the buffer and the event is counted; the call still fills `dest`
    /// completely.
    pub fn read(&self, dest: &mut [u32], frames: usize, formatter: &SampleFormatter) {
        debug_assert!(dest.len() >= frames * self.channels);

        let inner = &mut *self.inner.lock();
        inner.log_throttle = inner.log_throttle.saturating_sub(1);

        for frame in 0..frames {
            let base = frame * self.channels;
            let idx = inner.read_idx;
            for ch in 0..self.channels {
                dest[base + ch] = formatter.apply(inner.lanes[ch][idx]);
            }

            inner.read_idx = (idx + 1) % self.length;
            if inner.read_idx == inner.write_idx {
                inner.read_idx = (inner.read_idx + self.length / 2) % self.length;
                self.note_collision(inner, "read");
            }
        }
    }

    /// Zero all storage and restore the initial half-buffer gap between
    /// the indices.
    pub fn clear(&self) {
        let inner = &mut *self.inner.lock();
        for lane in &mut inner.lanes {
            lane.fill(0);
        }
        inner.write_idx = 0;
        inner.read_idx = self.length / 2;
        inner.log_throttle = 0;

        tracing::debug!(
            channels = self.channels,
            frames = self.length,
            "cleared ring buffer"
        );
    }

    /// Number of recenter events since construction
    pub fn recenter_count(&self) -> usize {
        self.recenters.load(Ordering::Relaxed)
    }

    /// Channel count
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Length in frames per channel
    pub fn length(&self) -> usize {
        self.length
    }

    fn note_collision(&self, inner: &mut Inner, side: &str) {
        self.recenters.fetch_add(1, Ordering::Relaxed);
        if inner.log_throttle == 0 {
            tracing::warn!(side, "ring buffer collision; recentering");
            inner.log_throttle = LOG_THROTTLE;
        }
    }

    #[cfg(test)]
    fn indices(&self) -> (usize, usize) {
        let inner = self.inner.lock();
        (inner.write_idx, inner.read_idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::format::SampleFormatter;

    /// max_level 32768 at unity volume makes the formatter an identity
    fn identity() -> SampleFormatter {
        SampleFormatter::new(1.0, 32768, true)
    }

    #[test]
    fn test_silence_after_clear() {
        let rb = ChannelRingBuffer::new(2, 32);
        let mut dest = vec![0xdead_beefu32; 32];
        rb.read(&mut dest, 16, &identity());
        assert!(dest.iter().all(|&w| w == 0));
    }

    #[test]
    fn test_write_read_preserves_order() {
        let rb = ChannelRingBuffer::new(2, 32);

        let left: Vec<i16> = (1..=8).collect();
        let right: Vec<i16> = (101..=108).collect();
        rb.write(&[&left, &right], 8);

        // Drain the initial half-buffer gap of silence first.
        let mut gap = vec![0u32; 32];
        rb.read(&mut gap, 16, &identity());
        assert!(gap.iter().all(|&w| w == 0));

        let mut dest = vec![0u32; 16];
        rb.read(&mut dest, 8, &identity());
        for n in 0..8 {
            assert_eq!(dest[n * 2], (n + 1) as u32);
            assert_eq!(dest[n * 2 + 1], (n + 101) as u32);
        }
    }

    #[test]
    fn test_overrun_recenters_once() {
        let rb = ChannelRingBuffer::new(1, 16);

        // write=0, read=8: the eighth write lands on the read index and
        // rewinds the write index by half the buffer.
        let samples: Vec<i16> = (1..=8).collect();
        rb.write(&[&samples], 8);

        assert_eq!(rb.recenter_count(), 1);
        let (write_idx, read_idx) = rb.indices();
        assert_eq!(write_idx, 0);
        assert_eq!(read_idx, 8);

        // Steady state resumes: seven more frames fit without conflict.
        let more: Vec<i16> = (9..=15).collect();
        rb.write(&[&more], 7);
        assert_eq!(rb.recenter_count(), 1);
        let (write_idx, read_idx) = rb.indices();
        assert!(write_idx < 16 && read_idx < 16);
    }

    #[test]
    fn test_underrun_recenters_once() {
        let rb = ChannelRingBuffer::new(1, 16);

        // read=8, write=0: the eighth read wraps onto the write index.
        let mut dest = vec![0u32; 8];
        rb.read(&mut dest, 8, &identity());

        assert_eq!(rb.recenter_count(), 1);
        let (write_idx, read_idx) = rb.indices();
        assert_eq!(write_idx, 0);
        assert_eq!(read_idx, 8);
        assert!(dest.iter().all(|&w| w == 0));
    }

    #[test]
    fn test_clear_resets_indices() {
        let rb = ChannelRingBuffer::new(1, 16);
        let samples: Vec<i16> = (1..=5).collect();
        rb.write(&[&samples], 5);

        rb.clear();
        let (write_idx, read_idx) = rb.indices();
        assert_eq!(write_idx, 0);
        assert_eq!(read_idx, 8);

        let mut dest = vec![0u32; 8];
        rb.read(&mut dest, 8, &identity());
        assert!(dest.iter().all(|&w| w == 0));
    }

    #[test]
    fn test_indices_stay_in_range_under_contention() {
        use std::sync::Arc;

        let rb = Arc::new(ChannelRingBuffer::new(2, 64));

        let writer = {
            let rb = rb.clone();
            std::thread::spawn(move || {
                let left = [1i16; 4];
                let right = [2i16; 4];
                for _ in 0..1000 {
                    rb.write(&[&left, &right], 4);
                }
            })
        };
        let reader = {
            let rb = rb.clone();
            std::thread::spawn(move || {
                let f = identity();
                let mut dest = [0u32; 8];
                for _ in 0..1000 {
                    rb.read(&mut dest, 4, &f);
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();

        let (write_idx, read_idx) = rb.indices();
        assert!(write_idx < 64);
        assert!(read_idx < 64);
    }
}
