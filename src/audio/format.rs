//! Sample formats and DAC word conversion
//!
//! Two concerns live here: decoding wire samples into the ring buffer's
//! native signed 16-bit width, and converting stored samples into the
//! unsigned words a DAC peripheral consumes.

/// PCM sample format carried in the per-channel payload blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// 8-bit unsigned
    U8,
    /// 16-bit signed, little-endian
    S16,
    /// 24-bit signed, little-endian, three bytes per sample
    S24,
    /// 32-bit unsigned, little-endian
    U32,
}

impl SampleFormat {
    /// Bytes one sample occupies on the wire
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::S16 => 2,
            Self::S24 => 3,
            Self::U32 => 4,
        }
    }

    /// Bits per sample as reported in the packet header
    pub const fn bit_depth(self) -> u8 {
        match self {
            Self::U8 => 8,
            Self::S16 => 16,
            Self::S24 => 24,
            Self::U32 => 32,
        }
    }

    /// Full-scale magnitude of the format
    pub const fn factor(self) -> i64 {
        match self {
            Self::U8 => (1 << 7) - 1,
            Self::S16 => (1 << 15) - 1,
            Self::S24 => (1 << 23) - 1,
            Self::U32 => (1 << 31) - 1,
        }
    }

    /// The value representing silence
    pub const fn null_level(self) -> i64 {
        match self {
            Self::U8 => 1 << 7,
            Self::S16 => 0,
            Self::S24 => 0,
            Self::U32 => 1 << 31,
        }
    }

    /// Decode one channel block of wire samples into native i16 samples,
    /// narrowing or widening as needed.
    ///
    /// `bytes.len()` must equal `out.len() * self.bytes_per_sample()`.
    pub fn decode_block(self, bytes: &[u8], out: &mut [i16]) {
        debug_assert_eq!(bytes.len(), out.len() * self.bytes_per_sample());

        match self {
            Self::U8 => {
                for (dst, &b) in out.iter_mut().zip(bytes) {
                    *dst = (b as i16 - 128) << 8;
                }
            }
            Self::S16 => {
                for (dst, pair) in out.iter_mut().zip(bytes.chunks_exact(2)) {
                    *dst = i16::from_le_bytes([pair[0], pair[1]]);
                }
            }
            Self::S24 => {
                for (dst, triple) in out.iter_mut().zip(bytes.chunks_exact(3)) {
                    // Sign-extend the 24-bit value through the top of an
                    // i32, then keep the most significant 16 bits.
                    let wide =
                        i32::from_le_bytes([0, triple[0], triple[1], triple[2]]) >> 8;
                    *dst = (wide >> 8) as i16;
                }
            }
            Self::U32 => {
                for (dst, quad) in out.iter_mut().zip(bytes.chunks_exact(4)) {
                    let v = u32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]);
                    *dst = ((v >> 16) as i32 - (1 << 15)) as i16;
                }
            }
        }
    }
}

/// Converts native signed 16-bit samples into the unsigned words a DAC
/// peripheral expects.
///
/// For a signed (I2S-style) target, silence sits at zero; for an
/// unsigned-offset (PWM-style) target, silence sits at half the
/// peripheral's full scale so the duty cycle matches the zero crossing.
#[derive(Debug, Clone, Copy)]
pub struct SampleFormatter {
    amp: f32,
    offset: f32,
}

impl SampleFormatter {
    /// `volume` in `[0, 1]`, `max_level` the peripheral full scale,
    /// `signed_target` whether the peripheral takes two's-complement words.
    pub fn new(volume: f32, max_level: u32, signed_target: bool) -> Self {
        let amp = volume * max_level as f32 / if signed_target { 1.0 } else { 2.0 };
        let offset = if signed_target {
            0.0
        } else {
            max_level as f32 / 2.0
        };
        Self { amp, offset }
    }

    /// Convert one sample to a target word
    #[inline]
    pub fn apply(&self, sample: i16) -> u32 {
        let fs = f32::from(sample) / 32768.0;
        (fs * self.amp + self.offset).round() as i32 as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s16_decode() {
        let bytes = [0x34, 0x12, 0xff, 0xff];
        let mut out = [0i16; 2];
        SampleFormat::S16.decode_block(&bytes, &mut out);
        assert_eq!(out, [0x1234, -1]);
    }

    #[test]
    fn test_u8_decode_centers_silence() {
        let bytes = [128, 0, 255];
        let mut out = [0i16; 3];
        SampleFormat::U8.decode_block(&bytes, &mut out);
        assert_eq!(out, [0, -32768, 32512]);
    }

    #[test]
    fn test_s24_decode_narrows() {
        // -1, full-scale negative, 0x123456
        let bytes = [0xff, 0xff, 0xff, 0x00, 0x00, 0x80, 0x56, 0x34, 0x12];
        let mut out = [0i16; 3];
        SampleFormat::S24.decode_block(&bytes, &mut out);
        assert_eq!(out, [-1, -32768, 0x1234]);
    }

    #[test]
    fn test_u32_decode_recenters() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0x8000_0000u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0xffff_ffffu32.to_le_bytes());
        let mut out = [0i16; 3];
        SampleFormat::U32.decode_block(&bytes, &mut out);
        assert_eq!(out, [0, -32768, 32767]);
    }

    #[test]
    fn test_format_table() {
        assert_eq!(SampleFormat::S16.bytes_per_sample(), 2);
        assert_eq!(SampleFormat::S24.bytes_per_sample(), 3);
        assert_eq!(SampleFormat::S16.bit_depth(), 16);
        assert_eq!(SampleFormat::S16.factor(), (1 << 15) - 1);
        assert_eq!(SampleFormat::S16.null_level(), 0);
        assert_eq!(SampleFormat::U32.null_level(), 1 << 31);
    }

    #[test]
    fn test_signed_target_is_identity_at_unity() {
        // max_level 32768 at unity volume makes apply() the identity.
        let f = SampleFormatter::new(1.0, 32768, true);
        assert_eq!(f.apply(0), 0);
        assert_eq!(f.apply(1), 1);
        assert_eq!(f.apply(-1) as i32, -1);
        assert_eq!(f.apply(-32768) as i32, -32768);
    }

    #[test]
    fn test_unsigned_target_centers_at_half_scale() {
        let f = SampleFormatter::new(1.0, 1023, false);
        // amp = 511.5, offset = 511.5
        assert_eq!(f.apply(0), 512);
        assert_eq!(f.apply(32767), 1023);
        assert_eq!(f.apply(-32768), 0);
    }

    #[test]
    fn test_volume_scales_amplitude() {
        let full = SampleFormatter::new(1.0, 32768, true);
        let half = SampleFormatter::new(0.5, 32768, true);
        assert_eq!(half.apply(16384), 8192);
        assert_eq!(full.apply(16384), 16384);
        // silence is volume-independent
        assert_eq!(half.apply(0), full.apply(0));
    }
}
