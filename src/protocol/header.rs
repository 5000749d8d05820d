//! JackTrip packet header codec
//!
//! Every audio datagram starts with a fixed 16-byte header, laid out
//! little-endian with no padding so that a stock JackTrip peer parses it
//! byte-for-byte. The header is followed by one contiguous sample block
//! per channel.

use bytes::{Buf, BufMut};

/// Size of the wire header in bytes
pub const PACKET_HEADER_SIZE: usize = 16;

/// Size of the session-termination datagram in bytes
pub const EXIT_PACKET_SIZE: usize = 63;

/// Sampling rate codes as transmitted in the header
///
/// `Undef` is legal on the wire but this client never emits it once a
/// session is negotiated.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingRate {
    Sr22 = 0,
    Sr32 = 1,
    Sr44 = 2,
    Sr48 = 3,
    Sr88 = 4,
    Sr96 = 5,
    Sr192 = 6,
    Undef = 7,
}

impl SamplingRate {
    /// Map a rate in Hz to its wire code. Unknown rates map to `Undef`.
    pub const fn from_hz(hz: u32) -> Self {
        match hz {
            22050 => Self::Sr22,
            32000 => Self::Sr32,
            44100 => Self::Sr44,
            48000 => Self::Sr48,
            88200 => Self::Sr88,
            96000 => Self::Sr96,
            192000 => Self::Sr192,
            _ => Self::Undef,
        }
    }

    /// Map a wire code back to a variant. Out-of-range codes map to `Undef`.
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Sr22,
            1 => Self::Sr32,
            2 => Self::Sr44,
            3 => Self::Sr48,
            4 => Self::Sr88,
            5 => Self::Sr96,
            6 => Self::Sr192,
            _ => Self::Undef,
        }
    }

    /// The rate in Hz, if defined
    pub const fn hz(self) -> Option<u32> {
        match self {
            Self::Sr22 => Some(22050),
            Self::Sr32 => Some(32000),
            Self::Sr44 => Some(44100),
            Self::Sr48 => Some(48000),
            Self::Sr88 => Some(88200),
            Self::Sr96 => Some(96000),
            Self::Sr192 => Some(192000),
            Self::Undef => None,
        }
    }
}

/// The 16-byte header carried by every audio datagram
///
/// `timestamp` is the sender's clock and is treated as opaque here; it is
/// only echoed into logs. `sequence` is a per-sender counter that wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub timestamp: u64,
    pub sequence: u16,
    /// Payload frames per channel; fixed for the lifetime of a session
    pub buffer_size: u16,
    pub sampling_rate: SamplingRate,
    /// Bits per sample: 8, 16, 24 or 32
    pub bit_resolution: u8,
    pub channels_in: u8,
    pub channels_out: u8,
}

impl PacketHeader {
    /// Write the wire representation. The destination must have at least
    /// [`PACKET_HEADER_SIZE`] bytes remaining.
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u64_le(self.timestamp);
        buf.put_u16_le(self.sequence);
        buf.put_u16_le(self.buffer_size);
        buf.put_u8(self.sampling_rate as u8);
        buf.put_u8(self.bit_resolution);
        buf.put_u8(self.channels_in);
        buf.put_u8(self.channels_out);
    }

    /// Parse the wire representation. The source must have at least
    /// [`PACKET_HEADER_SIZE`] bytes remaining; any 16 bytes parse to a
    /// header.
    pub fn decode<B: Buf>(buf: &mut B) -> Self {
        Self {
            timestamp: buf.get_u64_le(),
            sequence: buf.get_u16_le(),
            buffer_size: buf.get_u16_le(),
            sampling_rate: SamplingRate::from_code(buf.get_u8()),
            bit_resolution: buf.get_u8(),
            channels_in: buf.get_u8(),
            channels_out: buf.get_u8(),
        }
    }
}

/// True iff `packet` is the session-termination datagram: exactly 63
/// bytes, every byte `0xff`. Checked before any size validation so a
/// sentinel is never misreported as malformed.
pub fn is_exit_packet(packet: &[u8]) -> bool {
    packet.len() == EXIT_PACKET_SIZE && packet.iter().all(|&b| b == 0xff)
}
