//! Client configuration
//!
//! The streaming parameters form one coherent compile-time set: the
//! audio tuple (rate, format, channels, frames per packet) fixes the
//! packet geometry, which in turn fixes the UDP datagram size the
//! receive loop validates against. The handshake constants mirror the
//! peer's expectations and are not negotiable.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::audio::format::SampleFormat;
use crate::protocol::PACKET_HEADER_SIZE;

/// Audio sample rate in Hz
pub const SAMPLE_RATE: u32 = 44100;

/// PCM format of the payload sample blocks
pub const SAMPLE_FORMAT: SampleFormat = SampleFormat::S16;

/// Channel count (1 = mono, 2 = stereo)
pub const WRITE_CHANNELS: usize = 2;

/// Frames per packet per channel
pub const AUDIO_BLOCK_FRAMES: usize = 64;

/// Ring buffer length in frames; holds sixteen packets so a half-buffer
/// of slack survives clock drift between arrival and playback
pub const RING_BUFFER_FRAMES: usize = AUDIO_BLOCK_FRAMES * 16;

/// Output gain in `[0, 1]`
pub const AUDIO_VOLUME: f32 = 0.5;

/// Default JackTrip server address
pub const SERVER_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 10, 10);

/// TCP port the server's session negotiator listens on
pub const JACKTRIP_TCP_PORT: u16 = 4464;

/// IANA dynamic/private port range, used for client ephemeral ports
pub const DYNAMIC_PORT_START: u16 = 49152;
pub const DYNAMIC_PORT_END: u16 = u16::MAX;
pub const DYNAMIC_PORT_RANGE: u16 = DYNAMIC_PORT_END - DYNAMIC_PORT_START;

/// Seconds of silence on the UDP socket before the session is torn down
pub const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Cool-down between connection attempts and after a disconnect
pub const RETRY_COOLDOWN: Duration = Duration::from_secs(2);

/// Bytes one channel's sample block occupies in a packet
pub const CHANNEL_BLOCK_SIZE: usize = AUDIO_BLOCK_FRAMES * SAMPLE_FORMAT.bytes_per_sample();

/// Exact size of a well-formed audio datagram
pub const UDP_PACKET_SIZE: usize = PACKET_HEADER_SIZE + WRITE_CHANNELS * CHANNEL_BLOCK_SIZE;

/// Receive buffer size; anything larger than `UDP_PACKET_SIZE` is
/// malformed, but the buffer must exceed it to detect oversized datagrams
pub const MAX_DATAGRAM_SIZE: usize = 1472;

/// Runtime knobs for a [`JackTripClient`](crate::network::JackTripClient)
///
/// Defaults come from the compile-time constants above; tests shorten the
/// timeouts.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Address of the server's TCP session negotiator
    pub server_addr: SocketAddr,
    pub receive_timeout: Duration,
    pub retry_cooldown: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from((SERVER_IP, JACKTRIP_TCP_PORT)),
            receive_timeout: RECEIVE_TIMEOUT,
            retry_cooldown: RETRY_COOLDOWN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_geometry() {
        // 16-byte header + 2 channels x 64 frames x 2 bytes
        assert_eq!(CHANNEL_BLOCK_SIZE, 128);
        assert_eq!(UDP_PACKET_SIZE, 272);
        assert!(UDP_PACKET_SIZE <= MAX_DATAGRAM_SIZE);
        // recentering rewinds by half the buffer, so it must split evenly
        assert_eq!(RING_BUFFER_FRAMES % 2, 0);
    }
}
