//! Outbound packet task
//!
//! The server paces itself on our return traffic, so a dedicated task
//! emits one header-only packet per received packet. It is released once
//! per tick by the receive loop and suspended in between.

use std::io;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::{AUDIO_BLOCK_FRAMES, SAMPLE_FORMAT, SAMPLE_RATE, UDP_PACKET_SIZE, WRITE_CHANNELS};
use crate::protocol::{PacketHeader, SamplingRate, PACKET_HEADER_SIZE};
use crate::sync::SyncEvent;

const PRIME_DELAY: Duration = Duration::from_millis(100);
const PRIME_SETTLE: Duration = Duration::from_millis(25);

/// Emits one outbound packet per tick while the session is up
pub struct SendTask {
    socket: Arc<UdpSocket>,
    tick: Arc<SyncEvent>,
    connected: Arc<AtomicBool>,
    header: PacketHeader,
}

impl SendTask {
    /// Spawn the task on its own named thread. The caller keeps the
    /// handle and joins it after clearing `connected` and setting `tick`.
    pub fn spawn(
        socket: Arc<UdpSocket>,
        tick: Arc<SyncEvent>,
        connected: Arc<AtomicBool>,
    ) -> io::Result<JoinHandle<()>> {
        let header = PacketHeader {
            timestamp: 0,
            sequence: 0,
            buffer_size: AUDIO_BLOCK_FRAMES as u16,
            sampling_rate: SamplingRate::from_hz(SAMPLE_RATE),
            bit_resolution: SAMPLE_FORMAT.bit_depth(),
            channels_in: WRITE_CHANNELS as u8,
            channels_out: WRITE_CHANNELS as u8,
        };
        debug_assert_ne!(header.sampling_rate, SamplingRate::Undef);

        let task = Self {
            socket,
            tick,
            connected,
            header,
        };

        thread::Builder::new()
            .name("jtc-send".into())
            .spawn(move || task.run())
    }

    fn run(mut self) {
        tracing::debug!("send task running");

        let mut packet = [0u8; UDP_PACKET_SIZE];
        self.header.encode(&mut &mut packet[..PACKET_HEADER_SIZE]);

        // The server checks for a first datagram every 100 ms until a
        // global timeout. Give it a moment to start listening, send a
        // single packet, then pause briefly. Bursting packets here
        // instead provokes streams of ICMP port-unreachable replies.
        thread::sleep(PRIME_DELAY);
        self.transmit(&packet);
        thread::sleep(PRIME_SETTLE);

        tracing::debug!("sending datagrams");

        while self.connected.load(Ordering::SeqCst) {
            self.header.sequence = self.header.sequence.wrapping_add(1);
            self.header.encode(&mut &mut packet[..PACKET_HEADER_SIZE]);

            self.transmit(&packet);

            // Clear-then-wait is safe for steady-state ticks: only this
            // task clears and only the receive loop sets, and a missed
            // tick is re-signaled by the next packet. Shutdown has no
            // next packet, so if the disconnect landed while this task
            // was sending, the clear above just wiped its signal;
            // re-check the flag before parking.
            self.tick.clear();
            if !self.connected.load(Ordering::SeqCst) {
                break;
            }
            self.tick.wait();
        }

        tracing::debug!("disconnected; send task exiting");
    }

    fn transmit(&self, packet: &[u8]) {
        match self.socket.send(packet) {
            Ok(n) if n == packet.len() => {}
            Ok(n) => {
                tracing::warn!(sent = n, expected = packet.len(), "short UDP write");
            }
            // Not fatal; the next tick sends the next packet.
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => {
                tracing::warn!("UDP send failed: {e}");
            }
        }
    }
}
