//! JackTrip client: connection lifecycle and receive loop
//!
//! The client alternates between two states. Disconnected, it runs the
//! session negotiator and sleeps on failure. Connected, it polls the UDP
//! socket without blocking: well-formed packets are demultiplexed into
//! the ring buffer and the send task is ticked; the exit sentinel or a
//! receive stall tears the session down and the cycle restarts. `run()`
//! performs one such pass and yields, so the caller drives it in a loop.

use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::audio::buffer::ChannelRingBuffer;
use crate::audio::output::{ChunkSource, OutputFormat};
use crate::config::{
    ClientConfig, AUDIO_BLOCK_FRAMES, AUDIO_VOLUME, CHANNEL_BLOCK_SIZE, MAX_DATAGRAM_SIZE,
    RING_BUFFER_FRAMES, SAMPLE_FORMAT, UDP_PACKET_SIZE, WRITE_CHANNELS,
};
use crate::error::Result;
use crate::network::handshake;
use crate::network::sender::SendTask;
use crate::protocol::{is_exit_packet, PacketHeader, PACKET_HEADER_SIZE};
use crate::sync::SyncEvent;

/// Session state of a [`JackTripClient`]
pub enum ConnectionState {
    Disconnected,
    Connected {
        socket: Arc<UdpSocket>,
        server_udp_port: u16,
    },
}

/// Streaming client bridging a JackTrip server to a DAC back-end
pub struct JackTripClient {
    config: ClientConfig,
    fifo: Arc<ChannelRingBuffer>,
    tick: Arc<SyncEvent>,
    connected: Arc<AtomicBool>,
    state: ConnectionState,
    send_task: Option<JoinHandle<()>>,
    packets_received: u64,
    last_receive: Instant,
    /// Channel-major decode scratch, one packet's worth
    scratch: Vec<i16>,
}

impl JackTripClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            fifo: Arc::new(ChannelRingBuffer::new(WRITE_CHANNELS, RING_BUFFER_FRAMES)),
            tick: Arc::new(SyncEvent::new()),
            connected: Arc::new(AtomicBool::new(false)),
            state: ConnectionState::Disconnected,
            send_task: None,
            packets_received: 0,
            last_receive: Instant::now(),
            scratch: vec![0; WRITE_CHANNELS * AUDIO_BLOCK_FRAMES],
        }
    }

    /// One pass of the client's cooperative cycle: attempt a connection
    /// or service the socket, then yield.
    pub fn run(&mut self) {
        if !self.is_connected() {
            if let Err(e) = self.connect() {
                tracing::warn!("session negotiation failed: {e}");
                thread::sleep(self.config.retry_cooldown);
            }
        } else {
            self.receive();
        }

        // Give the send task time to work.
        thread::yield_now();
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Packets accepted this session
    pub fn packets_received(&self) -> u64 {
        self.packets_received
    }

    /// The shared sample FIFO feeding the DAC back-end
    pub fn fifo(&self) -> Arc<ChannelRingBuffer> {
        self.fifo.clone()
    }

    /// Build a chunk source for an output peripheral with the configured
    /// volume.
    pub fn chunk_source(&self, output: OutputFormat) -> ChunkSource {
        ChunkSource::new(self.fifo.clone(), output, AUDIO_VOLUME)
    }

    fn connect(&mut self) -> Result<()> {
        let session = handshake::negotiate(self.config.server_addr)?;
        let socket = Arc::new(session.socket);

        // The flag must be up before the task starts or its loop exits
        // immediately.
        self.connected.store(true, Ordering::SeqCst);
        match SendTask::spawn(socket.clone(), self.tick.clone(), self.connected.clone()) {
            Ok(handle) => self.send_task = Some(handle),
            Err(e) => {
                self.connected.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        }

        self.state = ConnectionState::Connected {
            socket,
            server_udp_port: session.server_udp_port,
        };
        self.last_receive = Instant::now();
        tracing::info!("session established; streaming");
        Ok(())
    }

    fn receive(&mut self) {
        let (socket, server_udp_port) = match &self.state {
            ConnectionState::Connected {
                socket,
                server_udp_port,
            } => (socket.clone(), *server_udp_port),
            ConnectionState::Disconnected => return,
        };

        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        match socket.recv(&mut buf) {
            Ok(n) if is_exit_packet(&buf[..n]) => {
                tracing::info!("exit packet received");
                self.disconnect();
                thread::sleep(self.config.retry_cooldown);
            }
            Ok(n) if n == UDP_PACKET_SIZE => {
                if self.packets_received == 0 {
                    let header = PacketHeader::decode(&mut &buf[..PACKET_HEADER_SIZE]);
                    tracing::debug!(
                        sequence = header.sequence,
                        timestamp = header.timestamp,
                        server_udp_port,
                        "first packet of session"
                    );
                }

                self.push_samples(&buf);
                self.packets_received += 1;
                self.last_receive = Instant::now();

                // Release one send cycle.
                self.tick.set();
            }
            Ok(n) => {
                tracing::warn!(
                    received = n,
                    expected = UDP_PACKET_SIZE,
                    "malformed packet dropped"
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                if self.last_receive.elapsed() > self.config.receive_timeout {
                    tracing::info!(
                        "nothing received for {:?}; disconnecting",
                        self.config.receive_timeout
                    );
                    self.disconnect();
                    thread::sleep(self.config.retry_cooldown);
                }
            }
            Err(e) => {
                tracing::warn!("UDP receive failed: {e}");
            }
        }
    }

    /// Slice the per-channel blocks out of a well-formed packet, narrow
    /// them to native samples, and push them into the FIFO.
    fn push_samples(&mut self, packet: &[u8]) {
        for ch in 0..WRITE_CHANNELS {
            let start = PACKET_HEADER_SIZE + ch * CHANNEL_BLOCK_SIZE;
            SAMPLE_FORMAT.decode_block(
                &packet[start..start + CHANNEL_BLOCK_SIZE],
                &mut self.scratch[ch * AUDIO_BLOCK_FRAMES..(ch + 1) * AUDIO_BLOCK_FRAMES],
            );
        }

        let blocks: Vec<&[i16]> = self.scratch.chunks(AUDIO_BLOCK_FRAMES).collect();
        self.fifo.write(&blocks, AUDIO_BLOCK_FRAMES);
    }

    fn disconnect(&mut self) {
        if !self.is_connected() {
            return;
        }

        tracing::debug!("disconnecting");
        self.connected.store(false, Ordering::SeqCst);

        // If the send task is parked on the tick, the signal releases
        // it; if it is mid-cycle, it re-checks the flag before parking
        // again. Either way it observes the cleared flag and leaves its
        // loop; hold the socket open until it has.
        self.tick.set();
        if let Some(task) = self.send_task.take() {
            tracing::debug!("waiting for send task to terminate");
            let _ = task.join();
        }
        self.state = ConnectionState::Disconnected;

        tracing::debug!(
            packets = self.packets_received,
            recenters = self.fifo.recenter_count(),
            "resetting fifo and counters"
        );
        self.packets_received = 0;
        self.fifo.clear();
    }
}

impl Drop for JackTripClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}
