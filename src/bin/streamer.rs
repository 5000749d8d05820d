//! JackTrip Streaming Endpoint
//!
//! Connects to a JackTrip server and plays the received audio on the
//! default output device, reconnecting forever.

use anyhow::Result;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jacktrip_client::{
    audio::{HostPlayback, OutputFormat},
    config::{ClientConfig, JACKTRIP_TCP_PORT, SERVER_IP},
    network::JackTripClient,
};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting JackTrip streaming endpoint");

    // Get server address from args or use the built-in default
    let server_addr: SocketAddr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| format!("{SERVER_IP}:{JACKTRIP_TCP_PORT}"))
        .parse()
        .expect("Invalid server address");

    tracing::info!("Target server: {}", server_addr);

    let config = ClientConfig {
        server_addr,
        ..Default::default()
    };
    let mut client = JackTripClient::new(config);

    // Host stand-in for the DAC: signed 16-bit words, silence at zero.
    let mut playback = HostPlayback::new(client.chunk_source(OutputFormat::i2s(1 << 15)));
    playback.start()?;

    tracing::info!("Playback started; entering client loop");

    let mut last_stats = Instant::now();

    loop {
        client.run();

        if let Some(e) = playback.check_errors() {
            tracing::warn!("Playback error: {}", e);
        }

        // Periodic stats
        if last_stats.elapsed() >= Duration::from_secs(5) {
            last_stats = Instant::now();
            if client.is_connected() {
                tracing::info!(
                    "Session stats: {} packets received, {} chunks played, {} recenters",
                    client.packets_received(),
                    playback.chunks_filled(),
                    client.fifo().recenter_count()
                );
            }
        }
    }
}
