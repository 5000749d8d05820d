//! # JackTrip Client
//!
//! Real-time network-to-DAC bridge for streaming PCM audio from a remote
//! JackTrip server.
//!
//! ## Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────┐
//!                      │       JackTrip Server        │
//!                      └───────┬──────────────▲───────┘
//!              TCP rendezvous  │  UDP in      │ UDP out (1 per tick)
//!                      ┌───────▼──────┐  ┌────┴─────┐
//!                      │ Receive Loop │──│ SendTask │
//!                      │ (negotiate,  │tick (event) │
//!                      │  demux, RB)  │  └──────────┘
//!                      └───────┬──────┘
//!                              ▼ write (per-channel blocks)
//!                      ┌──────────────────┐
//!                      │ ChannelRingBuffer│  recenter-on-conflict
//!                      └───────┬──────────┘
//!                              ▼ read (formatted words)
//!                      ┌──────────────────┐
//!                      │   ChunkSource    │── get_chunk ──▶ DAC back-end
//!                      └──────────────────┘
//! ```
//!
//! The receive loop and the DAC's chunk requests run on independent
//! clocks; the ring buffer reconciles them, rewinding an index by half
//! the buffer whenever one clock catches the other.

pub mod audio;
pub mod config;
pub mod error;
pub mod network;
pub mod protocol;
pub mod sync;

pub use config::ClientConfig;
pub use error::{Error, Result};
pub use network::JackTripClient;
