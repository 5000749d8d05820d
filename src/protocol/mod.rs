//! JackTrip wire protocol

pub mod header;

pub use header::{is_exit_packet, PacketHeader, SamplingRate, EXIT_PACKET_SIZE, PACKET_HEADER_SIZE};
