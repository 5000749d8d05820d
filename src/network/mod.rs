//! Network subsystem for the JackTrip session and data plane

pub mod client;
pub mod handshake;
pub mod sender;

pub use client::{ConnectionState, JackTripClient};
pub use handshake::{negotiate, Session};
pub use sender::SendTask;
