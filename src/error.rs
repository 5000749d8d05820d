//! Error types for the streaming client

use thiserror::Error;

/// Main error type for the client
#[derive(Error, Debug)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Network subsystem errors
///
/// The TCP variants (`BindFailed`, `ConnectFailed`, `ShortWrite`,
/// `ShortRead`) all abort the current session negotiation; the outer
/// connect loop recovers by sleeping and retrying from scratch.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Socket bind failed: {0}")]
    BindFailed(String),

    #[error("TCP connect failed: {0}")]
    ConnectFailed(String),

    #[error("Short write during port exchange: {0}")]
    ShortWrite(String),

    #[error("Short read during port exchange: {0}")]
    ShortRead(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),
}

/// Audio subsystem errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open stream: {0}")]
    StreamError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Result type alias for the client
pub type Result<T> = std::result::Result<T, Error>;
