use std::io;
use thiserror::Error;

/// Errors that end a handshake (and with it the connection)
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The first byte the client sent was not protocol version 3
    #[error("Client requested RTMP version {version}, only version 3 is supported")]
    VersionMismatch { version: u8 },

    /// The client's final packet did not echo the time, zeros, and random
    /// block we sent it
    #[error("Client did not echo our handshake packet back correctly")]
    EchoMismatch,

    /// Bytes arrived for a handshake that already completed
    #[error("Received bytes after the handshake already completed")]
    AlreadyCompleted,

    #[error("{0}")]
    Io(#[from] io::Error),
}
