use inlet_rtmp::handshake::HandshakeError;
use inlet_rtmp::session::SessionError;
use std::io;
use thiserror::Error;

/// Why a connection task ended.  All of these tear the connection down;
/// recoverable protocol mistakes were already answered in-band by the
/// session and never reach this type.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    #[error("session failed: {0}")]
    Session(#[from] SessionError),

    #[error("socket closed before the handshake completed")]
    ClosedDuringHandshake,

    #[error("read timed out")]
    Timeout,

    #[error("{0}")]
    Io(#[from] io::Error),
}
