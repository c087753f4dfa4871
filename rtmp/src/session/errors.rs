use crate::chunk::{ChunkDecodeError, ChunkEncodeError};
use crate::messages::{MessageDecodeError, MessageEncodeError};
use thiserror::Error;

/// Errors that are fatal to a session.  Peer mistakes the protocol lets us
/// answer (bad commands, malformed AMF in a command) are reported to the
/// peer in-band instead and never surface here.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to decode incoming chunks: {0}")]
    ChunkDecode(#[from] ChunkDecodeError),

    #[error("Failed to encode outbound chunks: {0}")]
    ChunkEncode(#[from] ChunkEncodeError),

    #[error("Failed to decode an incoming message: {0}")]
    MessageDecode(#[from] MessageDecodeError),

    #[error("Failed to encode an outbound message: {0}")]
    MessageEncode(#[from] MessageEncodeError),

    #[error("Request id {0} does not match any outstanding request")]
    UnknownRequestId(u32),
}
