use crate::messages::MessageEncodeError;
use std::io;
use thiserror::Error;

/// Errors raised while decoding RTMP chunks.  Any of these ends the
/// connection: once the framing is wrong there is no way back in sync.
#[derive(Debug, Error)]
pub enum ChunkDecodeError {
    /// Chunk types 1-3 borrow fields from the previous chunk on their chunk
    /// stream, so one of them arriving before any type 0 chunk has nothing
    /// to inherit from
    #[error("Received a compressed chunk header on csid {csid} before any full header")]
    UnknownChunkStream { csid: u32 },

    /// The advertised message length exceeds what we are willing to buffer
    #[error("Message of {size} bytes exceeds the maximum of {max} bytes")]
    MessageTooLarge { size: u32, max: u32 },

    /// A SET_CHUNK_SIZE value that is unusable even after masking
    #[error("Peer requested an invalid chunk size of {size}")]
    InvalidChunkSize { size: u32 },

    #[error("{0}")]
    Io(#[from] io::Error),
}

/// Errors raised while encoding RTMP messages into chunks
#[derive(Debug, Error)]
pub enum ChunkEncodeError {
    /// Messages are length-prefixed with 24 bits, chunking notwithstanding
    #[error("Message of {size} bytes is over the 16777215 byte limit")]
    MessageTooLong { size: usize },

    /// Outbound chunk sizes below 128 break clients that assume the
    /// protocol default; sizes above 24 bits cannot be advertised at all
    #[error("Attempted to set an invalid outbound chunk size of {size}")]
    InvalidChunkSize { size: u32 },

    #[error("Failed to encode the SetChunkSize message: {0}")]
    Message(#[from] MessageEncodeError),

    #[error("{0}")]
    Io(#[from] io::Error),
}
