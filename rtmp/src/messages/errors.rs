use inlet_amf0::{Amf0DecodeError, Amf0EncodeError};
use std::io;
use thiserror::Error;

/// Errors raised while interpreting a message payload as a typed message
#[derive(Debug, Error)]
pub enum MessageDecodeError {
    /// The payload bytes do not form a valid message of the claimed type
    #[error("The message was not encoded in an expected format")]
    InvalidFormat,

    /// A command or data message carried malformed AMF0 values
    #[error("The message did not contain valid AMF0 encoded values: {0}")]
    Amf0(#[from] Amf0DecodeError),

    #[error("An IO error occurred while reading the payload: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised while turning a typed message into payload bytes
#[derive(Debug, Error)]
pub enum MessageEncodeError {
    #[error("The values provided could not be encoded as AMF0: {0}")]
    Amf0(#[from] Amf0EncodeError),

    #[error("An IO error occurred while writing the payload: {0}")]
    Io(#[from] io::Error),
}
