use std::{io, string};
use thiserror::Error;

/// Errors raised while decoding AMF0 encoded bytes
#[derive(Debug, Error)]
pub enum Amf0DecodeError {
    /// A read ran past the end of the buffer mid-value
    #[error("Hit the end of the byte buffer but more data was expected")]
    Truncated,

    /// One of the AMF0 markers we deliberately do not model (reference,
    /// movieclip, recordset, xml document, typed object, avmplus switch).
    /// Only returned by the strict decoder; the lenient decoder substitutes
    /// a null value instead.
    #[error("Encountered unsupported marker: {marker}")]
    UnsupportedMarker { marker: u8 },

    /// A marker that is not part of the AMF0 specification at all
    #[error("Encountered unknown marker: {marker}")]
    UnknownMarker { marker: u8 },

    /// An object property was terminated with something other than the
    /// object-end marker
    #[error("Unexpected empty object property name")]
    UnexpectedEmptyObjectPropertyName,

    #[error("Failed to read a utf8 string from the byte buffer: {0}")]
    StringParseError(#[from] string::FromUtf8Error),

    #[error("Failed to read byte buffer: {0}")]
    BufferReadError(io::Error),
}

// Exact-length reads surface truncation as UnexpectedEof, which is the only
// io error a cursor over a byte slice can produce.
impl From<io::Error> for Amf0DecodeError {
    fn from(error: io::Error) -> Self {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            Amf0DecodeError::Truncated
        } else {
            Amf0DecodeError::BufferReadError(error)
        }
    }
}

/// Errors raised while encoding values into AMF0 bytes
#[derive(Debug, Error)]
pub enum Amf0EncodeError {
    #[error("String length greater than 65,535")]
    NormalStringTooLong,

    #[error("Object property name length greater than 65,535")]
    PropertyNameTooLong,

    #[error("Failed to write to byte buffer: {0}")]
    BufferWriteError(#[from] io::Error),
}
