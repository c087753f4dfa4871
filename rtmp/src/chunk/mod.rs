//! The RTMP chunk layer: framing of messages into chunks and back, with the
//! per chunk-stream header compression the protocol is built around.

mod errors;
mod header;
mod reader;
mod writer;

pub use self::errors::{ChunkDecodeError, ChunkEncodeError};
pub use self::header::{ChunkHeaderFormat, ChunkStreamContext};
pub use self::reader::{Chunk, ChunkReader};
pub use self::writer::{ChunkWriter, Packet};
