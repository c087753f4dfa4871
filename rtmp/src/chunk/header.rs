use crate::time::Timestamp;

/// The four chunk header encodings, named for what they carry.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ChunkHeaderFormat {
    /// Type 0: absolute timestamp, length, type id, and message stream id
    Full,
    /// Type 1: timestamp delta, length, and type id
    TimeDeltaWithoutStreamId,
    /// Type 2: timestamp delta only
    TimeDeltaOnly,
    /// Type 3: everything inherited from the previous chunk
    Empty,
}

impl ChunkHeaderFormat {
    pub fn from_first_byte(byte: u8) -> ChunkHeaderFormat {
        match byte >> 6 {
            0 => ChunkHeaderFormat::Full,
            1 => ChunkHeaderFormat::TimeDeltaWithoutStreamId,
            2 => ChunkHeaderFormat::TimeDeltaOnly,
            _ => ChunkHeaderFormat::Empty,
        }
    }

    pub fn format_bits(&self) -> u8 {
        match self {
            ChunkHeaderFormat::Full => 0b0000_0000,
            ChunkHeaderFormat::TimeDeltaWithoutStreamId => 0b0100_0000,
            ChunkHeaderFormat::TimeDeltaOnly => 0b1000_0000,
            ChunkHeaderFormat::Empty => 0b1100_0000,
        }
    }
}

/// The per chunk-stream memo that lets compressed headers be expanded.
///
/// A context is created by the first full header on a chunk stream and
/// updated by every chunk after it; `bytes_remaining` doubles as the
/// reassembly cursor so a type 3 chunk can be told apart as "continues the
/// current message" versus "starts the next one".
#[derive(Debug, Clone)]
pub struct ChunkStreamContext {
    pub timestamp: Timestamp,
    /// The raw 24-bit time field of the last header-bearing chunk.  Serves
    /// as the inherited delta for type 3 chunks that start a new message,
    /// and signals (when saturated) that an extended timestamp follows.
    pub timestamp_field: u32,
    pub message_length: u32,
    pub message_type_id: u8,
    pub message_stream_id: u32,
    pub bytes_remaining: u32,
}
