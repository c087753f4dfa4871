use super::errors::ChunkEncodeError;
use super::header::ChunkHeaderFormat;
use crate::messages::{Message, MessagePayload};
use crate::time::Timestamp;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use std::collections::HashMap;
use std::io::Write;

const INITIAL_CHUNK_SIZE: u32 = 128;
const MIN_CHUNK_SIZE: u32 = 128;
const TIMESTAMP_FIELD_MAX: u32 = 0xff_ffff;
const MAX_MESSAGE_SIZE: usize = 0xff_ffff;

/// Serialized chunks for one outbound message, ready for the transport.
/// Packets must be written in the order they were produced; chunk header
/// compression makes the byte stream order-sensitive.
#[derive(Debug, PartialEq)]
pub struct Packet {
    pub bytes: Vec<u8>,
}

/// What the writer remembers about the last chunk sent on a chunk stream,
/// for choosing compressed header formats on the next one.
struct LastHeader {
    timestamp: Timestamp,
    timestamp_delta: u32,
    message_length: u32,
    message_type_id: u8,
    message_stream_id: u32,
    /// Full 32-bit value of the extended timestamp, when the last
    /// header-bearing chunk carried one.  Type 3 chunks repeat it.
    extended: Option<u32>,
}

/// Fragments outbound messages into chunks at the current chunk size.
///
/// One writer per connection: the peer reconstructs compressed headers from
/// the chunks it has already seen, so all messages to a peer must flow
/// through the same instance, in order.
pub struct ChunkWriter {
    chunk_size: u32,
    previous_headers: HashMap<u32, LastHeader>,
}

impl ChunkWriter {
    pub fn new() -> ChunkWriter {
        ChunkWriter {
            chunk_size: INITIAL_CHUNK_SIZE,
            previous_headers: HashMap::new(),
        }
    }

    /// Emits a SET_CHUNK_SIZE message and switches the fragmentation
    /// boundary to `size` for every message after it.
    pub fn set_chunk_size(&mut self, size: u32) -> Result<Packet, ChunkEncodeError> {
        if !(MIN_CHUNK_SIZE..=TIMESTAMP_FIELD_MAX).contains(&size) {
            return Err(ChunkEncodeError::InvalidChunkSize { size });
        }

        let payload = Message::SetChunkSize { size }.into_payload(Timestamp::new(0), 0)?;
        let packet = self.write(&payload, true)?;
        self.chunk_size = size;
        Ok(packet)
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Serializes one message into as many chunks as its size requires.
    ///
    /// `force_uncompressed` pins the first chunk to a full type 0 header,
    /// which the protocol's initial control messages need since the peer has
    /// no context yet.
    pub fn write(
        &mut self,
        message: &MessagePayload,
        force_uncompressed: bool,
    ) -> Result<Packet, ChunkEncodeError> {
        if message.data.len() > MAX_MESSAGE_SIZE {
            return Err(ChunkEncodeError::MessageTooLong {
                size: message.data.len(),
            });
        }

        let csid = csid_for_message_type(message.type_id);
        let mut bytes = Vec::new();

        let (format, delta) = if force_uncompressed {
            (ChunkHeaderFormat::Full, 0)
        } else {
            match self.previous_headers.get(&csid) {
                None => (ChunkHeaderFormat::Full, 0),
                Some(previous) => {
                    let delta = (message.timestamp - previous.timestamp).value;
                    (select_format(message, previous, delta), delta)
                }
            }
        };

        let timestamp_field = match format {
            ChunkHeaderFormat::Full => message.timestamp.value,
            _ => delta,
        };
        let extended = if format != ChunkHeaderFormat::Empty && timestamp_field >= TIMESTAMP_FIELD_MAX
        {
            Some(timestamp_field)
        } else if format == ChunkHeaderFormat::Empty {
            self.previous_headers
                .get(&csid)
                .and_then(|previous| previous.extended)
        } else {
            None
        };

        self.write_header(&mut bytes, csid, format, message, timestamp_field, extended)?;

        let first_piece = self.chunk_size.min(message.data.len() as u32) as usize;
        bytes.write_all(&message.data[..first_piece])?;

        // Every chunk after the first is a bare type 3 continuation.
        let mut written = first_piece;
        while written < message.data.len() {
            write_basic_header(&mut bytes, ChunkHeaderFormat::Empty, csid)?;
            if let Some(value) = extended {
                bytes.write_u32::<BigEndian>(value)?;
            }

            let piece = (message.data.len() - written).min(self.chunk_size as usize);
            let end = written + piece;
            bytes.write_all(&message.data[written..end])?;
            written = end;
        }

        self.previous_headers.insert(
            csid,
            LastHeader {
                timestamp: message.timestamp,
                timestamp_delta: delta,
                message_length: message.data.len() as u32,
                message_type_id: message.type_id,
                message_stream_id: message.message_stream_id,
                extended,
            },
        );

        Ok(Packet { bytes })
    }

    fn write_header(
        &self,
        bytes: &mut Vec<u8>,
        csid: u32,
        format: ChunkHeaderFormat,
        message: &MessagePayload,
        timestamp_field: u32,
        extended: Option<u32>,
    ) -> Result<(), ChunkEncodeError> {
        write_basic_header(bytes, format, csid)?;

        if format != ChunkHeaderFormat::Empty {
            bytes.write_u24::<BigEndian>(timestamp_field.min(TIMESTAMP_FIELD_MAX))?;
        }

        if format == ChunkHeaderFormat::Full || format == ChunkHeaderFormat::TimeDeltaWithoutStreamId
        {
            bytes.write_u24::<BigEndian>(message.data.len() as u32)?;
            bytes.write_u8(message.type_id)?;
        }

        if format == ChunkHeaderFormat::Full {
            // Stream id is the one little-endian field in the protocol.
            bytes.write_u32::<LittleEndian>(message.message_stream_id)?;
        }

        if let Some(value) = extended {
            bytes.write_u32::<BigEndian>(value)?;
        }

        Ok(())
    }
}

impl Default for ChunkWriter {
    fn default() -> Self {
        ChunkWriter::new()
    }
}

fn select_format(
    message: &MessagePayload,
    previous: &LastHeader,
    delta: u32,
) -> ChunkHeaderFormat {
    if message.message_stream_id != previous.message_stream_id {
        return ChunkHeaderFormat::Full;
    }

    if message.type_id != previous.message_type_id
        || message.data.len() as u32 != previous.message_length
    {
        return ChunkHeaderFormat::TimeDeltaWithoutStreamId;
    }

    if delta != previous.timestamp_delta {
        return ChunkHeaderFormat::TimeDeltaOnly;
    }

    ChunkHeaderFormat::Empty
}

fn write_basic_header(
    bytes: &mut Vec<u8>,
    format: ChunkHeaderFormat,
    csid: u32,
) -> Result<(), ChunkEncodeError> {
    debug_assert!((2..65600).contains(&csid), "csid {} out of range", csid);

    if csid < 64 {
        bytes.write_u8(csid as u8 | format.format_bits())?;
    } else if csid < 320 {
        bytes.write_u8(format.format_bits())?;
        bytes.write_u8((csid - 64) as u8)?;
    } else {
        bytes.write_u8(1 | format.format_bits())?;
        let value = (csid - 64) as u16;
        bytes.write_u8((value & 0xff) as u8)?;
        bytes.write_u8((value >> 8) as u8)?;
    }

    Ok(())
}

/// Chunk stream assignment per message type.  Spreading message families
/// across chunk streams keeps their header compression contexts separate.
fn csid_for_message_type(message_type_id: u8) -> u32 {
    match message_type_id {
        1..=6 => 2,
        15 | 17 | 18 | 20 => 3,
        8 => 4,
        9 => 5,
        _ => 6,
    }
}
