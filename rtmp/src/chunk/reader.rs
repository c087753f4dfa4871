use super::errors::ChunkDecodeError;
use super::header::{ChunkHeaderFormat, ChunkStreamContext};
use crate::time::Timestamp;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use bytes::{Bytes, BytesMut};
use std::cmp::min;
use std::collections::HashMap;
use std::io::Cursor;
use tracing::warn;

const INITIAL_CHUNK_SIZE: u32 = 128;
const TIMESTAMP_FIELD_MAX: u32 = 0xff_ffff;
const DEFAULT_MAX_MESSAGE_SIZE: u32 = 0xff_ffff;

/// One received chunk with its header fully expanded.
///
/// The payload is a slice of the reader's buffer; it is only valid input for
/// the message assembler, which copies it into the message under
/// construction.
#[derive(Debug, PartialEq)]
pub struct Chunk {
    pub csid: u32,
    pub timestamp: Timestamp,
    pub message_length: u32,
    pub message_type_id: u8,
    pub message_stream_id: u32,
    /// True when this chunk is the first of its message (as opposed to a
    /// continuation of one already being reassembled on this csid)
    pub starts_message: bool,
    pub payload: Bytes,
}

enum Stage {
    BasicHeader,
    MessageHeader {
        csid: u32,
        format: ChunkHeaderFormat,
    },
    ExtendedTimestamp {
        csid: u32,
        format: ChunkHeaderFormat,
        starts_message: bool,
    },
    Payload {
        csid: u32,
        starts_message: bool,
    },
}

enum Progress {
    NotEnoughBytes,
    Advanced,
    Chunk(Chunk),
}

/// Decodes a byte stream into chunks, expanding compressed headers against
/// the per chunk-stream contexts.
///
/// Every byte the peer sends after the handshake must pass through the same
/// reader instance; chunk headers routinely depend on the chunks before
/// them.  Feed newly arrived bytes to [`ChunkReader::read_chunk`] and keep
/// calling it with an empty slice until it reports `None`.
pub struct ChunkReader {
    chunk_size: u32,
    max_message_size: u32,
    buffer: BytesMut,
    contexts: HashMap<u32, ChunkStreamContext>,
    stage: Stage,
}

impl ChunkReader {
    /// Creates a reader expecting the protocol-initial 128 byte chunks.
    pub fn new() -> ChunkReader {
        ChunkReader {
            chunk_size: INITIAL_CHUNK_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            buffer: BytesMut::with_capacity(4096),
            contexts: HashMap::new(),
            stage: Stage::BasicHeader,
        }
    }

    /// Appends `bytes` to the internal buffer and attempts to decode the
    /// next chunk.
    ///
    /// Returns `Ok(None)` when more bytes are needed.  When it returns a
    /// chunk, call again with an empty slice: one read from the transport
    /// frequently carries several chunks.
    pub fn read_chunk(&mut self, bytes: &[u8]) -> Result<Option<Chunk>, ChunkDecodeError> {
        self.buffer.extend_from_slice(bytes);

        loop {
            let progress = match self.stage {
                Stage::BasicHeader => self.read_basic_header()?,
                Stage::MessageHeader { csid, format } => self.read_message_header(csid, format)?,
                Stage::ExtendedTimestamp {
                    csid,
                    format,
                    starts_message,
                } => self.read_extended_timestamp(csid, format, starts_message)?,
                Stage::Payload {
                    csid,
                    starts_message,
                } => self.read_payload(csid, starts_message)?,
            };

            match progress {
                Progress::NotEnoughBytes => return Ok(None),
                Progress::Advanced => continue,
                Progress::Chunk(chunk) => return Ok(Some(chunk)),
            }
        }
    }

    /// Applies a SET_CHUNK_SIZE from the peer.  The top bit must be zero and
    /// is masked off; values above 2^24 - 1 are capped since a chunk that
    /// size could never be advertised back.
    pub fn set_chunk_size(&mut self, size: u32) -> Result<u32, ChunkDecodeError> {
        let masked = size & 0x7fff_ffff;
        if masked == 0 {
            return Err(ChunkDecodeError::InvalidChunkSize { size });
        }

        self.chunk_size = min(masked, TIMESTAMP_FIELD_MAX);
        Ok(self.chunk_size)
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Forgets reassembly progress on a chunk stream (ABORT handling).  The
    /// header memo survives; only the in-flight message is dropped.
    pub fn abort(&mut self, csid: u32) {
        if let Some(context) = self.contexts.get_mut(&csid) {
            context.bytes_remaining = 0;
        }
    }

    fn read_basic_header(&mut self) -> Result<Progress, ChunkDecodeError> {
        if self.buffer.is_empty() {
            return Ok(Progress::NotEnoughBytes);
        }

        let format = ChunkHeaderFormat::from_first_byte(self.buffer[0]);
        let (csid, header_size) = match self.buffer[0] & 0b0011_1111 {
            0 => {
                if self.buffer.len() < 2 {
                    return Ok(Progress::NotEnoughBytes);
                }
                (self.buffer[1] as u32 + 64, 2)
            }
            1 => {
                if self.buffer.len() < 3 {
                    return Ok(Progress::NotEnoughBytes);
                }
                // Two-byte csid extension is little-endian, unlike nearly
                // everything else in the protocol.
                (self.buffer[2] as u32 * 256 + self.buffer[1] as u32 + 64, 3)
            }
            value => (value as u32, 1),
        };

        let _ = self.buffer.split_to(header_size);
        self.stage = Stage::MessageHeader { csid, format };
        Ok(Progress::Advanced)
    }

    fn read_message_header(
        &mut self,
        csid: u32,
        format: ChunkHeaderFormat,
    ) -> Result<Progress, ChunkDecodeError> {
        let starts_message = match format {
            ChunkHeaderFormat::Full => {
                if self.buffer.len() < 11 {
                    return Ok(Progress::NotEnoughBytes);
                }

                if let Some(old) = self.contexts.get(&csid) {
                    if old.bytes_remaining > 0 {
                        warn!(
                            csid,
                            dropped = old.message_length - old.bytes_remaining,
                            "full chunk header arrived mid-message, restarting chunk stream"
                        );
                    }
                }

                let header = self.buffer.split_to(11);
                let mut cursor = Cursor::new(&header[..]);
                let timestamp_field = cursor.read_u24::<BigEndian>()?;
                let message_length = cursor.read_u24::<BigEndian>()?;
                let message_type_id = cursor.read_u8()?;
                // The one little-endian field in the message header.
                let message_stream_id = cursor.read_u32::<LittleEndian>()?;

                self.check_message_length(message_length)?;
                self.contexts.insert(
                    csid,
                    ChunkStreamContext {
                        timestamp: Timestamp::new(timestamp_field),
                        timestamp_field,
                        message_length,
                        message_type_id,
                        message_stream_id,
                        bytes_remaining: 0,
                    },
                );

                true
            }

            ChunkHeaderFormat::TimeDeltaWithoutStreamId => {
                if self.buffer.len() < 7 {
                    return Ok(Progress::NotEnoughBytes);
                }

                let header = self.buffer.split_to(7);
                let mut cursor = Cursor::new(&header[..]);
                let delta = cursor.read_u24::<BigEndian>()?;
                let message_length = cursor.read_u24::<BigEndian>()?;
                let message_type_id = cursor.read_u8()?;

                self.check_message_length(message_length)?;
                let context = self.restarted_context(csid)?;
                context.timestamp = context.timestamp + delta;
                context.timestamp_field = delta;
                context.message_length = message_length;
                context.message_type_id = message_type_id;

                true
            }

            ChunkHeaderFormat::TimeDeltaOnly => {
                if self.buffer.len() < 3 {
                    return Ok(Progress::NotEnoughBytes);
                }

                let header = self.buffer.split_to(3);
                let mut cursor = Cursor::new(&header[..]);
                let delta = cursor.read_u24::<BigEndian>()?;

                let context = self.restarted_context(csid)?;
                context.timestamp = context.timestamp + delta;
                context.timestamp_field = delta;

                true
            }

            ChunkHeaderFormat::Empty => {
                let context = match self.contexts.get_mut(&csid) {
                    Some(context) => context,
                    None => return Err(ChunkDecodeError::UnknownChunkStream { csid }),
                };

                let starts_message = context.bytes_remaining == 0;
                if starts_message {
                    // A type 3 chunk opening a new message repeats the
                    // previous time field as its delta.  Continuation
                    // chunks must not re-apply it.
                    context.timestamp = context.timestamp + context.timestamp_field;
                }

                starts_message
            }
        };

        let needs_extended = self
            .contexts
            .get(&csid)
            .map(|context| context.timestamp_field >= TIMESTAMP_FIELD_MAX)
            .unwrap_or(false);

        self.stage = if needs_extended {
            Stage::ExtendedTimestamp {
                csid,
                format,
                starts_message,
            }
        } else {
            Stage::Payload {
                csid,
                starts_message,
            }
        };

        Ok(Progress::Advanced)
    }

    fn read_extended_timestamp(
        &mut self,
        csid: u32,
        format: ChunkHeaderFormat,
        starts_message: bool,
    ) -> Result<Progress, ChunkDecodeError> {
        if self.buffer.len() < 4 {
            return Ok(Progress::NotEnoughBytes);
        }

        let bytes = self.buffer.split_to(4);
        let extended = Cursor::new(&bytes[..]).read_u32::<BigEndian>()?;

        let context = match self.contexts.get_mut(&csid) {
            Some(context) => context,
            None => return Err(ChunkDecodeError::UnknownChunkStream { csid }),
        };

        if format == ChunkHeaderFormat::Full {
            context.timestamp.set(extended);
        } else if starts_message {
            // The saturated 24-bit field was already added as a delta, so
            // only the difference remains.
            context.timestamp = context.timestamp + (extended - TIMESTAMP_FIELD_MAX);
        }
        // Continuation chunks repeat the extended timestamp; the value was
        // already accounted for when the message started.

        self.stage = Stage::Payload {
            csid,
            starts_message,
        };
        Ok(Progress::Advanced)
    }

    fn read_payload(
        &mut self,
        csid: u32,
        starts_message: bool,
    ) -> Result<Progress, ChunkDecodeError> {
        let chunk_size = self.chunk_size;
        let context = match self.contexts.get_mut(&csid) {
            Some(context) => context,
            None => return Err(ChunkDecodeError::UnknownChunkStream { csid }),
        };

        if starts_message {
            context.bytes_remaining = context.message_length;
        }

        let piece = min(chunk_size, context.bytes_remaining) as usize;
        if self.buffer.len() < piece {
            return Ok(Progress::NotEnoughBytes);
        }

        context.bytes_remaining -= piece as u32;
        let chunk = Chunk {
            csid,
            timestamp: context.timestamp,
            message_length: context.message_length,
            message_type_id: context.message_type_id,
            message_stream_id: context.message_stream_id,
            starts_message,
            payload: self.buffer.split_to(piece).freeze(),
        };

        self.stage = Stage::BasicHeader;
        Ok(Progress::Chunk(chunk))
    }

    /// Looks up the context for a header-bearing chunk, dropping any message
    /// it interrupts (the lenient reading of a mid-message type 0/1/2).
    fn restarted_context(
        &mut self,
        csid: u32,
    ) -> Result<&mut ChunkStreamContext, ChunkDecodeError> {
        let context = match self.contexts.get_mut(&csid) {
            Some(context) => context,
            None => return Err(ChunkDecodeError::UnknownChunkStream { csid }),
        };

        if context.bytes_remaining > 0 {
            warn!(csid, "chunk header arrived mid-message, restarting chunk stream");
            context.bytes_remaining = 0;
        }

        Ok(context)
    }

    fn check_message_length(&self, length: u32) -> Result<(), ChunkDecodeError> {
        if length > self.max_message_size {
            return Err(ChunkDecodeError::MessageTooLarge {
                size: length,
                max: self.max_message_size,
            });
        }

        Ok(())
    }
}

impl Default for ChunkReader {
    fn default() -> Self {
        ChunkReader::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
    use std::io::Write;

    // Hand-assembled chunks; the writer has its own tests and the round
    // trip between the two is covered in the module tests.

    fn basic_header(format_bits: u8, csid: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        if csid < 64 {
            bytes.push(csid as u8 | format_bits);
        } else if csid < 320 {
            bytes.push(format_bits);
            bytes.push((csid - 64) as u8);
        } else {
            bytes.push(1 | format_bits);
            let value = (csid - 64) as u16;
            bytes.push((value & 0xff) as u8);
            bytes.push((value >> 8) as u8);
        }
        bytes
    }

    fn type_0_chunk(
        csid: u32,
        timestamp: u32,
        message_stream_id: u32,
        type_id: u8,
        payload: &[u8],
    ) -> Vec<u8> {
        let mut bytes = basic_header(0b0000_0000, csid);
        let field = min(timestamp, 0xff_ffff);
        bytes.write_u24::<BigEndian>(field).unwrap();
        bytes.write_u24::<BigEndian>(payload.len() as u32).unwrap();
        bytes.write_u8(type_id).unwrap();
        bytes.write_u32::<LittleEndian>(message_stream_id).unwrap();
        if timestamp >= 0xff_ffff {
            bytes.write_u32::<BigEndian>(timestamp).unwrap();
        }
        bytes.write_all(payload).unwrap();
        bytes
    }

    fn type_1_chunk(csid: u32, delta: u32, type_id: u8, payload: &[u8]) -> Vec<u8> {
        let mut bytes = basic_header(0b0100_0000, csid);
        bytes.write_u24::<BigEndian>(min(delta, 0xff_ffff)).unwrap();
        bytes.write_u24::<BigEndian>(payload.len() as u32).unwrap();
        bytes.write_u8(type_id).unwrap();
        if delta >= 0xff_ffff {
            bytes.write_u32::<BigEndian>(delta).unwrap();
        }
        bytes.write_all(payload).unwrap();
        bytes
    }

    fn type_2_chunk(csid: u32, delta: u32, payload: &[u8]) -> Vec<u8> {
        let mut bytes = basic_header(0b1000_0000, csid);
        bytes.write_u24::<BigEndian>(min(delta, 0xff_ffff)).unwrap();
        if delta >= 0xff_ffff {
            bytes.write_u32::<BigEndian>(delta).unwrap();
        }
        bytes.write_all(payload).unwrap();
        bytes
    }

    fn type_3_chunk(csid: u32, extended_timestamp: Option<u32>, payload: &[u8]) -> Vec<u8> {
        let mut bytes = basic_header(0b1100_0000, csid);
        if let Some(timestamp) = extended_timestamp {
            bytes.write_u32::<BigEndian>(timestamp).unwrap();
        }
        bytes.write_all(payload).unwrap();
        bytes
    }

    #[test]
    fn reads_type_0_chunk_with_one_byte_csid() {
        let mut reader = ChunkReader::new();
        let bytes = type_0_chunk(50, 25, 5, 8, &[1, 2, 3]);
        let chunk = reader.read_chunk(&bytes).unwrap().unwrap();

        assert_eq!(chunk.csid, 50);
        assert_eq!(chunk.timestamp, Timestamp::new(25));
        assert_eq!(chunk.message_length, 3);
        assert_eq!(chunk.message_type_id, 8);
        assert_eq!(chunk.message_stream_id, 5);
        assert!(chunk.starts_message);
        assert_eq!(&chunk.payload[..], &[1, 2, 3]);
    }

    #[test]
    fn reads_two_and_three_byte_csids() {
        for csid in [64, 319, 320, 50000] {
            let mut reader = ChunkReader::new();
            let bytes = type_0_chunk(csid, 1, 1, 9, &[7]);
            let chunk = reader.read_chunk(&bytes).unwrap().unwrap();
            assert_eq!(chunk.csid, csid, "csid {} did not survive", csid);
        }
    }

    #[test]
    fn reads_type_0_chunk_with_extended_timestamp() {
        let mut reader = ChunkReader::new();
        let bytes = type_0_chunk(50, 16777216, 5, 8, &[1, 2, 3]);
        let chunk = reader.read_chunk(&bytes).unwrap().unwrap();

        assert_eq!(chunk.timestamp, Timestamp::new(16777216));
    }

    #[test]
    fn type_1_and_2_chunks_accumulate_deltas() {
        let mut reader = ChunkReader::new();
        let _ = reader
            .read_chunk(&type_0_chunk(50, 25, 5, 8, &[1, 2, 3]))
            .unwrap()
            .unwrap();

        let chunk = reader
            .read_chunk(&type_1_chunk(50, 10, 9, &[4, 5, 6]))
            .unwrap()
            .unwrap();
        assert_eq!(chunk.timestamp, Timestamp::new(35));
        assert_eq!(chunk.message_type_id, 9);
        assert_eq!(chunk.message_stream_id, 5, "stream id should be inherited");

        let chunk = reader
            .read_chunk(&type_2_chunk(50, 11, &[7, 8, 9]))
            .unwrap()
            .unwrap();
        assert_eq!(chunk.timestamp, Timestamp::new(46));
        assert_eq!(chunk.message_type_id, 9, "type id should be inherited");
    }

    #[test]
    fn type_3_chunk_starting_new_message_reapplies_delta() {
        let mut reader = ChunkReader::new();
        let _ = reader
            .read_chunk(&type_0_chunk(50, 25, 5, 8, &[1, 2, 3]))
            .unwrap()
            .unwrap();
        let _ = reader
            .read_chunk(&type_2_chunk(50, 11, &[4, 5, 6]))
            .unwrap()
            .unwrap();

        let chunk = reader
            .read_chunk(&type_3_chunk(50, None, &[7, 8, 9]))
            .unwrap()
            .unwrap();
        assert_eq!(chunk.timestamp, Timestamp::new(47));
        assert!(chunk.starts_message);
    }

    #[test]
    fn type_3_continuation_does_not_reapply_delta() {
        // 5 byte message at chunk size 4: one type 1 chunk plus one type 3
        // continuation.  OBS sends exactly this shape.
        let chunk1 = [
            0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x09, 0x01, 0x00, 0x00, 0x00, 0x01,
        ];
        let chunk2 = [
            0x44, 0x00, 0x00, 0x21, 0x00, 0x00, 0x05, 0x09, 0x01, 0x02, 0x03, 0x04, 0xc4, 0x05,
        ];

        let mut reader = ChunkReader::new();
        reader.set_chunk_size(4).unwrap();

        let first = reader.read_chunk(&chunk1).unwrap().unwrap();
        assert_eq!(first.timestamp, Timestamp::new(0));

        let second = reader.read_chunk(&chunk2).unwrap().unwrap();
        assert_eq!(second.timestamp, Timestamp::new(33));
        assert!(second.starts_message);
        assert_eq!(&second.payload[..], &[0x01, 0x02, 0x03, 0x04]);

        let third = reader.read_chunk(&[]).unwrap().unwrap();
        assert_eq!(third.timestamp, Timestamp::new(33), "continuation must not re-add delta");
        assert!(!third.starts_message);
        assert_eq!(&third.payload[..], &[0x05]);
    }

    #[test]
    fn type_3_continuation_with_extended_timestamp_repeats_it() {
        // Type 0 chunk with extended timestamp and a 7 byte message at
        // chunk size 4; the continuation carries the extended timestamp
        // again because the opening chunk did.
        let chunk1 = [
            0x06, 0xff, 0xff, 0xff, 0x00, 0x00, 0x07, 0x09, 0x01, 0x00, 0x00, 0x00, 0x01, 0xff,
            0xff, 0xff, 0x01, 0x02, 0x03, 0x04,
        ];
        let chunk2 = [0xc6, 0x01, 0xff, 0xff, 0xff, 0x05, 0x06, 0x07];

        let mut reader = ChunkReader::new();
        reader.set_chunk_size(4).unwrap();

        let first = reader.read_chunk(&chunk1).unwrap().unwrap();
        assert_eq!(first.timestamp, Timestamp::new(0x01ff_ffff));

        let second = reader.read_chunk(&chunk2).unwrap().unwrap();
        assert_eq!(second.timestamp, Timestamp::new(0x01ff_ffff));
        assert_eq!(&second.payload[..], &[0x05, 0x06, 0x07]);
    }

    #[test]
    fn chunk_can_arrive_split_across_reads() {
        let mut reader = ChunkReader::new();
        let bytes = type_0_chunk(50, 25, 5, 8, &[1, 2, 3]);
        let (first, second) = bytes.split_at(bytes.len() / 2);

        assert!(reader.read_chunk(first).unwrap().is_none());
        let chunk = reader.read_chunk(second).unwrap().unwrap();
        assert_eq!(&chunk.payload[..], &[1, 2, 3]);
    }

    #[test]
    fn large_message_is_sliced_at_the_chunk_size() {
        let mut reader = ChunkReader::new();
        reader.set_chunk_size(100).unwrap();

        let payload = [42_u8; 250];
        let mut bytes = type_0_chunk(50, 25, 5, 8, &payload[..100]);
        // Rewrite the length field (bytes 4..7 after the one byte basic
        // header) to cover the whole message before appending continuations.
        bytes[4..7].copy_from_slice(&[0, 0, 250]);
        bytes.extend(type_3_chunk(50, None, &payload[100..200]));
        bytes.extend(type_3_chunk(50, None, &payload[200..]));

        let chunk1 = reader.read_chunk(&bytes).unwrap().unwrap();
        assert!(chunk1.starts_message);
        assert_eq!(chunk1.payload.len(), 100);

        let chunk2 = reader.read_chunk(&[]).unwrap().unwrap();
        assert!(!chunk2.starts_message);
        assert_eq!(chunk2.payload.len(), 100);

        let chunk3 = reader.read_chunk(&[]).unwrap().unwrap();
        assert!(!chunk3.starts_message);
        assert_eq!(chunk3.payload.len(), 50);
    }

    #[test]
    fn interleaved_chunk_streams_keep_separate_progress() {
        let mut reader = ChunkReader::new();
        reader.set_chunk_size(2).unwrap();

        // Two 4 byte messages interleaved chunk by chunk on csids 4 and 5.
        let mut bytes = type_0_chunk(4, 10, 1, 8, &[0xa1, 0xa2]);
        bytes[4..7].copy_from_slice(&[0, 0, 4]);
        let mut other = type_0_chunk(5, 20, 1, 9, &[0xb1, 0xb2]);
        other[4..7].copy_from_slice(&[0, 0, 4]);
        bytes.extend(other);
        bytes.extend(type_3_chunk(4, None, &[0xa3, 0xa4]));
        bytes.extend(type_3_chunk(5, None, &[0xb3, 0xb4]));

        let mut chunks = vec![reader.read_chunk(&bytes).unwrap().unwrap()];
        while let Some(chunk) = reader.read_chunk(&[]).unwrap() {
            chunks.push(chunk);
        }

        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].csid, 4);
        assert_eq!(chunks[1].csid, 5);
        assert_eq!(chunks[2].csid, 4);
        assert!(!chunks[2].starts_message);
        assert_eq!(chunks[3].csid, 5);
        assert!(!chunks[3].starts_message);
    }

    #[test]
    fn compressed_header_without_context_is_an_error() {
        let mut reader = ChunkReader::new();
        match reader.read_chunk(&type_2_chunk(50, 5, &[])) {
            Err(ChunkDecodeError::UnknownChunkStream { csid: 50 }) => {}
            x => panic!("Expected UnknownChunkStream, got {:?}", x),
        }
    }

    #[test]
    fn full_header_mid_message_restarts_the_stream() {
        let mut reader = ChunkReader::new();
        reader.set_chunk_size(2).unwrap();

        let mut bytes = type_0_chunk(4, 10, 1, 8, &[0xa1, 0xa2]);
        bytes[4..7].copy_from_slice(&[0, 0, 4]); // promise 4 bytes, deliver 2

        let first = reader.read_chunk(&bytes).unwrap().unwrap();
        assert!(first.starts_message);

        let abandoning = type_0_chunk(4, 50, 1, 8, &[0xcc, 0xdd]);
        let second = reader.read_chunk(&abandoning).unwrap().unwrap();
        assert!(second.starts_message, "new full header must start a message");
        assert_eq!(second.message_length, 2);
        assert_eq!(&second.payload[..], &[0xcc, 0xdd]);
    }

    #[test]
    fn chunk_size_mask_and_cap() {
        let mut reader = ChunkReader::new();

        assert_eq!(reader.set_chunk_size(0x8000_1000).unwrap(), 0x1000);
        assert_eq!(reader.set_chunk_size(0x7fff_ffff).unwrap(), 0xff_ffff);
        match reader.set_chunk_size(0x8000_0000) {
            Err(ChunkDecodeError::InvalidChunkSize { .. }) => {}
            x => panic!("Expected InvalidChunkSize, got {:?}", x),
        }
    }

    #[test]
    fn aborted_stream_starts_fresh_on_next_chunk() {
        let mut reader = ChunkReader::new();
        reader.set_chunk_size(2).unwrap();

        let mut bytes = type_0_chunk(4, 10, 1, 8, &[0xa1, 0xa2]);
        bytes[4..7].copy_from_slice(&[0, 0, 4]);
        let _ = reader.read_chunk(&bytes).unwrap().unwrap();

        reader.abort(4);

        let next = reader
            .read_chunk(&type_3_chunk(4, None, &[0xa3, 0xa4]))
            .unwrap()
            .unwrap();
        assert!(next.starts_message, "post-abort chunk should start a message");
    }
}
