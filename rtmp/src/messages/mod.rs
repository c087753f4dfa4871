//! The RTMP message layer: the typed view of message payloads, their wire
//! codecs, and reassembly of messages from chunks.

mod assembler;
mod codec;
mod errors;
mod payload;

pub use self::assembler::MessageAssembler;
pub use self::errors::{MessageDecodeError, MessageEncodeError};
pub use self::payload::MessagePayload;

use crate::time::Timestamp;
use bytes::Bytes;
use inlet_amf0::Amf0Value;

/// How strictly the peer is asked to honor a bandwidth limit.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum PeerBandwidthLimit {
    Hard,
    Soft,
    Dynamic,
}

/// The events a USER_CONTROL message can carry.
#[derive(PartialEq, Debug, Clone)]
pub enum UserControlEvent {
    StreamBegin { stream_id: u32 },
    StreamEof { stream_id: u32 },
    StreamDry { stream_id: u32 },
    SetBufferLength { stream_id: u32, buffer_length: u32 },
    StreamIsRecorded { stream_id: u32 },
    PingRequest { timestamp: Timestamp },
    PingResponse { timestamp: Timestamp },
}

/// Every message the engine understands, by payload shape.
///
/// Command and Data cover both their AMF0 and AMF3 type ids; the AMF3
/// variants are AMF0 bytes behind a one byte format switch.  Message types
/// with no entry here (shared objects included) surface as `Unknown`.
#[derive(PartialEq, Debug, Clone)]
pub enum Message {
    SetChunkSize {
        size: u32,
    },
    Abort {
        csid: u32,
    },
    Acknowledgement {
        sequence_number: u32,
    },
    UserControl(UserControlEvent),
    WindowAckSize {
        size: u32,
    },
    SetPeerBandwidth {
        size: u32,
        limit_type: PeerBandwidthLimit,
    },
    Audio {
        data: Bytes,
    },
    Video {
        data: Bytes,
    },
    Command {
        name: String,
        transaction_id: f64,
        object: Amf0Value,
        args: Vec<Amf0Value>,
    },
    Data {
        values: Vec<Amf0Value>,
    },
    Unknown {
        type_id: u8,
        data: Bytes,
    },
}
