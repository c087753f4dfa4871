use super::codec;
use super::{Message, MessageDecodeError, MessageEncodeError};
use crate::time::Timestamp;
use bytes::Bytes;

/// One raw RTMP message: the unit the chunk layer reassembles and the
/// session layer dispatches on.
#[derive(PartialEq, Debug, Clone)]
pub struct MessagePayload {
    pub timestamp: Timestamp,
    pub type_id: u8,
    pub message_stream_id: u32,
    pub data: Bytes,
}

impl MessagePayload {
    /// Interprets the payload bytes according to the message type id.
    ///
    /// Cheap to call: the payload buffer is reference counted, so `Unknown`
    /// and the audio/video variants share it rather than copying.
    pub fn to_message(&self) -> Result<Message, MessageDecodeError> {
        codec::decode(self.type_id, self.data.clone())
    }
}

impl Message {
    /// Serializes this message into a payload carrying the given timestamp
    /// and message stream id.
    pub fn into_payload(
        self,
        timestamp: Timestamp,
        message_stream_id: u32,
    ) -> Result<MessagePayload, MessageEncodeError> {
        let (type_id, data) = codec::encode(self)?;

        Ok(MessagePayload {
            timestamp,
            type_id,
            message_stream_id,
            data,
        })
    }
}
