//! Wire codecs for each message type.  Bodies are small and fixed-layout
//! except for commands and data, which are AMF0 sequences.

use super::{Message, MessageDecodeError, MessageEncodeError, PeerBandwidthLimit, UserControlEvent};
use crate::time::Timestamp;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use inlet_amf0::Amf0Value;
use std::io::Cursor;

pub fn decode(type_id: u8, data: Bytes) -> Result<Message, MessageDecodeError> {
    match type_id {
        1 => decode_set_chunk_size(data),
        2 => decode_abort(data),
        3 => decode_acknowledgement(data),
        4 => decode_user_control(data),
        5 => decode_window_ack_size(data),
        6 => decode_set_peer_bandwidth(data),
        8 => Ok(Message::Audio { data }),
        9 => Ok(Message::Video { data }),
        15 => decode_data(skip_amf3_switch(data)?),
        17 => decode_command(skip_amf3_switch(data)?),
        18 => decode_data(data),
        20 => decode_command(data),
        _ => Ok(Message::Unknown { type_id, data }),
    }
}

pub fn encode(message: Message) -> Result<(u8, Bytes), MessageEncodeError> {
    match message {
        Message::SetChunkSize { size } => Ok((1, encode_u32(size)?)),
        Message::Abort { csid } => Ok((2, encode_u32(csid)?)),
        Message::Acknowledgement { sequence_number } => Ok((3, encode_u32(sequence_number)?)),
        Message::UserControl(event) => Ok((4, encode_user_control(event)?)),
        Message::WindowAckSize { size } => Ok((5, encode_u32(size)?)),
        Message::SetPeerBandwidth { size, limit_type } => {
            let mut cursor = Cursor::new(Vec::new());
            cursor.write_u32::<BigEndian>(size)?;
            cursor.write_u8(match limit_type {
                PeerBandwidthLimit::Hard => 0,
                PeerBandwidthLimit::Soft => 1,
                PeerBandwidthLimit::Dynamic => 2,
            })?;
            Ok((6, Bytes::from(cursor.into_inner())))
        }
        Message::Audio { data } => Ok((8, data)),
        Message::Video { data } => Ok((9, data)),
        Message::Command {
            name,
            transaction_id,
            object,
            args,
        } => {
            let mut values = vec![
                Amf0Value::Utf8String(name),
                Amf0Value::Number(transaction_id),
                object,
            ];
            values.extend(args);
            Ok((20, Bytes::from(inlet_amf0::encode(&values)?)))
        }
        Message::Data { values } => Ok((18, Bytes::from(inlet_amf0::encode(&values)?))),
        Message::Unknown { type_id, data } => Ok((type_id, data)),
    }
}

/// AMF3 command/data bodies start with a one byte format switch (0x00 means
/// "actually AMF0"), then plain AMF0 bytes follow.
fn skip_amf3_switch(data: Bytes) -> Result<Bytes, MessageDecodeError> {
    if data.is_empty() {
        return Err(MessageDecodeError::InvalidFormat);
    }

    Ok(data.slice(1..))
}

fn decode_set_chunk_size(data: Bytes) -> Result<Message, MessageDecodeError> {
    let size = Cursor::new(data).read_u32::<BigEndian>()?;
    Ok(Message::SetChunkSize { size })
}

fn decode_abort(data: Bytes) -> Result<Message, MessageDecodeError> {
    let csid = Cursor::new(data).read_u32::<BigEndian>()?;
    Ok(Message::Abort { csid })
}

fn decode_acknowledgement(data: Bytes) -> Result<Message, MessageDecodeError> {
    let sequence_number = Cursor::new(data).read_u32::<BigEndian>()?;
    Ok(Message::Acknowledgement { sequence_number })
}

fn decode_window_ack_size(data: Bytes) -> Result<Message, MessageDecodeError> {
    let size = Cursor::new(data).read_u32::<BigEndian>()?;
    Ok(Message::WindowAckSize { size })
}

fn decode_set_peer_bandwidth(data: Bytes) -> Result<Message, MessageDecodeError> {
    let mut cursor = Cursor::new(data);
    let size = cursor.read_u32::<BigEndian>()?;
    let limit_type = match cursor.read_u8()? {
        0 => PeerBandwidthLimit::Hard,
        1 => PeerBandwidthLimit::Soft,
        2 => PeerBandwidthLimit::Dynamic,
        _ => return Err(MessageDecodeError::InvalidFormat),
    };

    Ok(Message::SetPeerBandwidth { size, limit_type })
}

fn decode_user_control(data: Bytes) -> Result<Message, MessageDecodeError> {
    let mut cursor = Cursor::new(data);
    let event = match cursor.read_u16::<BigEndian>()? {
        0 => UserControlEvent::StreamBegin {
            stream_id: cursor.read_u32::<BigEndian>()?,
        },
        1 => UserControlEvent::StreamEof {
            stream_id: cursor.read_u32::<BigEndian>()?,
        },
        2 => UserControlEvent::StreamDry {
            stream_id: cursor.read_u32::<BigEndian>()?,
        },
        3 => UserControlEvent::SetBufferLength {
            stream_id: cursor.read_u32::<BigEndian>()?,
            buffer_length: cursor.read_u32::<BigEndian>()?,
        },
        4 => UserControlEvent::StreamIsRecorded {
            stream_id: cursor.read_u32::<BigEndian>()?,
        },
        6 => UserControlEvent::PingRequest {
            timestamp: Timestamp::new(cursor.read_u32::<BigEndian>()?),
        },
        7 => UserControlEvent::PingResponse {
            timestamp: Timestamp::new(cursor.read_u32::<BigEndian>()?),
        },
        _ => return Err(MessageDecodeError::InvalidFormat),
    };

    Ok(Message::UserControl(event))
}

fn encode_user_control(event: UserControlEvent) -> Result<Bytes, MessageEncodeError> {
    let mut cursor = Cursor::new(Vec::new());

    match event {
        UserControlEvent::StreamBegin { stream_id } => {
            cursor.write_u16::<BigEndian>(0)?;
            cursor.write_u32::<BigEndian>(stream_id)?;
        }
        UserControlEvent::StreamEof { stream_id } => {
            cursor.write_u16::<BigEndian>(1)?;
            cursor.write_u32::<BigEndian>(stream_id)?;
        }
        UserControlEvent::StreamDry { stream_id } => {
            cursor.write_u16::<BigEndian>(2)?;
            cursor.write_u32::<BigEndian>(stream_id)?;
        }
        UserControlEvent::SetBufferLength {
            stream_id,
            buffer_length,
        } => {
            cursor.write_u16::<BigEndian>(3)?;
            cursor.write_u32::<BigEndian>(stream_id)?;
            cursor.write_u32::<BigEndian>(buffer_length)?;
        }
        UserControlEvent::StreamIsRecorded { stream_id } => {
            cursor.write_u16::<BigEndian>(4)?;
            cursor.write_u32::<BigEndian>(stream_id)?;
        }
        UserControlEvent::PingRequest { timestamp } => {
            cursor.write_u16::<BigEndian>(6)?;
            cursor.write_u32::<BigEndian>(timestamp.value)?;
        }
        UserControlEvent::PingResponse { timestamp } => {
            cursor.write_u16::<BigEndian>(7)?;
            cursor.write_u32::<BigEndian>(timestamp.value)?;
        }
    }

    Ok(Bytes::from(cursor.into_inner()))
}

fn decode_command(data: Bytes) -> Result<Message, MessageDecodeError> {
    let mut values = inlet_amf0::decode(&mut Cursor::new(&data[..]))?;
    if values.len() < 2 {
        return Err(MessageDecodeError::InvalidFormat);
    }

    let name = match values.remove(0) {
        Amf0Value::Utf8String(name) => name,
        _ => return Err(MessageDecodeError::InvalidFormat),
    };

    let transaction_id = match values.remove(0) {
        Amf0Value::Number(id) => id,
        _ => return Err(MessageDecodeError::InvalidFormat),
    };

    let object = if values.is_empty() {
        Amf0Value::Null
    } else {
        values.remove(0)
    };

    Ok(Message::Command {
        name,
        transaction_id,
        object,
        args: values,
    })
}

fn decode_data(data: Bytes) -> Result<Message, MessageDecodeError> {
    let values = inlet_amf0::decode(&mut Cursor::new(&data[..]))?;
    Ok(Message::Data { values })
}

fn encode_u32(value: u32) -> Result<Bytes, MessageEncodeError> {
    let mut cursor = Cursor::new(Vec::with_capacity(4));
    cursor.write_u32::<BigEndian>(value)?;
    Ok(Bytes::from(cursor.into_inner()))
}
