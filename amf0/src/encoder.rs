//! Turns values into their AMF0 byte representation.

use crate::errors::Amf0EncodeError;
use crate::markers;
use crate::Amf0Value;
use byteorder::{BigEndian, WriteBytesExt};

/// Encodes a sequence of values into AMF0 bytes, in order.
pub fn encode(values: &[Amf0Value]) -> Result<Vec<u8>, Amf0EncodeError> {
    let mut bytes = Vec::new();
    for value in values {
        encode_value(value, &mut bytes)?;
    }

    Ok(bytes)
}

fn encode_value(value: &Amf0Value, bytes: &mut Vec<u8>) -> Result<(), Amf0EncodeError> {
    match value {
        Amf0Value::Number(val) => {
            bytes.push(markers::NUMBER);
            bytes.write_f64::<BigEndian>(*val)?;
        }

        Amf0Value::Boolean(val) => {
            bytes.push(markers::BOOLEAN);
            bytes.push(*val as u8);
        }

        Amf0Value::Utf8String(val) => {
            if val.len() > u16::MAX as usize {
                return Err(Amf0EncodeError::NormalStringTooLong);
            }

            bytes.push(markers::STRING);
            bytes.write_u16::<BigEndian>(val.len() as u16)?;
            bytes.extend(val.as_bytes());
        }

        Amf0Value::LongString(val) => {
            bytes.push(markers::LONG_STRING);
            bytes.write_u32::<BigEndian>(val.len() as u32)?;
            bytes.extend(val.as_bytes());
        }

        Amf0Value::Object(properties) => {
            bytes.push(markers::OBJECT);
            encode_properties(properties, bytes)?;
        }

        Amf0Value::EcmaArray(properties) => {
            bytes.push(markers::ECMA_ARRAY);
            bytes.write_u32::<BigEndian>(properties.len() as u32)?;
            encode_properties(properties, bytes)?;
        }

        Amf0Value::StrictArray(values) => {
            bytes.push(markers::STRICT_ARRAY);
            bytes.write_u32::<BigEndian>(values.len() as u32)?;
            for value in values {
                encode_value(value, bytes)?;
            }
        }

        Amf0Value::Date { unix_ms } => {
            bytes.push(markers::DATE);
            bytes.write_f64::<BigEndian>(*unix_ms)?;
            bytes.write_i16::<BigEndian>(0)?;
        }

        Amf0Value::Null => bytes.push(markers::NULL),
        Amf0Value::Undefined => bytes.push(markers::UNDEFINED),
    }

    Ok(())
}

fn encode_properties(
    properties: &[(String, Amf0Value)],
    bytes: &mut Vec<u8>,
) -> Result<(), Amf0EncodeError> {
    for (name, value) in properties {
        if name.len() > u16::MAX as usize {
            return Err(Amf0EncodeError::PropertyNameTooLong);
        }

        bytes.write_u16::<BigEndian>(name.len() as u16)?;
        bytes.extend(name.as_bytes());
        encode_value(value, bytes)?;
    }

    bytes.write_u16::<BigEndian>(markers::UTF8_EMPTY)?;
    bytes.push(markers::OBJECT_END);
    Ok(())
}
