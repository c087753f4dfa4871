//! Turns AMF0 encoded bytes back into values.

use crate::errors::Amf0DecodeError;
use crate::markers;
use crate::Amf0Value;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::Read;
use tracing::warn;

#[derive(Clone, Copy, PartialEq)]
enum Mode {
    Lenient,
    Strict,
}

/// Reads every AMF0 value from the byte stream until it is exhausted.
///
/// Markers this codec does not model (reference, movieclip, recordset, xml
/// document, typed object, avmplus switch) are decoded as `Null` and logged.
/// Their payload length is unknowable, so the decode stops at that point
/// (however deeply nested) and the values read so far are returned.
pub fn decode<R: Read>(bytes: &mut R) -> Result<Vec<Amf0Value>, Amf0DecodeError> {
    Decoder::new(Mode::Lenient).read_all(bytes)
}

/// Like [`decode`] but fails with `UnsupportedMarker` instead of substituting
/// nulls for the markers this codec does not model.
pub fn decode_strict<R: Read>(bytes: &mut R) -> Result<Vec<Amf0Value>, Amf0DecodeError> {
    Decoder::new(Mode::Strict).read_all(bytes)
}

struct Decoder {
    mode: Mode,
    /// Set when the lenient path hits a marker it cannot parse past; every
    /// enclosing scope unwinds with what it has.
    halted: bool,
}

impl Decoder {
    fn new(mode: Mode) -> Decoder {
        Decoder { mode, halted: false }
    }

    fn read_all<R: Read>(&mut self, bytes: &mut R) -> Result<Vec<Amf0Value>, Amf0DecodeError> {
        let mut results = Vec::new();

        while !self.halted {
            match self.read_next(bytes)? {
                Some(value) => results.push(value),
                None => break,
            }
        }

        Ok(results)
    }

    /// Reads one value; `None` means the input ended (or an object-end
    /// marker surfaced where a value was expected).
    fn read_next<R: Read>(&mut self, bytes: &mut R) -> Result<Option<Amf0Value>, Amf0DecodeError> {
        let mut marker: [u8; 1] = [0];
        if bytes.read(&mut marker)? == 0 {
            return Ok(None);
        }

        let value = match marker[0] {
            markers::NUMBER => Amf0Value::Number(bytes.read_f64::<BigEndian>()?),
            markers::BOOLEAN => Amf0Value::Boolean(bytes.read_u8()? == 1),
            markers::STRING => Amf0Value::Utf8String(read_string(bytes)?),
            markers::OBJECT => Amf0Value::Object(self.read_properties(bytes)?),
            markers::NULL => Amf0Value::Null,
            markers::UNDEFINED => Amf0Value::Undefined,
            markers::ECMA_ARRAY => {
                // The element count is advisory; real encoders still
                // terminate the array with the empty key + object-end
                // sequence, so it is parsed exactly like an object.
                let _count = bytes.read_u32::<BigEndian>()?;
                Amf0Value::EcmaArray(self.read_properties(bytes)?)
            }
            markers::OBJECT_END => return Ok(None),
            markers::STRICT_ARRAY => self.read_strict_array(bytes)?,
            markers::DATE => {
                let unix_ms = bytes.read_f64::<BigEndian>()?;
                let _timezone = bytes.read_i16::<BigEndian>()?;
                Amf0Value::Date { unix_ms }
            }
            markers::LONG_STRING => Amf0Value::LongString(read_long_string(bytes)?),
            markers::MOVIECLIP
            | markers::REFERENCE
            | markers::RECORDSET
            | markers::XML_DOCUMENT
            | markers::TYPED_OBJECT
            | markers::AVMPLUS => {
                if self.mode == Mode::Strict {
                    return Err(Amf0DecodeError::UnsupportedMarker { marker: marker[0] });
                }

                warn!(marker = marker[0], "unsupported amf0 marker decoded as null");
                self.halted = true;
                Amf0Value::Null
            }
            unknown => return Err(Amf0DecodeError::UnknownMarker { marker: unknown }),
        };

        Ok(Some(value))
    }

    fn read_strict_array<R: Read>(
        &mut self,
        bytes: &mut R,
    ) -> Result<Amf0Value, Amf0DecodeError> {
        let count = bytes.read_u32::<BigEndian>()?;
        let mut values = Vec::new();

        for _ in 0..count {
            match self.read_next(bytes)? {
                Some(value) => values.push(value),
                None => return Err(Amf0DecodeError::Truncated),
            }

            if self.halted {
                break;
            }
        }

        Ok(Amf0Value::StrictArray(values))
    }

    fn read_properties<R: Read>(
        &mut self,
        bytes: &mut R,
    ) -> Result<Vec<(String, Amf0Value)>, Amf0DecodeError> {
        let mut properties = Vec::new();

        loop {
            let label_length = bytes.read_u16::<BigEndian>()?;
            if label_length == 0 {
                // The terminator is an empty label followed by the
                // object-end marker, which still has to be consumed.
                if bytes.read_u8()? != markers::OBJECT_END {
                    return Err(Amf0DecodeError::UnexpectedEmptyObjectPropertyName);
                }

                return Ok(properties);
            }

            let label = read_utf8(bytes, label_length as usize)?;
            match self.read_next(bytes)? {
                Some(value) => properties.push((label, value)),
                None => return Err(Amf0DecodeError::Truncated),
            }

            if self.halted {
                return Ok(properties);
            }
        }
    }
}

fn read_string<R: Read>(bytes: &mut R) -> Result<String, Amf0DecodeError> {
    let length = bytes.read_u16::<BigEndian>()?;
    read_utf8(bytes, length as usize)
}

fn read_long_string<R: Read>(bytes: &mut R) -> Result<String, Amf0DecodeError> {
    let length = bytes.read_u32::<BigEndian>()?;
    read_utf8(bytes, length as usize)
}

fn read_utf8<R: Read>(bytes: &mut R, length: usize) -> Result<String, Amf0DecodeError> {
    let mut buffer = vec![0_u8; length];
    bytes.read_exact(&mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::{decode, decode_strict};
    use crate::errors::Amf0DecodeError;
    use crate::markers;
    use crate::Amf0Value;
    use byteorder::{BigEndian, WriteBytesExt};
    use std::io::Cursor;

    #[test]
    fn can_decode_number() {
        let mut vector = vec![markers::NUMBER];
        vector.write_f64::<BigEndian>(332.0).unwrap();

        let result = decode(&mut Cursor::new(vector)).unwrap();
        assert_eq!(result, vec![Amf0Value::Number(332.0)]);
    }

    #[test]
    fn can_decode_booleans() {
        let result = decode(&mut Cursor::new(vec![markers::BOOLEAN, 1])).unwrap();
        assert_eq!(result, vec![Amf0Value::Boolean(true)]);

        let result = decode(&mut Cursor::new(vec![markers::BOOLEAN, 0])).unwrap();
        assert_eq!(result, vec![Amf0Value::Boolean(false)]);
    }

    #[test]
    fn can_decode_string() {
        let mut vector = vec![markers::STRING];
        vector.write_u16::<BigEndian>(4).unwrap();
        vector.extend("test".as_bytes());

        let result = decode(&mut Cursor::new(vector)).unwrap();
        assert_eq!(result, vec![Amf0Value::Utf8String("test".to_string())]);
    }

    #[test]
    fn can_decode_long_string() {
        let mut vector = vec![markers::LONG_STRING];
        vector.write_u32::<BigEndian>(4).unwrap();
        vector.extend("test".as_bytes());

        let result = decode(&mut Cursor::new(vector)).unwrap();
        assert_eq!(result, vec![Amf0Value::LongString("test".to_string())]);
    }

    #[test]
    fn can_decode_null_and_undefined() {
        let result = decode(&mut Cursor::new(vec![markers::NULL, markers::UNDEFINED])).unwrap();
        assert_eq!(result, vec![Amf0Value::Null, Amf0Value::Undefined]);
    }

    #[test]
    fn can_decode_object_preserving_property_order() {
        let mut vector = vec![markers::OBJECT];
        for (name, number) in [("zzz", 1.0), ("aaa", 2.0), ("mmm", 3.0)] {
            vector.write_u16::<BigEndian>(name.len() as u16).unwrap();
            vector.extend(name.as_bytes());
            vector.push(markers::NUMBER);
            vector.write_f64::<BigEndian>(number).unwrap();
        }
        vector.write_u16::<BigEndian>(markers::UTF8_EMPTY).unwrap();
        vector.push(markers::OBJECT_END);

        let result = decode(&mut Cursor::new(vector)).unwrap();
        let expected = vec![Amf0Value::Object(vec![
            ("zzz".to_string(), Amf0Value::Number(1.0)),
            ("aaa".to_string(), Amf0Value::Number(2.0)),
            ("mmm".to_string(), Amf0Value::Number(3.0)),
        ])];

        assert_eq!(result, expected);
    }

    #[test]
    fn can_decode_ecma_array() {
        let mut vector = vec![markers::ECMA_ARRAY];
        vector.write_u32::<BigEndian>(1).unwrap();
        vector.write_u16::<BigEndian>(4).unwrap();
        vector.extend("test".as_bytes());
        vector.push(markers::NUMBER);
        vector.write_f64::<BigEndian>(1.0).unwrap();
        vector.write_u16::<BigEndian>(markers::UTF8_EMPTY).unwrap();
        vector.push(markers::OBJECT_END);

        let result = decode(&mut Cursor::new(vector)).unwrap();
        let expected = vec![Amf0Value::EcmaArray(vec![(
            "test".to_string(),
            Amf0Value::Number(1.0),
        )])];

        assert_eq!(result, expected);
    }

    #[test]
    fn can_decode_strict_array() {
        let mut vector = vec![markers::STRICT_ARRAY];
        vector.write_u32::<BigEndian>(2).unwrap();
        vector.push(markers::NUMBER);
        vector.write_f64::<BigEndian>(1.0).unwrap();
        vector.push(markers::NUMBER);
        vector.write_f64::<BigEndian>(2.0).unwrap();

        let result = decode(&mut Cursor::new(vector)).unwrap();
        let expected = vec![Amf0Value::StrictArray(vec![
            Amf0Value::Number(1.0),
            Amf0Value::Number(2.0),
        ])];

        assert_eq!(result, expected);
    }

    #[test]
    fn can_decode_date_ignoring_timezone() {
        let mut vector = vec![markers::DATE];
        vector.write_f64::<BigEndian>(1234567890000.0).unwrap();
        vector.write_i16::<BigEndian>(-300).unwrap();

        let result = decode(&mut Cursor::new(vector)).unwrap();
        assert_eq!(
            result,
            vec![Amf0Value::Date {
                unix_ms: 1234567890000.0
            }]
        );
    }

    #[test]
    fn lenient_decode_turns_reference_into_null_and_stops() {
        let mut vector = vec![markers::NUMBER];
        vector.write_f64::<BigEndian>(1.0).unwrap();
        vector.push(markers::REFERENCE);
        vector.write_u16::<BigEndian>(0).unwrap();

        let result = decode(&mut Cursor::new(vector)).unwrap();
        assert_eq!(result, vec![Amf0Value::Number(1.0), Amf0Value::Null]);
    }

    #[test]
    fn lenient_decode_stops_even_inside_an_object() {
        let mut vector = vec![markers::OBJECT];
        vector.write_u16::<BigEndian>(3).unwrap();
        vector.extend("bad".as_bytes());
        vector.push(markers::TYPED_OBJECT);
        // Trailing garbage that must not be interpreted once halted.
        vector.extend([0xee, 0xee, 0xee]);

        let result = decode(&mut Cursor::new(vector)).unwrap();
        assert_eq!(
            result,
            vec![Amf0Value::Object(vec![(
                "bad".to_string(),
                Amf0Value::Null
            )])]
        );
    }

    #[test]
    fn strict_decode_fails_on_unsupported_marker() {
        let vector = vec![markers::TYPED_OBJECT];
        match decode_strict(&mut Cursor::new(vector)) {
            Err(Amf0DecodeError::UnsupportedMarker { marker }) => {
                assert_eq!(marker, markers::TYPED_OBJECT)
            }
            x => panic!("Expected UnsupportedMarker, got {:?}", x),
        }
    }

    #[test]
    fn unknown_marker_is_an_error_in_both_modes() {
        match decode(&mut Cursor::new(vec![0x42])) {
            Err(Amf0DecodeError::UnknownMarker { marker: 0x42 }) => {}
            x => panic!("Expected UnknownMarker, got {:?}", x),
        }

        match decode_strict(&mut Cursor::new(vec![0x42])) {
            Err(Amf0DecodeError::UnknownMarker { marker: 0x42 }) => {}
            x => panic!("Expected UnknownMarker, got {:?}", x),
        }
    }

    #[test]
    fn truncated_string_is_an_error() {
        let mut vector = vec![markers::STRING];
        vector.write_u16::<BigEndian>(10).unwrap();
        vector.extend("shor".as_bytes());

        match decode(&mut Cursor::new(vector)) {
            Err(Amf0DecodeError::Truncated) => {}
            x => panic!("Expected Truncated, got {:?}", x),
        }
    }

    #[test]
    fn truncated_object_is_an_error() {
        let mut vector = vec![markers::OBJECT];
        vector.write_u16::<BigEndian>(4).unwrap();
        vector.extend("test".as_bytes());

        match decode(&mut Cursor::new(vector)) {
            Err(Amf0DecodeError::Truncated) => {}
            x => panic!("Expected Truncated, got {:?}", x),
        }
    }
}
