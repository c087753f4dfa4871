//! Reading and writing of values encoded with the Adobe AMF0 specification,
//! as used by RTMP command and data messages.
//!
//! Objects keep their properties in insertion order, so a decoded value can
//! be re-encoded without reordering what the peer sent.
//!
//! # Examples
//! ```
//! use std::io::Cursor;
//! use inlet_amf0::{Amf0Value, encode, decode};
//!
//! let values = vec![
//!     Amf0Value::Utf8String("connect".to_string()),
//!     Amf0Value::Number(1.0),
//!     Amf0Value::Object(vec![
//!         ("app".to_string(), Amf0Value::Utf8String("live".to_string())),
//!     ]),
//! ];
//!
//! let bytes = encode(&values).unwrap();
//! let decoded = decode(&mut Cursor::new(bytes)).unwrap();
//! assert_eq!(decoded, values);
//! ```

mod decoder;
mod encoder;
mod errors;

pub use decoder::{decode, decode_strict};
pub use encoder::encode;
pub use errors::{Amf0DecodeError, Amf0EncodeError};

/// A single value in the AMF0 type system.
///
/// Reference, Movieclip, Recordset, XML-Document, Typed-Object, and the
/// AVMPlus switch marker have no representation here; the decoder maps them
/// to `Null` (or errors in strict mode).
#[derive(PartialEq, Debug, Clone)]
pub enum Amf0Value {
    Number(f64),
    Boolean(bool),
    Utf8String(String),
    /// Property list in insertion order, terminated on the wire by an empty
    /// key and the object-end marker.
    Object(Vec<(String, Amf0Value)>),
    /// Same wire shape as an object, preceded by a (redundant) element count.
    EcmaArray(Vec<(String, Amf0Value)>),
    StrictArray(Vec<Amf0Value>),
    /// Milliseconds since the unix epoch.  The encoded i16 timezone offset is
    /// always written as zero and ignored when read.
    Date { unix_ms: f64 },
    /// A string longer than a u16 length prefix allows.
    LongString(String),
    Null,
    Undefined,
}

impl Amf0Value {
    pub fn get_number(self) -> Option<f64> {
        match self {
            Amf0Value::Number(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_boolean(self) -> Option<bool> {
        match self {
            Amf0Value::Boolean(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_string(self) -> Option<String> {
        match self {
            Amf0Value::Utf8String(value) => Some(value),
            Amf0Value::LongString(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_object_properties(self) -> Option<Vec<(String, Amf0Value)>> {
        match self {
            Amf0Value::Object(properties) => Some(properties),
            Amf0Value::EcmaArray(properties) => Some(properties),
            _ => None,
        }
    }
}

mod markers {
    pub const NUMBER: u8 = 0x00;
    pub const BOOLEAN: u8 = 0x01;
    pub const STRING: u8 = 0x02;
    pub const OBJECT: u8 = 0x03;
    pub const MOVIECLIP: u8 = 0x04;
    pub const NULL: u8 = 0x05;
    pub const UNDEFINED: u8 = 0x06;
    pub const REFERENCE: u8 = 0x07;
    pub const ECMA_ARRAY: u8 = 0x08;
    pub const OBJECT_END: u8 = 0x09;
    pub const STRICT_ARRAY: u8 = 0x0a;
    pub const DATE: u8 = 0x0b;
    pub const LONG_STRING: u8 = 0x0c;
    pub const RECORDSET: u8 = 0x0e;
    pub const XML_DOCUMENT: u8 = 0x0f;
    pub const TYPED_OBJECT: u8 = 0x10;
    pub const AVMPLUS: u8 = 0x11;
    pub const UTF8_EMPTY: u16 = 0x0000;
}
