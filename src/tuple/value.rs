use std::fmt;

use bytes::{Buf, BufMut};

use super::DataType;

/// Represents a typed value that can be stored in a tuple.
/// Each variant corresponds to a DataType and holds the actual data.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean value
    Boolean(bool),

    /// 8-bit signed integer
    TinyInt(i8),

    /// 16-bit signed integer
    SmallInt(i16),

    /// 32-bit signed integer
    Integer(i32),

    /// 64-bit signed integer
    BigInt(i64),

    /// 32-bit floating point
    Float(f32),

    /// 64-bit floating point
    Double(f64),

    /// String value (used for both Char and Text)
    String(String),

    /// Timestamp value (microseconds since Unix epoch)
    Timestamp(i64),
}

impl Value {
    /// Returns true if this value can be stored in a field of the given type.
    pub fn fits(&self, data_type: &DataType) -> bool {
        match (self, data_type) {
            (Value::Boolean(_), DataType::Boolean)
            | (Value::TinyInt(_), DataType::TinyInt)
            | (Value::SmallInt(_), DataType::SmallInt)
            | (Value::Integer(_), DataType::Integer)
            | (Value::BigInt(_), DataType::BigInt)
            | (Value::Float(_), DataType::Float)
            | (Value::Double(_), DataType::Double)
            | (Value::Timestamp(_), DataType::Timestamp) => true,
            (Value::String(s), DataType::Char(n)) | (Value::String(s), DataType::Text(n)) => {
                s.len() <= *n as usize
            }
            _ => false,
        }
    }

    /// Writes the value into `buf` using exactly `data_type.size()` bytes.
    /// Returns None if the value is incompatible with the type.
    pub fn encode<B: BufMut>(&self, data_type: &DataType, buf: &mut B) -> Option<()> {
        if !self.fits(data_type) {
            return None;
        }

        match (self, data_type) {
            (Value::Boolean(b), _) => buf.put_u8(u8::from(*b)),
            (Value::TinyInt(v), _) => buf.put_i8(*v),
            (Value::SmallInt(v), _) => buf.put_i16_le(*v),
            (Value::Integer(v), _) => buf.put_i32_le(*v),
            (Value::BigInt(v), _) => buf.put_i64_le(*v),
            (Value::Float(v), _) => buf.put_f32_le(*v),
            (Value::Double(v), _) => buf.put_f64_le(*v),
            (Value::Timestamp(v), _) => buf.put_i64_le(*v),

            (Value::String(s), DataType::Char(n)) => {
                // Pad with spaces to fixed length
                buf.put_slice(s.as_bytes());
                buf.put_bytes(b' ', *n as usize - s.len());
            }

            (Value::String(s), DataType::Text(n)) => {
                // Format: length (2 bytes) + data + zero padding
                buf.put_u16_le(s.len() as u16);
                buf.put_slice(s.as_bytes());
                buf.put_bytes(0, *n as usize - s.len());
            }

            _ => return None,
        }

        Some(())
    }

    /// Reads one value of the given type from the front of `buf`.
    /// Returns None if `buf` is too short or the bytes are not a valid value.
    pub fn decode<B: Buf>(buf: &mut B, data_type: &DataType) -> Option<Self> {
        if buf.remaining() < data_type.size() {
            return None;
        }

        let value = match data_type {
            DataType::Boolean => Value::Boolean(buf.get_u8() != 0),
            DataType::TinyInt => Value::TinyInt(buf.get_i8()),
            DataType::SmallInt => Value::SmallInt(buf.get_i16_le()),
            DataType::Integer => Value::Integer(buf.get_i32_le()),
            DataType::BigInt => Value::BigInt(buf.get_i64_le()),
            DataType::Float => Value::Float(buf.get_f32_le()),
            DataType::Double => Value::Double(buf.get_f64_le()),
            DataType::Timestamp => Value::Timestamp(buf.get_i64_le()),

            DataType::Char(n) => {
                let mut raw = vec![0u8; *n as usize];
                buf.copy_to_slice(&mut raw);
                // Trim trailing spaces
                let s = String::from_utf8(raw).ok()?;
                Value::String(s.trim_end_matches(' ').to_string())
            }

            DataType::Text(n) => {
                let len = buf.get_u16_le() as usize;
                if len > *n as usize {
                    return None;
                }
                let mut raw = vec![0u8; *n as usize];
                buf.copy_to_slice(&mut raw);
                raw.truncate(len);
                Value::String(String::from_utf8(raw).ok()?)
            }
        };

        Some(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::TinyInt(v) => write!(f, "{}", v),
            Value::SmallInt(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::Timestamp(v) => write!(f, "TIMESTAMP({})", v),
        }
    }
}

// Convenience conversions
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::TinyInt(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::SmallInt(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}
