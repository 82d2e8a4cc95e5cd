//! Canonical wire codec: tagged TLV values with variable-length integers.
//!
//! Every value is encoded as `tag(1 byte) || body`. The encoding is
//! canonical: the same logical value always produces the same bytes, which
//! is what makes signatures over serialized blocks reproducible.
//!
//! Lengths and unsigned integers use VQL, a little-endian base-128 encoding
//! where each byte carries 7 value bits and the high bit marks continuation.

use bytes::Bytes;
use serde_json::Value as Json;

use crate::buffer::{ByteReader, ByteWriter};
use crate::error::{ChainError, Result};
use crate::marshal::Marshalled;

/// Wire tags. The numeric values are part of the canonical contract.
mod tag {
    pub const NULL: u8 = 0;
    pub const STRING: u8 = 1;
    pub const UINT: u8 = 2;
    pub const OBJECT: u8 = 3;
    pub const ARRAY: u8 = 4;
    pub const MARSHALLED: u8 = 5;
    pub const BUFFER: u8 = 6;
}

/// A value the codec can carry.
///
/// The variant set mirrors the serializer's dispatch order: absent values,
/// then strings, byte buffers, 32-bit unsigned integers, arrays, marshalled
/// envelopes, and finally generic JSON objects as the fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Bytes(Bytes),
    Uint(u32),
    Array(Vec<Value>),
    Marshalled(Marshalled),
    Json(Json),
}

impl Value {
    /// Lift this value into the marshalling envelope, preserving the
    /// narrowest typed form of every node.
    pub fn to_marshalled(&self) -> Marshalled {
        match self {
            Value::Null => Marshalled::Null,
            Value::String(s) => Marshalled::String(s.clone()),
            Value::Bytes(b) => Marshalled::Binary(b.clone()),
            Value::Uint(n) => Marshalled::Integer(*n as i64),
            Value::Array(items) => {
                Marshalled::Array(items.iter().map(Value::to_marshalled).collect())
            }
            Value::Marshalled(m) => m.clone(),
            Value::Json(j) => Marshalled::from_plain_json(j),
        }
    }
}

/// Conversion of user payloads into codec values.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl ToValue for &str {
    fn to_value(&self) -> Value {
        Value::String((*self).to_string())
    }
}

impl ToValue for u32 {
    fn to_value(&self) -> Value {
        Value::Uint(*self)
    }
}

impl ToValue for Bytes {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(Bytes::from(self.clone()))
    }
}

impl ToValue for Json {
    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }
}

impl ToValue for Marshalled {
    fn to_value(&self) -> Value {
        Value::Marshalled(self.clone())
    }
}

/// Append a non-negative integer in VQL form.
///
/// Zero emits exactly one `0x00` byte.
pub fn write_u32_vql(out: &mut Vec<u8>, mut value: u32) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Read a VQL integer from the reader.
pub fn read_u32_vql(reader: &mut ByteReader) -> Result<u32> {
    let mut value: u32 = 0;
    let mut shift: u32 = 0;
    loop {
        let byte = reader.read(Some(1))?[0];
        if shift >= 32 || (shift == 28 && (byte & 0x7f) > 0x0f) {
            return Err(ChainError::InvalidArgument(
                "VQL value exceeds 32 bits".into(),
            ));
        }
        value |= ((byte & 0x7f) as u32) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

/// Serialize a value to its canonical byte form.
pub fn serialize(value: &Value) -> Result<Bytes> {
    let mut writer = ByteWriter::new();
    write_value(&mut writer, value)?;
    writer.drain()
}

fn write_value(writer: &mut ByteWriter, value: &Value) -> Result<()> {
    match value {
        Value::Null => writer.write(vec![tag::NULL]),
        Value::String(s) => write_sized(writer, tag::STRING, s.as_bytes()),
        Value::Bytes(b) => write_sized(writer, tag::BUFFER, b),
        Value::Uint(n) => {
            let mut head = vec![tag::UINT];
            write_u32_vql(&mut head, *n);
            writer.write(head)
        }
        Value::Array(items) => {
            let mut head = vec![tag::ARRAY];
            write_u32_vql(&mut head, items.len() as u32);
            writer.write(head)?;
            for item in items {
                write_value(writer, item)?;
            }
            Ok(())
        }
        Value::Marshalled(m) => {
            let body = serde_json::to_vec(&m.to_json())
                .map_err(|e| ChainError::InvalidType(format!("marshal encode failed: {e}")))?;
            write_sized(writer, tag::MARSHALLED, &body)
        }
        Value::Json(j) => {
            let body = serde_json::to_vec(j)
                .map_err(|e| ChainError::InvalidType(format!("object encode failed: {e}")))?;
            write_sized(writer, tag::OBJECT, &body)
        }
    }
}

fn write_sized(writer: &mut ByteWriter, tag: u8, body: &[u8]) -> Result<()> {
    let mut head = vec![tag];
    write_u32_vql(&mut head, body.len() as u32);
    writer.write(head)?;
    if !body.is_empty() {
        writer.write(body.to_vec())?;
    }
    Ok(())
}

/// Deserialize one value from the reader. Strictly tag-driven; an unknown
/// tag fails with `ERR_UNSUPPORTED_OPERATION`.
pub fn deserialize(reader: &mut ByteReader) -> Result<Value> {
    let tag_byte = reader.read(Some(1))?[0];
    match tag_byte {
        tag::NULL => Ok(Value::Null),
        tag::STRING => {
            let body = read_sized(reader)?;
            let text = String::from_utf8(body.to_vec())
                .map_err(|e| ChainError::InvalidType(format!("invalid UTF-8 string: {e}")))?;
            Ok(Value::String(text))
        }
        tag::UINT => Ok(Value::Uint(read_u32_vql(reader)?)),
        tag::OBJECT => {
            let body = read_sized(reader)?;
            let json: Json = serde_json::from_slice(&body)
                .map_err(|e| ChainError::InvalidType(format!("invalid JSON object: {e}")))?;
            Ok(Value::Json(json))
        }
        tag::ARRAY => {
            let count = read_u32_vql(reader)?;
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(deserialize(reader)?);
            }
            Ok(Value::Array(items))
        }
        tag::MARSHALLED => {
            let body = read_sized(reader)?;
            let json: Json = serde_json::from_slice(&body)
                .map_err(|e| ChainError::InvalidType(format!("invalid marshal envelope: {e}")))?;
            Ok(Value::Marshalled(Marshalled::from_json(&json)?))
        }
        tag::BUFFER => Ok(Value::Bytes(read_sized(reader)?)),
        other => Err(ChainError::UnsupportedOperation(format!(
            "unknown wire tag {other}"
        ))),
    }
}

/// Deserialize a value from a standalone byte slice.
pub fn deserialize_bytes(bytes: impl Into<Bytes>) -> Result<Value> {
    let mut reader = ByteReader::new(bytes.into());
    deserialize(&mut reader)
}

fn read_sized(reader: &mut ByteReader) -> Result<Bytes> {
    let len = read_u32_vql(reader)? as usize;
    if len == 0 {
        return Ok(Bytes::new());
    }
    reader.read(Some(len))
}
