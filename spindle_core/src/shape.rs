//! Runtime dispatch over the typed decode/encode rules.
//!
//! A shape is a comma-separated list of kinds such as `u16, bool, vec<text>`.
//! Decoding a shape issues one typed decode per kind, in order, which is how
//! tools outside a fuzz harness can read (or synthesise) the same stream a
//! harness would.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::codec::{Data, Decode, Encode, Text};
use crate::datasource::{Datasource, StreamId};
use crate::error::DatasourceError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("Unknown kind '{0}'")]
    UnknownKind(String),
    #[error("Shape is empty")]
    Empty,
}

/// One decode step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Bool,
    /// A `u16` branch selector.
    Choice,
    Text,
    Data,
    /// Text entries each followed by a continuation flag.
    Strings,
    /// Continuation flags each followed by one inner value.
    Vec(Box<Kind>),
}

impl FromStr for Kind {
    type Err = ShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        if let Some(inner) = name
            .strip_prefix("vec<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            return Ok(Kind::Vec(Box::new(inner.parse()?)));
        }
        Ok(match name.as_str() {
            "u8" => Kind::U8,
            "u16" => Kind::U16,
            "u32" => Kind::U32,
            "u64" => Kind::U64,
            "i8" => Kind::I8,
            "i16" => Kind::I16,
            "i32" => Kind::I32,
            "i64" => Kind::I64,
            "f32" => Kind::F32,
            "f64" => Kind::F64,
            "bool" => Kind::Bool,
            "choice" => Kind::Choice,
            "text" => Kind::Text,
            "data" => Kind::Data,
            "strings" => Kind::Strings,
            _ => return Err(ShapeError::UnknownKind(s.trim().to_string())),
        })
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::U8 => "u8",
            Kind::U16 => "u16",
            Kind::U32 => "u32",
            Kind::U64 => "u64",
            Kind::I8 => "i8",
            Kind::I16 => "i16",
            Kind::I32 => "i32",
            Kind::I64 => "i64",
            Kind::F32 => "f32",
            Kind::F64 => "f64",
            Kind::Bool => "bool",
            Kind::Choice => "choice",
            Kind::Text => "text",
            Kind::Data => "data",
            Kind::Strings => "strings",
            Kind::Vec(inner) => return write!(f, "vec<{inner}>"),
        };
        f.write_str(name)
    }
}

/// Parses a comma-separated list of kinds.
pub fn parse_shape(s: &str) -> Result<Vec<Kind>, ShapeError> {
    let kinds = s
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect::<Result<Vec<Kind>, _>>()?;
    if kinds.is_empty() {
        return Err(ShapeError::Empty);
    }
    Ok(kinds)
}

/// A decoded value, tagged with its kind when serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Choice(u16),
    Text(#[serde(serialize_with = "lossy_text")] Text),
    Data(#[serde(serialize_with = "hex_data")] Data),
    Strings(Vec<String>),
    Vec(Vec<Value>),
}

fn lossy_text<S: Serializer>(text: &Text, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&text.to_string_lossy())
}

fn hex_data<S: Serializer>(data: &Data, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(data.as_bytes()))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::U8(v) => write!(f, "u8 {v}"),
            Value::U16(v) => write!(f, "u16 {v}"),
            Value::U32(v) => write!(f, "u32 {v}"),
            Value::U64(v) => write!(f, "u64 {v}"),
            Value::I8(v) => write!(f, "i8 {v}"),
            Value::I16(v) => write!(f, "i16 {v}"),
            Value::I32(v) => write!(f, "i32 {v}"),
            Value::I64(v) => write!(f, "i64 {v}"),
            Value::F32(v) => write!(f, "f32 {v}"),
            Value::F64(v) => write!(f, "f64 {v}"),
            Value::Bool(v) => write!(f, "bool {v}"),
            Value::Choice(v) => write!(f, "choice {v}"),
            Value::Text(v) => write!(f, "text {:?}", v.to_string_lossy()),
            Value::Data(v) => write!(f, "data [{}] {}", v.len(), hex::encode(v.as_bytes())),
            Value::Strings(v) => write!(f, "strings {v:?}"),
            Value::Vec(items) => {
                write!(f, "vec [")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Decodes one value of the given kind.
pub fn decode_value<D: Datasource + ?Sized>(
    source: &mut D,
    kind: &Kind,
    id: StreamId,
) -> Result<Value, DatasourceError> {
    Ok(match kind {
        Kind::U8 => Value::U8(u8::decode(source, id)?),
        Kind::U16 => Value::U16(u16::decode(source, id)?),
        Kind::U32 => Value::U32(u32::decode(source, id)?),
        Kind::U64 => Value::U64(u64::decode(source, id)?),
        Kind::I8 => Value::I8(i8::decode(source, id)?),
        Kind::I16 => Value::I16(i16::decode(source, id)?),
        Kind::I32 => Value::I32(i32::decode(source, id)?),
        Kind::I64 => Value::I64(i64::decode(source, id)?),
        Kind::F32 => Value::F32(f32::decode(source, id)?),
        Kind::F64 => Value::F64(f64::decode(source, id)?),
        Kind::Bool => Value::Bool(bool::decode(source, id)?),
        Kind::Choice => Value::Choice(source.get_choice(id)?),
        Kind::Text => Value::Text(Text::decode(source, id)?),
        Kind::Data => Value::Data(Data::decode(source, id)?),
        Kind::Strings => Value::Strings(Vec::<String>::decode(source, id)?),
        Kind::Vec(inner) => {
            let mut items = Vec::new();
            while bool::decode(source, id)? {
                items.push(decode_value(source, inner, id)?);
            }
            Value::Vec(items)
        }
    })
}

/// Decodes every kind of `shape` in order.
pub fn decode_shape<D: Datasource + ?Sized>(
    source: &mut D,
    shape: &[Kind],
    id: StreamId,
) -> Result<Vec<Value>, DatasourceError> {
    shape
        .iter()
        .map(|kind| decode_value(source, kind, id))
        .collect()
}

/// Records `value` so that decoding its kind from the output returns it.
///
/// An empty `Strings` list has no encoding of its own, since the decoder
/// always reads one entry; it is written as a single empty entry.
pub fn encode_value<D: Datasource + ?Sized>(sink: &mut D, value: &Value, id: StreamId) {
    match value {
        Value::U8(v) => v.encode(sink, id),
        Value::U16(v) | Value::Choice(v) => v.encode(sink, id),
        Value::U32(v) => v.encode(sink, id),
        Value::U64(v) => v.encode(sink, id),
        Value::I8(v) => v.encode(sink, id),
        Value::I16(v) => v.encode(sink, id),
        Value::I32(v) => v.encode(sink, id),
        Value::I64(v) => v.encode(sink, id),
        Value::F32(v) => v.encode(sink, id),
        Value::F64(v) => v.encode(sink, id),
        Value::Bool(v) => v.encode(sink, id),
        Value::Text(v) => v.encode(sink, id),
        Value::Data(v) => v.encode(sink, id),
        Value::Strings(entries) => {
            if entries.is_empty() {
                "".encode(sink, id);
                false.encode(sink, id);
            }
            for (i, entry) in entries.iter().enumerate() {
                entry.encode(sink, id);
                (i + 1 < entries.len()).encode(sink, id);
            }
        }
        Value::Vec(items) => {
            for item in items {
                true.encode(sink, id);
                encode_value(sink, item, id);
            }
            false.encode(sink, id);
        }
    }
}
