//! Typed decode/encode rules layered over the datasource primitives.
//!
//! The set of supported types is closed: fixed-size scalars, `bool`, text,
//! opaque data, and lists of text. Each rule reads (or writes) one record,
//! except the lists, which interleave records with `bool` continuation flags.

use std::fmt;

use crate::datasource::{Datasource, StreamId};
use crate::error::DatasourceError;

/// A type that can be derived from a datasource.
pub trait Decode: Sized {
    fn decode<D: Datasource + ?Sized>(source: &mut D, id: StreamId)
    -> Result<Self, DatasourceError>;
}

/// A type whose canonical form can be recorded into a datasource's output.
///
/// Encoding is the mirror of [`Decode`]: feeding the output to a fresh reader
/// and decoding the same type yields the original value.
pub trait Encode {
    fn encode<D: Datasource + ?Sized>(&self, sink: &mut D, id: StreamId);
}

/// Reads a record of exactly `N` bytes.
fn fixed<const N: usize, D: Datasource + ?Sized>(
    source: &mut D,
    id: StreamId,
) -> Result<[u8; N], DatasourceError> {
    let raw = source.get_record(N, N, id)?;
    let len = raw.len();
    raw.try_into().map_err(|_| {
        DatasourceError::deserialization(format!(
            "datasource returned {len} bytes for a {N}-byte value"
        ))
    })
}

macro_rules! impl_scalar_codec {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Decode for $ty {
                fn decode<D: Datasource + ?Sized>(
                    source: &mut D,
                    id: StreamId,
                ) -> Result<Self, DatasourceError> {
                    fixed(source, id).map(<$ty>::from_ne_bytes)
                }
            }

            impl Encode for $ty {
                fn encode<D: Datasource + ?Sized>(&self, sink: &mut D, id: StreamId) {
                    sink.put_record(&self.to_ne_bytes(), id);
                }
            }
        )*
    };
}

impl_scalar_codec!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
);

/// Decoded from one byte by parity: odd is `true`, even is `false`.
///
/// Not a zero test: `2` decodes to `false`.
impl Decode for bool {
    fn decode<D: Datasource + ?Sized>(
        source: &mut D,
        id: StreamId,
    ) -> Result<Self, DatasourceError> {
        let [byte] = fixed::<1, D>(source, id)?;
        Ok(byte % 2 == 1)
    }
}

impl Encode for bool {
    fn encode<D: Datasource + ?Sized>(&self, sink: &mut D, id: StreamId) {
        sink.put_record(&[u8::from(*self)], id);
    }
}

/// Text taken verbatim from a record. No encoding is checked or required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Text(Vec<u8>);

impl Text {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Text(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the text as UTF-8 if it is valid.
    pub fn to_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Text(s.as_bytes().to_vec())
    }
}

impl From<String> for Text {
    fn from(s: String) -> Self {
        Text(s.into_bytes())
    }
}

impl From<Vec<u8>> for Text {
    fn from(bytes: Vec<u8>) -> Self {
        Text(bytes)
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// An opaque byte buffer taken verbatim from a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Data(Vec<u8>);

impl Data {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Data(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Data {
    fn from(bytes: Vec<u8>) -> Self {
        Data(bytes)
    }
}

impl From<&[u8]> for Data {
    fn from(bytes: &[u8]) -> Self {
        Data(bytes.to_vec())
    }
}

impl AsRef<[u8]> for Data {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Decode for Text {
    fn decode<D: Datasource + ?Sized>(
        source: &mut D,
        id: StreamId,
    ) -> Result<Self, DatasourceError> {
        source.get_record(0, 0, id).map(Text)
    }
}

impl Encode for Text {
    fn encode<D: Datasource + ?Sized>(&self, sink: &mut D, id: StreamId) {
        sink.put_record(&self.0, id);
    }
}

impl Decode for Data {
    fn decode<D: Datasource + ?Sized>(
        source: &mut D,
        id: StreamId,
    ) -> Result<Self, DatasourceError> {
        source.get_record(0, 0, id).map(Data)
    }
}

impl Encode for Data {
    fn encode<D: Datasource + ?Sized>(&self, sink: &mut D, id: StreamId) {
        sink.put_record(&self.0, id);
    }
}

/// Invalid UTF-8 is replaced with U+FFFD. Decode [`Text`] to keep the bytes.
impl Decode for String {
    fn decode<D: Datasource + ?Sized>(
        source: &mut D,
        id: StreamId,
    ) -> Result<Self, DatasourceError> {
        Text::decode(source, id).map(|text| text.to_string_lossy())
    }
}

impl Encode for String {
    fn encode<D: Datasource + ?Sized>(&self, sink: &mut D, id: StreamId) {
        sink.put_record(self.as_bytes(), id);
    }
}

impl Encode for str {
    fn encode<D: Datasource + ?Sized>(&self, sink: &mut D, id: StreamId) {
        sink.put_record(self.as_bytes(), id);
    }
}

impl Encode for [u8] {
    fn encode<D: Datasource + ?Sized>(&self, sink: &mut D, id: StreamId) {
        sink.put_record(self, id);
    }
}

/// Reads text records, each followed by a `bool` asking for another.
///
/// Unlike [`Datasource::get_vector`] the flag comes after the item, so at least
/// one entry is always read.
fn decode_text_list<T, D>(source: &mut D, id: StreamId) -> Result<Vec<T>, DatasourceError>
where
    T: Decode,
    D: Datasource + ?Sized,
{
    let mut items = Vec::new();
    loop {
        items.push(T::decode(source, id)?);
        if !bool::decode(source, id)? {
            return Ok(items);
        }
    }
}

impl Decode for Vec<String> {
    fn decode<D: Datasource + ?Sized>(
        source: &mut D,
        id: StreamId,
    ) -> Result<Self, DatasourceError> {
        decode_text_list(source, id)
    }
}

impl Decode for Vec<Text> {
    fn decode<D: Datasource + ?Sized>(
        source: &mut D,
        id: StreamId,
    ) -> Result<Self, DatasourceError> {
        decode_text_list(source, id)
    }
}
