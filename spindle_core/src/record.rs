/// Width in bytes of the length field that prefixes every record.
///
/// The field is a `u32` stored in the machine's native byte order, so streams
/// produced on one endianness are only replayable on the same endianness.
pub const LENGTH_FIELD_WIDTH: usize = std::mem::size_of::<u32>();

/// Largest payload a single record can describe.
pub const MAX_PAYLOAD_LEN: usize = u32::MAX as usize;

/// Appends one record (length field followed by `payload`) to `out`.
///
/// Payloads longer than [`MAX_PAYLOAD_LEN`] are cut down to that length so the
/// length field and the payload always agree.
pub fn write_record(out: &mut Vec<u8>, payload: &[u8]) {
    let payload = &payload[..payload.len().min(MAX_PAYLOAD_LEN)];
    let len = payload.len() as u32;
    out.reserve(LENGTH_FIELD_WIDTH + payload.len());
    out.extend_from_slice(&len.to_ne_bytes());
    out.extend_from_slice(payload);
}

/// Reads a length field from the start of `bytes`, if enough bytes are present.
pub fn read_length_field(bytes: &[u8]) -> Option<u32> {
    let field: [u8; LENGTH_FIELD_WIDTH] = bytes.get(..LENGTH_FIELD_WIDTH)?.try_into().ok()?;
    Some(u32::from_ne_bytes(field))
}

/// A record as it appears in a buffer, before any clamping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<'a> {
    /// Offset of the length field within the walked buffer.
    pub offset: usize,
    /// Length announced by the length field.
    pub declared_len: u32,
    /// Payload bytes actually present. Shorter than `declared_len` when the
    /// record is truncated.
    pub payload: &'a [u8],
    /// Whether the whole declared payload was present.
    pub complete: bool,
}

/// Walks a buffer record by record, taking every length field at face value.
///
/// This is an inspection tool: decoding through a datasource clamps lengths to
/// what the caller asked for, so the two views diverge whenever a consumer
/// reads fixed-size values out of records declaring other lengths.
#[derive(Debug, Clone)]
pub struct Records<'a> {
    data: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> Records<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            done: false,
        }
    }

    /// Bytes left unvisited. Once iteration has finished this is whatever
    /// trailing data was too short to hold a length field.
    pub fn remainder(&self) -> &'a [u8] {
        &self.data[self.offset..]
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let rest = &self.data[self.offset..];
        let Some(declared_len) = read_length_field(rest) else {
            self.done = true;
            return None;
        };

        let offset = self.offset;
        let body = &rest[LENGTH_FIELD_WIDTH..];
        let wanted = declared_len as usize;
        let (payload, complete) = if body.len() >= wanted {
            (&body[..wanted], true)
        } else {
            self.done = true;
            (body, false)
        };
        self.offset += LENGTH_FIELD_WIDTH + payload.len();

        Some(Record {
            offset,
            declared_len,
            payload,
            complete,
        })
    }
}
