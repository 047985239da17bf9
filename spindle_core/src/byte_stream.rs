use tracing::{debug, trace};

use crate::datasource::{Datasource, StreamId};
use crate::error::DatasourceError;
use crate::record::{LENGTH_FIELD_WIDTH, read_length_field, write_record};

/// A datasource reading records from a fixed input buffer.
///
/// This is the datasource a fuzz entry point builds around the bytes the fuzz
/// engine hands it. Reads advance a cursor through the buffer; writes go to a
/// separate output that can later be replayed as the buffer of a new
/// `ByteStream`.
///
/// `offset() + left() == len()` holds at all times.
#[derive(Debug, Clone)]
pub struct ByteStream<'a> {
    data: &'a [u8],
    offset: usize,
    left: usize,
    out: Vec<u8>,
}

impl<'a> ByteStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            left: data.len(),
            out: Vec::new(),
        }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Total length of the backing buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consumes the datasource, returning everything written to it.
    pub fn into_out(self) -> Vec<u8> {
        self.out
    }

    fn advance(&mut self, by: usize) {
        self.offset += by;
        self.left -= by;
    }
}

impl Datasource for ByteStream<'_> {
    /// A failed payload read still consumes the length field before it: the
    /// cursor is not rewound.
    fn get_record(
        &mut self,
        min: usize,
        max: usize,
        _id: StreamId,
    ) -> Result<Vec<u8>, DatasourceError> {
        let declared = match read_length_field(&self.data[self.offset..]) {
            Some(len) => len,
            None => {
                debug!(
                    offset = self.offset,
                    left = self.left,
                    "no room for a length field"
                );
                return Err(DatasourceError::OutOfData {
                    needed: LENGTH_FIELD_WIDTH,
                    left: self.left,
                });
            }
        };
        self.advance(LENGTH_FIELD_WIDTH);

        let mut len = declared as usize;
        if len < min {
            len = min;
        }
        if max != 0 && len > max {
            len = max;
        }

        if self.left < len {
            debug!(
                offset = self.offset,
                declared,
                clamped = len,
                left = self.left,
                "payload runs past end of input"
            );
            return Err(DatasourceError::OutOfData {
                needed: len,
                left: self.left,
            });
        }

        let payload = self.data[self.offset..self.offset + len].to_vec();
        trace!(offset = self.offset, declared, clamped = len, "read record");
        self.advance(len);
        Ok(payload)
    }

    fn put_record(&mut self, bytes: &[u8], _id: StreamId) {
        trace!(len = bytes.len(), out_len = self.out.len(), "write record");
        write_record(&mut self.out, bytes);
    }

    fn out(&self) -> &[u8] {
        &self.out
    }

    fn left(&self) -> usize {
        self.left
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Data, Text};
    use crate::datasource::DEFAULT_STREAM;
    use proptest::prelude::*;

    fn record(payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        write_record(&mut out, payload);
        out
    }

    #[test]
    fn get_data_reads_hello() {
        let data = record(b"hello");
        let mut ds = ByteStream::new(&data);
        assert_eq!(ds.left(), 9);
        let bytes = ds.get_data(DEFAULT_STREAM, 0, 0).unwrap();
        assert_eq!(bytes, b"hello");
        assert_eq!(ds.left(), 0);
        assert_eq!(ds.offset(), 9);
    }

    #[cfg(target_endian = "little")]
    #[test]
    fn get_data_reads_literal_little_endian_record() {
        let data = [5, 0, 0, 0, b'h', b'e', b'l', b'l', b'o'];
        let mut ds = ByteStream::new(&data);
        assert_eq!(ds.left(), 9);
        assert_eq!(ds.get_data(DEFAULT_STREAM, 0, 0).unwrap(), b"hello");
        assert_eq!(ds.left(), 0);
    }

    #[test]
    fn short_buffers_are_out_of_data() {
        for len in 0..LENGTH_FIELD_WIDTH {
            let data = vec![0u8; len];
            let mut ds = ByteStream::new(&data);
            let err = ds.get_record(0, 0, DEFAULT_STREAM).unwrap_err();
            assert_eq!(
                err,
                DatasourceError::OutOfData {
                    needed: LENGTH_FIELD_WIDTH,
                    left: len
                },
                "A {len}-byte buffer cannot hold a length field"
            );
            assert_eq!(ds.left(), len, "Nothing is consumed without a full field");
        }
    }

    #[test]
    fn failed_payload_read_keeps_length_field_consumed() {
        let mut data = 10u32.to_ne_bytes().to_vec();
        data.extend_from_slice(b"abc");
        let mut ds = ByteStream::new(&data);

        let err = ds.get_record(0, 0, DEFAULT_STREAM).unwrap_err();
        assert_eq!(err, DatasourceError::OutOfData { needed: 10, left: 3 });
        assert_eq!(ds.left(), 3);
        assert_eq!(ds.offset(), 4);
    }

    #[test]
    fn clamp_raises_to_min() {
        let mut data = record(b"ab");
        data.extend_from_slice(b"cd");
        let mut ds = ByteStream::new(&data);
        assert_eq!(ds.get_record(4, 8, DEFAULT_STREAM).unwrap(), b"abcd");
        assert_eq!(ds.left(), 0);
    }

    #[test]
    fn clamp_lowers_to_max() {
        let data = record(b"abcdef");
        let mut ds = ByteStream::new(&data);
        assert_eq!(ds.get_record(0, 2, DEFAULT_STREAM).unwrap(), b"ab");
        assert_eq!(ds.left(), 4, "Bytes beyond the clamp stay in the stream");
    }

    #[test]
    fn zero_max_is_unbounded() {
        let payload = vec![0x5A; 300];
        let data = record(&payload);
        let mut ds = ByteStream::new(&data);
        assert_eq!(ds.get_record(0, 0, DEFAULT_STREAM).unwrap(), payload);
    }

    #[test]
    fn clamp_to_min_can_run_out_of_data() {
        let data = record(&[]);
        let mut ds = ByteStream::new(&data);
        let err = ds.get::<u64>(DEFAULT_STREAM).unwrap_err();
        assert_eq!(err, DatasourceError::OutOfData { needed: 8, left: 0 });
    }

    #[test]
    fn empty_record_returns_empty_payload() {
        let data = record(&[]);
        let mut ds = ByteStream::new(&data);
        assert!(ds.get_record(0, 0, DEFAULT_STREAM).unwrap().is_empty());
        assert_eq!(ds.left(), 0);
    }

    #[test]
    fn get_at_zero_left_fails() {
        let data = record(b"x");
        let mut ds = ByteStream::new(&data);
        ds.get_record(0, 0, DEFAULT_STREAM).unwrap();
        assert_eq!(ds.left(), 0);
        assert!(ds.get_record(0, 0, DEFAULT_STREAM).unwrap_err().is_out_of_data());
    }

    #[test]
    fn bool_scenarios() {
        // On big-endian hosts the field reads as 0x01000000; the clamp still
        // forces a 1-byte read.
        let odd = [1, 0, 0, 0, 0x01];
        let even = [1, 0, 0, 0, 0x02];
        assert!(ByteStream::new(&odd).get::<bool>(DEFAULT_STREAM).unwrap());
        assert!(!ByteStream::new(&even).get::<bool>(DEFAULT_STREAM).unwrap());
    }

    #[test]
    fn put_record_appends_in_call_order() {
        let mut ds = ByteStream::new(&[]);
        ds.put_data(b"ab", DEFAULT_STREAM);
        ds.put_data(&[], DEFAULT_STREAM);
        let mut expected = record(b"ab");
        expected.extend(record(&[]));
        assert_eq!(ds.out(), expected.as_slice());
        assert_eq!(ds.left(), 0, "Writes never touch the backing buffer");
    }

    #[test]
    fn get_vector_empty_when_first_flag_false() {
        let mut data = record(&[0]);
        data.extend(record(&7u32.to_ne_bytes()));
        let mut ds = ByteStream::new(&data);
        let items: Vec<u32> = ds.get_vector(DEFAULT_STREAM).unwrap();
        assert!(items.is_empty());
        assert_eq!(ds.left(), 8, "No u32 payload should be consumed");
    }

    #[test]
    fn get_vector_reads_flagged_items() {
        let mut data = Vec::new();
        for (flag, value) in [(1u8, 10u16), (3, 20)] {
            data.extend(record(&[flag]));
            data.extend(record(&value.to_ne_bytes()));
        }
        data.extend(record(&[4]));
        let mut ds = ByteStream::new(&data);
        assert_eq!(ds.get_vector::<u16>(DEFAULT_STREAM).unwrap(), vec![10, 20]);
        assert_eq!(ds.left(), 0);
    }

    #[test]
    fn put_vector_replays_through_get_vector() {
        let mut writer = ByteStream::new(&[]);
        let texts = vec![Text::from("a"), Text::from(""), Text::new(vec![0xFF])];
        writer.put_vector(&texts, DEFAULT_STREAM);
        writer.put_vector::<u8>(&[], DEFAULT_STREAM);
        let out = writer.into_out();

        let mut reader = ByteStream::new(&out);
        assert_eq!(reader.get_vector::<Text>(DEFAULT_STREAM).unwrap(), texts);
        assert!(reader.get_vector::<u8>(DEFAULT_STREAM).unwrap().is_empty());
        assert_eq!(reader.left(), 0);
    }

    #[test]
    fn get_choice_is_deterministic() {
        let data = record(&[0xFF, 0xFF]);
        let first = ByteStream::new(&data).get_choice(DEFAULT_STREAM).unwrap();
        let second = ByteStream::new(&data).get_choice(DEFAULT_STREAM).unwrap();
        assert_eq!(first, u16::MAX);
        assert_eq!(first, second);
    }

    #[test]
    fn works_through_trait_object() {
        let data = record(&[2, 0]);
        let mut stream = ByteStream::new(&data);
        let ds: &mut dyn Datasource = &mut stream;
        assert_eq!(ds.get_choice(DEFAULT_STREAM).unwrap(), u16::from_ne_bytes([2, 0]));
        ds.put_record(b"z", DEFAULT_STREAM);
        assert_eq!(ds.out(), record(b"z").as_slice());
    }

    #[test]
    fn output_replays_data_values() {
        let mut writer = ByteStream::new(&[]);
        writer.put(&Data::from(vec![1, 2, 3]), DEFAULT_STREAM);
        writer.put(&0xDEAD_BEEFu32, DEFAULT_STREAM);
        writer.put(&true, DEFAULT_STREAM);

        let out = writer.into_out();
        let mut reader = ByteStream::new(&out);
        assert_eq!(reader.get::<Data>(DEFAULT_STREAM).unwrap().as_bytes(), &[1, 2, 3]);
        assert_eq!(reader.get::<u32>(DEFAULT_STREAM).unwrap(), 0xDEAD_BEEF);
        assert!(reader.get::<bool>(DEFAULT_STREAM).unwrap());
        assert_eq!(reader.left(), 0);
    }

    macro_rules! scalar_round_trip {
        ($($name:ident: $ty:ty),* $(,)?) => {
            proptest! {
                $(
                    #[test]
                    fn $name(value in any::<$ty>()) {
                        let mut writer = ByteStream::new(&[]);
                        writer.put(&value, DEFAULT_STREAM);
                        let out = writer.into_out();
                        let mut reader = ByteStream::new(&out);
                        let decoded: $ty = reader.get(DEFAULT_STREAM).unwrap();
                        prop_assert_eq!(decoded.to_ne_bytes(), value.to_ne_bytes());
                        prop_assert_eq!(reader.left(), 0);
                    }
                )*
            }
        };
    }

    scalar_round_trip!(
        round_trip_u8: u8,
        round_trip_u16: u16,
        round_trip_u32: u32,
        round_trip_u64: u64,
        round_trip_u128: u128,
        round_trip_usize: usize,
        round_trip_i8: i8,
        round_trip_i16: i16,
        round_trip_i32: i32,
        round_trip_i64: i64,
        round_trip_i128: i128,
        round_trip_isize: isize,
        round_trip_f32: f32,
        round_trip_f64: f64,
    );

    proptest! {
        #[test]
        fn clamped_length_stays_in_bounds(
            declared in 0u32..64,
            min in 0usize..32,
            extra in 0usize..32,
            unbounded in any::<bool>(),
        ) {
            let max = if unbounded { 0 } else { min + extra };
            let mut data = declared.to_ne_bytes().to_vec();
            data.extend(std::iter::repeat_n(0xA5u8, 96));
            let mut ds = ByteStream::new(&data);

            let before = ds.left();
            let got = ds.get_record(min, max, DEFAULT_STREAM).unwrap();
            prop_assert!(got.len() >= min);
            if max > 0 {
                prop_assert!(got.len() <= max);
            } else {
                prop_assert_eq!(got.len(), (declared as usize).max(min));
            }
            prop_assert_eq!(before - ds.left(), LENGTH_FIELD_WIDTH + got.len());
            prop_assert_eq!(ds.offset() + ds.left(), ds.len());
        }

        #[test]
        fn arbitrary_input_never_panics(
            data in proptest::collection::vec(any::<u8>(), 0..128),
            reads in proptest::collection::vec((0usize..16, 0usize..16), 1..16),
        ) {
            let mut ds = ByteStream::new(&data);
            for (min, max) in reads {
                let before = ds.left();
                match ds.get_record(min, max, DEFAULT_STREAM) {
                    Ok(got) => prop_assert_eq!(before - ds.left(), LENGTH_FIELD_WIDTH + got.len()),
                    Err(err) => prop_assert!(err.is_out_of_data()),
                }
                prop_assert!(ds.left() <= before);
                prop_assert_eq!(ds.offset() + ds.left(), data.len());
            }
        }
    }
}
