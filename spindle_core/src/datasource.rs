use crate::codec::{Decode, Encode};
use crate::error::DatasourceError;

/// Identifies one logical sub-stream of a datasource.
///
/// Every operation accepts one so that several independent backing buffers can
/// later be multiplexed behind a single datasource. The implementations in this
/// crate read from a single buffer and ignore it; pass [`DEFAULT_STREAM`].
pub type StreamId = u64;

pub const DEFAULT_STREAM: StreamId = 0;

/// A source of fuzzer-controlled values that records what it is told to emit.
///
/// Implementors supply the two primitives, [`get_record`](Self::get_record)
/// and [`put_record`](Self::put_record), plus the two accessors. Every typed
/// operation is built on top of those primitives here, once, so all
/// datasources decode and encode identically.
///
/// Values are read positionally: the meaning of the Nth record is whatever
/// the Nth decode call asks for. Replaying [`out`](Self::out) through a fresh
/// datasource reproduces the same sequence of decoded values, provided the
/// consumer issues the same calls.
pub trait Datasource {
    /// Reads one record whose length is clamped into `[min, max]`.
    ///
    /// A `max` of 0 means "no upper bound". Fails with
    /// [`DatasourceError::OutOfData`] when the resource cannot describe a length
    /// or cannot supply the clamped number of payload bytes.
    fn get_record(
        &mut self,
        min: usize,
        max: usize,
        id: StreamId,
    ) -> Result<Vec<u8>, DatasourceError>;

    /// Appends one length-prefixed record holding `bytes` to the output.
    fn put_record(&mut self, bytes: &[u8], id: StreamId);

    /// Everything written so far, in the record format.
    fn out(&self) -> &[u8];

    /// Bytes still unconsumed in the backing resource.
    fn left(&self) -> usize;

    /// Raw variable-length read with explicit bounds.
    fn get_data(
        &mut self,
        id: StreamId,
        min: usize,
        max: usize,
    ) -> Result<Vec<u8>, DatasourceError> {
        self.get_record(min, max, id)
    }

    fn put_data(&mut self, data: &[u8], id: StreamId) {
        self.put_record(data, id)
    }

    /// Decodes one `T`. See [`Decode`] for the per-type rules.
    fn get<T: Decode>(&mut self, id: StreamId) -> Result<T, DatasourceError>
    where
        Self: Sized,
    {
        T::decode(self, id)
    }

    /// Records `value` so that a replaying reader's [`get`](Self::get) returns it.
    fn put<T: Encode + ?Sized>(&mut self, value: &T, id: StreamId)
    where
        Self: Sized,
    {
        value.encode(self, id)
    }

    /// Decodes `bool` continuation flags, reading one `T` after each `true`.
    ///
    /// The length of the result is decided entirely by the input. A first flag
    /// of `false` yields an empty vector without touching any `T` payload.
    fn get_vector<T: Decode>(&mut self, id: StreamId) -> Result<Vec<T>, DatasourceError>
    where
        Self: Sized,
    {
        let mut items = Vec::new();
        while bool::decode(self, id)? {
            items.push(T::decode(self, id)?);
        }
        Ok(items)
    }

    /// Encodes `items` so that a replaying reader's
    /// [`get_vector`](Self::get_vector) returns them.
    fn put_vector<T: Encode>(&mut self, items: &[T], id: StreamId)
    where
        Self: Sized,
    {
        for item in items {
            true.encode(self, id);
            item.encode(self, id);
        }
        false.encode(self, id);
    }

    /// A branch selector for the caller's own decision logic. Not interpreted.
    fn get_choice(&mut self, id: StreamId) -> Result<u16, DatasourceError> {
        u16::decode(self, id)
    }
}
