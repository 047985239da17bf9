use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_core::{RngCore, SeedableRng};
use tracing::{debug, trace};

use crate::datasource::{Datasource, StreamId};
use crate::error::DatasourceError;
use crate::record::{LENGTH_FIELD_WIDTH, MAX_PAYLOAD_LEN, write_record};

/// Default upper bound for unbounded (`max == 0`) reads.
pub const DEFAULT_MAX_RECORD_LEN: usize = 64;

/// A datasource that invents its records with a random number generator.
///
/// Every record it serves is appended to a transcript in the backing-buffer
/// format, with the length field already set to the clamped length. Feeding
/// the transcript to a [`ByteStream`](crate::byte_stream::ByteStream) and
/// issuing the same decode calls therefore yields the same values, which makes
/// this a seed generator for consumers of the datasource protocol.
///
/// The `budget` plays the role of the backing buffer's size: it is what
/// [`left`](Datasource::left) reports and it is charged exactly as a
/// `ByteStream` would be, length field included.
#[derive(Debug, Clone)]
pub struct RandomSource<R: RngCore> {
    rng: R,
    max_record_len: usize,
    budget: usize,
    transcript: Vec<u8>,
    out: Vec<u8>,
}

impl<R: RngCore> RandomSource<R> {
    pub fn new(rng: R, budget: usize) -> Self {
        Self {
            rng,
            max_record_len: DEFAULT_MAX_RECORD_LEN,
            budget,
            transcript: Vec::new(),
            out: Vec::new(),
        }
    }

    /// Sets the upper bound used when a caller asks for an unbounded record.
    pub fn with_max_record_len(mut self, max_record_len: usize) -> Self {
        self.max_record_len = max_record_len;
        self
    }

    /// The records served so far, replayable as a backing buffer.
    pub fn transcript(&self) -> &[u8] {
        &self.transcript
    }

    pub fn into_transcript(self) -> Vec<u8> {
        self.transcript
    }

    fn pick_len(&mut self, min: usize, max: usize) -> usize {
        let upper = if max == 0 {
            self.max_record_len.max(min)
        } else {
            max
        }
        .min(MAX_PAYLOAD_LEN);
        if min >= upper {
            upper
        } else {
            self.rng.random_range(min..=upper)
        }
    }
}

impl RandomSource<ChaCha8Rng> {
    /// A reproducible source: the same seed and budget serve the same records.
    pub fn from_seed(seed: u64, budget: usize) -> Self {
        Self::new(ChaCha8Rng::seed_from_u64(seed), budget)
    }
}

impl<R: RngCore> Datasource for RandomSource<R> {
    fn get_record(
        &mut self,
        min: usize,
        max: usize,
        _id: StreamId,
    ) -> Result<Vec<u8>, DatasourceError> {
        if self.budget < LENGTH_FIELD_WIDTH {
            debug!(budget = self.budget, "budget exhausted before length field");
            return Err(DatasourceError::OutOfData {
                needed: LENGTH_FIELD_WIDTH,
                left: self.budget,
            });
        }
        self.budget -= LENGTH_FIELD_WIDTH;

        let len = self.pick_len(min, max);
        if self.budget < len {
            debug!(len, budget = self.budget, "budget exhausted before payload");
            return Err(DatasourceError::OutOfData {
                needed: len,
                left: self.budget,
            });
        }
        self.budget -= len;

        let mut payload = vec![0u8; len];
        self.rng.fill_bytes(&mut payload);
        write_record(&mut self.transcript, &payload);
        trace!(len, budget = self.budget, "served random record");
        Ok(payload)
    }

    fn put_record(&mut self, bytes: &[u8], _id: StreamId) {
        write_record(&mut self.out, bytes);
    }

    fn out(&self) -> &[u8] {
        &self.out
    }

    fn left(&self) -> usize {
        self.budget
    }
}
