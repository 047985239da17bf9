use crate::byte_stream::ByteStream;
use crate::datasource::Datasource;
use crate::error::DatasourceError;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, warn};

/// How one run of a harness over one input ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// The harness returned normally.
    Completed,
    /// The harness gave up on the input with a datasource error. This is a
    /// property of the input, not a defect in the code under test.
    Rejected(DatasourceError),
    /// The harness panicked.
    Crash(String),
}

/// The outcome of a run together with what the harness recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub status: ExecutionStatus,
    /// The harness's output accumulator, replayable as a new input.
    pub output: Vec<u8>,
    /// Input bytes the harness left unconsumed.
    pub left: usize,
}

impl Execution {
    pub fn is_crash(&self) -> bool {
        matches!(self.status, ExecutionStatus::Crash(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.status, ExecutionStatus::Rejected(_))
    }
}

/// Runs a harness in-process over a [`ByteStream`] built from each input.
///
/// The harness derives whatever it needs from the stream with `?`; any
/// [`DatasourceError`] it returns ends the run as [`ExecutionStatus::Rejected`].
/// Panics are caught and reported as [`ExecutionStatus::Crash`].
pub struct InProcessExecutor<F>
where
    F: FnMut(&mut ByteStream<'_>) -> Result<(), DatasourceError>,
{
    harness_fn: F,
}

impl<F> InProcessExecutor<F>
where
    F: FnMut(&mut ByteStream<'_>) -> Result<(), DatasourceError>,
{
    pub fn new(harness_fn: F) -> Self {
        Self { harness_fn }
    }

    pub fn execute(&mut self, input: &[u8]) -> Execution {
        let mut stream = ByteStream::new(input);
        let harness = &mut self.harness_fn;
        let result = catch_unwind(AssertUnwindSafe(|| harness(&mut stream)));

        let status = match result {
            Ok(Ok(())) => ExecutionStatus::Completed,
            Ok(Err(err)) => {
                debug!(error = %err, consumed = stream.offset(), "input rejected");
                ExecutionStatus::Rejected(err)
            }
            Err(panic_payload) => {
                let msg = if let Some(s) = panic_payload.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_payload.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic type".to_string()
                };
                warn!(message = %msg, input_len = input.len(), "harness panicked");
                ExecutionStatus::Crash(msg)
            }
        };

        Execution {
            status,
            left: stream.left(),
            output: stream.into_out(),
        }
    }

    /// Runs the harness again with a previous run's output as its input.
    pub fn replay(&mut self, previous: &Execution) -> Execution {
        self.execute(&previous.output)
    }
}
