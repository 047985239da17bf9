use thiserror::Error;

/// Errors raised while deriving values from a datasource.
///
/// Both variants mean "this input cannot drive the current decode sequence".
/// A fuzz entry point should treat either one as a rejected input, never as a
/// defect in the code under test.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatasourceError {
    /// The backing resource could not supply a length field or the payload it
    /// announced (after clamping).
    #[error("Out of data: needed {needed} bytes, {left} left")]
    OutOfData { needed: usize, left: usize },

    /// A consumer built a structured value from raw bytes and found it
    /// internally inconsistent. The datasource primitives never raise this.
    #[error("Deserialization failure: {0}")]
    DeserializationFailure(String),
}

impl DatasourceError {
    pub fn deserialization(reason: impl Into<String>) -> Self {
        DatasourceError::DeserializationFailure(reason.into())
    }

    pub fn is_out_of_data(&self) -> bool {
        matches!(self, DatasourceError::OutOfData { .. })
    }
}
