use crate::executor::ExecutionStatus;

/// Default severity level for crashes detected by `CrashOracle`.
const DEFAULT_CRASH_SEVERITY: u8 = 10;

/// A finding worth keeping: the input, why it matters, and a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashReport {
    pub input: Vec<u8>,
    pub description: String,
    /// MD5 hex digest of the input, for deduplication.
    pub input_hash: String,
    pub severity: u8,
}

/// Decides whether an execution outcome is a bug.
pub trait Oracle {
    fn examine(&self, input: &[u8], status: &ExecutionStatus) -> Option<CrashReport>;
}

/// Reports panics. Rejected inputs are the datasource protocol working as
/// intended and are never reported.
#[derive(Debug, Default)]
pub struct CrashOracle;

impl CrashOracle {
    pub fn new() -> Self {
        CrashOracle
    }
}

impl Oracle for CrashOracle {
    fn examine(&self, input: &[u8], status: &ExecutionStatus) -> Option<CrashReport> {
        match status {
            ExecutionStatus::Crash(description) => Some(CrashReport {
                input: input.to_vec(),
                description: description.clone(),
                input_hash: format!("{:x}", md5::compute(input)),
                severity: DEFAULT_CRASH_SEVERITY,
            }),
            ExecutionStatus::Completed | ExecutionStatus::Rejected(_) => None,
        }
    }
}
