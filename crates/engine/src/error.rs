use gridnode_types::error::{AdmissionError, ErrorCode, QueueError, StorageError};
use thiserror::Error;

/// Errors that can abort job processing entirely (as opposed to being
/// recorded as a per-workload `Error` transaction, which is not an
/// `EngineError` at all — see §7's propagation policy).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    /// A job ran longer than the configured `job_timeout_secs` (§5, §4.10)
    /// without finishing. The job is left at the head of the queue and will
    /// be retried from the top on the next `peek_block`.
    #[error("job exceeded its {0}s timeout")]
    JobTimedOut(u64),
}

impl ErrorCode for EngineError {
    fn code(&self) -> &'static str {
        match self {
            Self::Storage(e) => e.code(),
            Self::Queue(e) => e.code(),
            Self::JobTimedOut(_) => "ENGINE_JOB_TIMED_OUT",
        }
    }
}

/// Errors returned synchronously to a submitter at admission time (§4.8),
/// before anything is persisted.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Admission(#[from] AdmissionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl ErrorCode for SubmissionError {
    fn code(&self) -> &'static str {
        match self {
            Self::Admission(e) => e.code(),
            Self::Storage(e) => e.code(),
            Self::Queue(e) => e.code(),
        }
    }
}
