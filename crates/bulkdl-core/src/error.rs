//! Engine error taxonomy.
//!
//! The split matters for propagation: a `Transfer` error is local to one task
//! and the batch continues; `Resolution` ends the job's current pass; `Store`
//! aborts the job's active loop; `Cancelled` is a deliberate stop and is never
//! reported as a failure.

use thiserror::Error;

use crate::source::SourceError;
use crate::store::JobId;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The source reference could not be resolved (not found, access denied).
    /// Terminal for the current pass; monitor jobs retry on the next cycle.
    #[error("resolution failed: {0}")]
    Resolution(#[source] SourceError),

    /// History enumeration broke mid-pass (backend or network trouble).
    /// Terminal for the current pass; monitor jobs retry on the next cycle,
    /// and one-shot jobs keep their row so a reload can retry.
    #[error("enumeration failed: {0}")]
    Enumeration(#[source] SourceError),

    /// A transfer failed for one task. The task stays pending and is eligible
    /// for retry on a later pass.
    #[error("transfer failed: {0}")]
    Transfer(#[source] SourceError),

    /// Local filesystem failure (destination dirs, rename).
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    /// The job was cancelled. Distinguished from `Transfer` so a deliberate
    /// stop never shows up as an error line.
    #[error("job cancelled")]
    Cancelled,

    /// Persistence failure. Aborts the job's active loop; the job stays in
    /// the active-job table for manual retry.
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    /// A control call named a job id that is not currently running.
    #[error("no active job #{0}")]
    UnknownJob(JobId),
}

impl EngineError {
    /// True for the cancellation signal (a stop, not a failure).
    pub fn is_cancel(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }
}
