//! Types used by the job store.

/// Job identifier. Monotonically increasing per store; never reused while
/// the store lives.
pub type JobId = i64;

/// Dedup key for one retrieval task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskKey {
    pub job_id: JobId,
    /// Item id within the source location (message id).
    pub item_id: i64,
    /// Id of the source location the item lives in (chat/channel id).
    pub location_id: i64,
}

/// Task completion status, stored as an integer (0 pending, 1 done).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Done,
}

impl TaskStatus {
    pub fn as_int(self) -> i64 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::Done => 1,
        }
    }

    pub fn from_int(v: i64) -> Self {
        if v == 0 {
            TaskStatus::Pending
        } else {
            TaskStatus::Done
        }
    }
}

/// Result of an insert-if-absent task claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The row was newly created; this is the first time the key was seen.
    New,
    /// The row already existed and is still pending (e.g. a failed transfer
    /// from a previous run). Eligible for retry.
    Pending,
    /// The row already existed and is marked done; must not be re-enqueued.
    Done,
}

/// One user-initiated retrieval job, as persisted in `active_jobs`.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: JobId,
    /// Opaque locator (link/id/username) for the source to scrape.
    pub source_reference: String,
    /// Keyword filter, or the sentinel "all".
    pub filter_tag: String,
    /// Monitor jobs re-scrape periodically forever instead of completing once.
    pub is_monitor: bool,
    /// Channel where progress and control messages are delivered.
    pub owner_channel: i64,
}

/// One persisted task row.
#[derive(Debug, Clone)]
pub struct TaskRow {
    pub key: TaskKey,
    pub display_name: String,
    pub filter_tag: String,
    pub status: TaskStatus,
}

/// Per-job task totals for status display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub total: u64,
    pub done: u64,
}
