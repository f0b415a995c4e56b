//! Deduplication index for discovered items.
//!
//! Layered: the store's insert-if-absent `put_task` makes dedup survive
//! restarts, and an in-memory seen-set catches repeats within one discovery
//! pass (a grouped post re-observed from a different anchor must not be
//! queued twice). One index instance is scoped to one pass.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::store::{ClaimOutcome, TaskDb, TaskKey};

/// What a claim decided for one discovered item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// First sighting ever; enqueue.
    New,
    /// Known from a previous run but still pending; enqueue for retry.
    Retry,
    /// Completed in a previous run; skip.
    Done,
    /// Already claimed earlier in this pass; skip.
    Repeat,
}

impl Claim {
    /// True when the item should become a queued task this pass.
    pub fn enqueue(self) -> bool {
        matches!(self, Claim::New | Claim::Retry)
    }
}

pub struct DedupIndex {
    db: TaskDb,
    seen: Mutex<HashSet<TaskKey>>,
}

impl DedupIndex {
    pub fn new(db: TaskDb) -> Self {
        Self {
            db,
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Claim a key. Persists the task row on first sighting.
    pub async fn claim(
        &self,
        key: TaskKey,
        display_name: &str,
        filter_tag: &str,
    ) -> Result<Claim, sqlx::Error> {
        if !self.seen.lock().unwrap().insert(key) {
            return Ok(Claim::Repeat);
        }
        let outcome = self.db.put_task(key, display_name, filter_tag).await?;
        Ok(match outcome {
            ClaimOutcome::New => Claim::New,
            ClaimOutcome::Pending => Claim::Retry,
            ClaimOutcome::Done => Claim::Done,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::db::open_memory;

    fn key(item_id: i64) -> TaskKey {
        TaskKey {
            job_id: 1,
            item_id,
            location_id: -100555,
        }
    }

    #[tokio::test]
    async fn first_claim_is_new_repeat_is_not() {
        let db = open_memory().await.unwrap();
        let index = DedupIndex::new(db);
        assert_eq!(index.claim(key(9), "Chan", "all").await.unwrap(), Claim::New);
        assert_eq!(
            index.claim(key(9), "Chan", "all").await.unwrap(),
            Claim::Repeat
        );
    }

    #[tokio::test]
    async fn done_rows_are_not_reclaimed() {
        let db = open_memory().await.unwrap();
        db.put_task(key(3), "Chan", "all").await.unwrap();
        db.mark_task_done(key(3)).await.unwrap();

        // Fresh pass: the store remembers completion.
        let index = DedupIndex::new(db);
        assert_eq!(
            index.claim(key(3), "Chan", "all").await.unwrap(),
            Claim::Done
        );
    }

    #[tokio::test]
    async fn pending_rows_claim_as_retry() {
        let db = open_memory().await.unwrap();
        db.put_task(key(4), "Chan", "all").await.unwrap();

        let index = DedupIndex::new(db);
        let claim = index.claim(key(4), "Chan", "all").await.unwrap();
        assert_eq!(claim, Claim::Retry);
        assert!(claim.enqueue());
    }
}
