//! Task row operations: insert-if-absent claim, idempotent mark-done, counts.

use sqlx::Row;

use super::db::TaskDb;
use super::types::{ClaimOutcome, JobId, TaskCounts, TaskKey, TaskRow, TaskStatus};

impl TaskDb {
    /// Insert a task row if its key is absent. Returns what was found: a new
    /// row, an existing pending row, or an existing done row. Runs in one
    /// transaction so concurrent claims for the same key are serialized.
    pub async fn put_task(
        &self,
        key: TaskKey,
        display_name: &str,
        filter_tag: &str,
    ) -> Result<ClaimOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO tasks
                (job_id, item_id, location_id, display_name, filter_tag, status)
            VALUES (?1, ?2, ?3, ?4, ?5, 0)
            "#,
        )
        .bind(key.job_id)
        .bind(key.item_id)
        .bind(key.location_id)
        .bind(display_name)
        .bind(filter_tag)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let outcome = if inserted > 0 {
            ClaimOutcome::New
        } else {
            let row = sqlx::query(
                r#"
                SELECT status FROM tasks
                WHERE job_id = ?1 AND item_id = ?2 AND location_id = ?3
                "#,
            )
            .bind(key.job_id)
            .bind(key.item_id)
            .bind(key.location_id)
            .fetch_one(&mut *tx)
            .await?;
            let status: i64 = row.get("status");
            match TaskStatus::from_int(status) {
                TaskStatus::Pending => ClaimOutcome::Pending,
                TaskStatus::Done => ClaimOutcome::Done,
            }
        };
        tx.commit().await?;
        Ok(outcome)
    }

    /// Mark a task done. Idempotent: marking an already-done task is a no-op.
    pub async fn mark_task_done(&self, key: TaskKey) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE tasks SET status = 1
            WHERE job_id = ?1 AND item_id = ?2 AND location_id = ?3
            "#,
        )
        .bind(key.job_id)
        .bind(key.item_id)
        .bind(key.location_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Total and done counts for one job.
    pub async fn count_tasks(&self, job_id: JobId) -> Result<TaskCounts, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COALESCE(SUM(status), 0) AS done
            FROM tasks
            WHERE job_id = ?1
            "#,
        )
        .bind(job_id)
        .fetch_one(&self.pool)
        .await?;
        let total: i64 = row.get("total");
        let done: i64 = row.get("done");
        Ok(TaskCounts {
            total: total as u64,
            done: done as u64,
        })
    }

    /// All task rows for one job, ascending by item id.
    pub async fn list_tasks(&self, job_id: JobId) -> Result<Vec<TaskRow>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT job_id, item_id, location_id, display_name, filter_tag, status
            FROM tasks
            WHERE job_id = ?1
            ORDER BY item_id ASC
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let status: i64 = row.get("status");
                TaskRow {
                    key: TaskKey {
                        job_id: row.get("job_id"),
                        item_id: row.get("item_id"),
                        location_id: row.get("location_id"),
                    },
                    display_name: row.get("display_name"),
                    filter_tag: row.get("filter_tag"),
                    status: TaskStatus::from_int(status),
                }
            })
            .collect())
    }
}
