//! Job row operations: id allocation, upsert, delete, load.

use sqlx::Row;

use super::db::TaskDb;
use super::types::{JobId, JobRecord};

impl TaskDb {
    /// One greater than the maximum existing job id, or 1 if none exist.
    ///
    /// For allocation under concurrency use [`TaskDb::create_job`], which
    /// reads the maximum and inserts inside one transaction.
    pub async fn next_job_id(&self) -> Result<JobId, sqlx::Error> {
        let row = sqlx::query(r#"SELECT COALESCE(MAX(job_id), 0) + 1 AS next FROM active_jobs"#)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("next"))
    }

    /// Allocate the next job id and persist the job in one transaction, so
    /// two concurrent creations never share an id.
    pub async fn create_job(
        &self,
        source_reference: &str,
        filter_tag: &str,
        is_monitor: bool,
        owner_channel: i64,
    ) -> Result<JobRecord, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(r#"SELECT COALESCE(MAX(job_id), 0) + 1 AS next FROM active_jobs"#)
            .fetch_one(&mut *tx)
            .await?;
        let id: JobId = row.get("next");
        sqlx::query(
            r#"
            INSERT INTO active_jobs (job_id, source_reference, filter_tag, is_monitor, owner_channel)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(id)
        .bind(source_reference)
        .bind(filter_tag)
        .bind(is_monitor as i64)
        .bind(owner_channel)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(JobRecord {
            id,
            source_reference: source_reference.to_string(),
            filter_tag: filter_tag.to_string(),
            is_monitor,
            owner_channel,
        })
    }

    /// Upsert a job row with an explicit id (restart/import paths).
    pub async fn put_job(&self, job: &JobRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO active_jobs
                (job_id, source_reference, filter_tag, is_monitor, owner_channel)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(job.id)
        .bind(&job.source_reference)
        .bind(&job.filter_tag)
        .bind(job.is_monitor as i64)
        .bind(job.owner_channel)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Remove a job and clear its task rows. Task rows are never deleted
    /// individually; this is the only place they go away.
    pub async fn delete_job(&self, id: JobId) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(r#"DELETE FROM active_jobs WHERE job_id = ?1"#)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(r#"DELETE FROM tasks WHERE job_id = ?1"#)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_job(&self, id: JobId) -> Result<Option<JobRecord>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT job_id, source_reference, filter_tag, is_monitor, owner_channel
            FROM active_jobs
            WHERE job_id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(record_from_row))
    }

    /// All persisted jobs, ascending by id. Used by the restart/reload path.
    pub async fn load_jobs(&self) -> Result<Vec<JobRecord>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT job_id, source_reference, filter_tag, is_monitor, owner_channel
            FROM active_jobs
            ORDER BY job_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(record_from_row).collect())
    }
}

fn record_from_row(row: sqlx::sqlite::SqliteRow) -> JobRecord {
    let is_monitor: i64 = row.get("is_monitor");
    JobRecord {
        id: row.get("job_id"),
        source_reference: row.get("source_reference"),
        filter_tag: row.get("filter_tag"),
        is_monitor: is_monitor != 0,
        owner_channel: row.get("owner_channel"),
    }
}
