//! `bulkdl cancel <id>` – drop a persisted job and its tasks.
//!
//! This edits the store directly, so it is for jobs whose engine process is
//! not running (a live engine cancels through its own controller and would
//! otherwise re-persist nothing, but its in-flight loop keeps going).

use anyhow::{bail, Result};
use bulkdl_core::store::TaskDb;

pub async fn run_cancel(db: &TaskDb, id: i64) -> Result<()> {
    if db.get_job(id).await?.is_none() {
        bail!("no job with id {id}");
    }
    db.delete_job(id).await?;
    println!("Removed job {id} and its tasks");
    Ok(())
}
