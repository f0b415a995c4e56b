//! `bulkdl tasks <id>` – list the persisted tasks of one job.

use anyhow::Result;
use bulkdl_core::store::{TaskDb, TaskStatus};

pub async fn run_tasks(db: &TaskDb, id: i64) -> Result<()> {
    let rows = db.list_tasks(id).await?;
    if rows.is_empty() {
        println!("No tasks recorded for job {id}.");
        return Ok(());
    }
    println!("{:<12} {:<14} {:<8} {}", "ITEM", "LOCATION", "STATUS", "NAME");
    for row in rows {
        let status = match row.status {
            TaskStatus::Pending => "pending",
            TaskStatus::Done => "done",
        };
        println!(
            "{:<12} {:<14} {:<8} {}",
            row.key.item_id, row.key.location_id, status, row.display_name
        );
    }
    Ok(())
}
