//! `bulkdl status` – show every persisted job with its task tallies.

use anyhow::Result;
use bulkdl_core::store::TaskDb;

pub async fn run_status(db: &TaskDb) -> Result<()> {
    let jobs = db.load_jobs().await?;
    if jobs.is_empty() {
        println!("No jobs in database.");
        return Ok(());
    }
    println!(
        "{:<6} {:<8} {:<12} {:<10} {}",
        "ID", "KIND", "FILTER", "DONE", "SOURCE"
    );
    for job in jobs {
        let counts = db.count_tasks(job.id).await?;
        let kind = if job.is_monitor { "monitor" } else { "batch" };
        println!(
            "{:<6} {:<8} {:<12} {:<10} {}",
            job.id,
            kind,
            job.filter_tag,
            format!("{}/{}", counts.done, counts.total),
            job.source_reference
        );
    }
    Ok(())
}
