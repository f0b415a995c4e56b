//! Discovery: walk a source's history for one job and enqueue tasks.
//!
//! One pass resolves the reference, enumerates the history (optionally
//! keyword-filtered), expands grouped posts within a bounded id window, and
//! claims each item through the dedup index. Monitor jobs repeat the pass
//! after a cancellable sleep; everyone else hands the queue to the executor
//! once and finishes.

use futures::StreamExt;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::controller::JobRuntime;
use crate::dedup::DedupIndex;
use crate::error::EngineError;
use crate::executor;
use crate::progress::{ProgressBoard, TaskIcon};
use crate::source::{SourceEntity, SourceItem};
use crate::store::TaskKey;

/// Top-level loop for one job. Runs until the job completes, is cancelled,
/// or hits a terminal error. Spawned by the controller.
pub async fn run_job(rt: Arc<JobRuntime>) -> Result<(), EngineError> {
    loop {
        if rt.ctrl.is_cancelled() {
            return Ok(());
        }
        match run_pass(&rt).await {
            Ok(()) => {}
            Err(EngineError::Cancelled) => return Ok(()),
            Err(e @ (EngineError::Resolution(_) | EngineError::Enumeration(_))) => {
                let msg = format!("job #{} failed: {}", rt.job.id, e);
                tracing::warn!(job_id = rt.job.id, "{msg}");
                let _ = rt.sink.notice(rt.job.owner_channel, &msg).await;
                // Monitor jobs retry on the next cycle; one-shot jobs end here.
                if !rt.job.is_monitor {
                    return Err(e);
                }
            }
            Err(e) => {
                let msg = format!("job #{} aborted: {}", rt.job.id, e);
                tracing::error!(job_id = rt.job.id, "{msg}");
                let _ = rt.sink.notice(rt.job.owner_channel, &msg).await;
                return Err(e);
            }
        }
        if !rt.job.is_monitor {
            return Ok(());
        }
        let interval = Duration::from_secs(rt.cfg.monitor_interval_secs);
        if rt.ctrl.sleep_cancellable(interval).await {
            return Ok(());
        }
    }
}

/// One discovery-plus-download pass.
async fn run_pass(rt: &Arc<JobRuntime>) -> Result<(), EngineError> {
    let entity = rt
        .source
        .resolve(&rt.job.source_reference)
        .await
        .map_err(EngineError::Resolution)?;
    let board = rt.board_for(&entity.title).await;

    let dedup = DedupIndex::new(rt.db.clone());
    let mut queue: Vec<i64> = Vec::new();
    let mut seen_groups: HashSet<i64> = HashSet::new();
    let filter = (rt.job.filter_tag != "all").then_some(rt.job.filter_tag.as_str());

    let mut stream = rt.source.enumerate(&entity, filter);
    while let Some(item) = stream.next().await {
        if rt.ctrl.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let item = item.map_err(EngineError::Enumeration)?;
        if item.media.is_none() {
            continue;
        }

        if let Some(group_id) = item.group_id {
            // Expand each group once per pass, scanning the id neighborhood
            // around the anchor for siblings.
            if !seen_groups.insert(group_id) {
                continue;
            }
            let window = rt.cfg.group_window;
            let mut siblings = rt
                .source
                .enumerate_range(&entity, item.id - window, item.id + window);
            while let Some(sibling) = siblings.next().await {
                if rt.ctrl.is_cancelled() {
                    return Err(EngineError::Cancelled);
                }
                let sibling = sibling.map_err(EngineError::Enumeration)?;
                if sibling.group_id == Some(group_id) && sibling.media.is_some() {
                    claim_item(rt, &board, &dedup, &entity, &sibling, &mut queue).await?;
                }
            }
        } else {
            claim_item(rt, &board, &dedup, &entity, &item, &mut queue).await?;
        }
    }
    drop(stream);

    let _ = rt
        .sink
        .notice(
            rt.job.owner_channel,
            &format!(
                "job #{}: discovery finished, {} task(s) queued",
                rt.job.id,
                queue.len()
            ),
        )
        .await;

    if queue.is_empty() {
        return Ok(());
    }
    executor::run_batch(rt, &board, &entity, &queue).await
}

async fn claim_item(
    rt: &Arc<JobRuntime>,
    board: &Arc<ProgressBoard>,
    dedup: &DedupIndex,
    entity: &SourceEntity,
    item: &SourceItem,
    queue: &mut Vec<i64>,
) -> Result<(), EngineError> {
    let key = TaskKey {
        job_id: rt.job.id,
        item_id: item.id,
        location_id: entity.id,
    };
    let claim = dedup
        .claim(key, &entity.title, &rt.job.filter_tag)
        .await?;
    if claim.enqueue() {
        queue.push(item.id);
        board.bump_total(1).await;
        board.report(item.id, TaskIcon::Found, "found", false).await;
    }
    Ok(())
}
