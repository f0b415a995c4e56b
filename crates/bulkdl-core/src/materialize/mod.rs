//! Atomic materialization of one task's content.
//!
//! Transfers go to `<final_path>.temp` and are renamed into place only on
//! success, so the final name is never observed half-written. A final path
//! that already exists is the restart-safety short circuit: the task is
//! marked done without invoking the transfer primitive at all.

pub mod path;
pub mod sanitize;

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::controller::JobRuntime;
use crate::error::EngineError;
use crate::progress::{ProgressBoard, TaskIcon};
use crate::source::{SourceEntity, SourceError};
use crate::store::TaskKey;

/// What happened to one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Transferred and renamed into place.
    Transferred,
    /// Final path already existed; marked done without a transfer.
    AlreadyPresent,
    /// Item vanished or carries no media; nothing to do.
    Skipped,
    /// Transfer failed; the task stays pending and any `.temp` file is left
    /// behind (ignored until a later attempt overwrites it).
    Failed,
    /// Stopped deliberately by cancellation.
    Cancelled,
}

fn short_error(e: &SourceError) -> String {
    let s = e.to_string();
    if s.len() <= 40 {
        return s;
    }
    let mut take = 40;
    while take > 0 && !s.is_char_boundary(take) {
        take -= 1;
    }
    format!("{}...", &s[..take])
}

/// Materialize one task. Store errors propagate (they abort the job's loop);
/// everything else is folded into the returned [`Outcome`].
pub async fn materialize_task(
    rt: &JobRuntime,
    board: &ProgressBoard,
    entity: &SourceEntity,
    item_id: i64,
) -> Result<Outcome, EngineError> {
    let key = TaskKey {
        job_id: rt.job.id,
        item_id,
        location_id: entity.id,
    };
    if rt.ctrl.is_cancelled() {
        return Ok(Outcome::Cancelled);
    }

    let item = match rt.source.fetch_item(entity, item_id).await {
        Ok(Some(item)) => item,
        Ok(None) => return Ok(Outcome::Skipped),
        Err(e) => {
            tracing::warn!(job_id = rt.job.id, item_id, "fetch failed: {e}");
            board.bump_failed().await;
            board
                .report(item_id, TaskIcon::Failed, &short_error(&e), true)
                .await;
            return Ok(Outcome::Failed);
        }
    };
    if item.media.is_none() {
        return Ok(Outcome::Skipped);
    }

    let dir = path::destination_dir(&rt.cfg.download_root, entity.id, &entity.title);
    if let Err(e) = tokio::fs::create_dir_all(&dir).await {
        tracing::error!(job_id = rt.job.id, item_id, "create dir failed: {e}");
        board.bump_failed().await;
        board
            .report(item_id, TaskIcon::Failed, "destination unavailable", true)
            .await;
        return Ok(Outcome::Failed);
    }
    let final_path = dir.join(path::destination_filename(&item));

    // Restart safety: completion is judged by the final path's existence.
    if final_path.exists() {
        rt.db.mark_task_done(key).await?;
        board.bump_done().await;
        board
            .report(item_id, TaskIcon::Present, "already present", true)
            .await;
        return Ok(Outcome::AlreadyPresent);
    }

    board
        .report(item_id, TaskIcon::Active, "downloading", false)
        .await;

    let temp = path::temp_path(&final_path);
    let bytes = Arc::new(AtomicU64::new(0));
    let cb_bytes = Arc::clone(&bytes);
    let cb_ctrl = Arc::clone(&rt.ctrl);
    let progress = move |done: u64, _total: Option<u64>| {
        cb_bytes.store(done, Ordering::Relaxed);
        if cb_ctrl.is_cancelled() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    };

    // While the transfer runs, report its byte count once a second unless
    // the gate is closed (paused jobs keep transferring but stay quiet).
    let report_loop = async {
        let mut tick = tokio::time::interval(Duration::from_secs(1));
        tick.tick().await;
        loop {
            tick.tick().await;
            if !rt.ctrl.is_paused() && !rt.ctrl.is_cancelled() {
                let mb = bytes.load(Ordering::Relaxed) as f64 / (1024.0 * 1024.0);
                board
                    .report(item_id, TaskIcon::Active, &format!("{mb:.1} MB"), false)
                    .await;
            }
        }
    };
    let res = tokio::select! {
        res = rt.source.transfer(entity, &item, &temp, &progress) => res,
        _ = report_loop => unreachable!("report loop never completes"),
    };

    match res {
        Ok(()) => {
            if let Err(e) = tokio::fs::rename(&temp, &final_path).await {
                tracing::error!(job_id = rt.job.id, item_id, "finalize rename failed: {e}");
                board.bump_failed().await;
                board
                    .report(item_id, TaskIcon::Failed, "finalize failed", true)
                    .await;
                return Ok(Outcome::Failed);
            }
            // Only after the rename is the task durably done.
            rt.db.mark_task_done(key).await?;
            board.bump_done().await;
            if !rt.ctrl.is_cancelled() {
                board.report(item_id, TaskIcon::Done, "done", true).await;
            }
            Ok(Outcome::Transferred)
        }
        Err(SourceError::Aborted) => Ok(Outcome::Cancelled),
        Err(e) => {
            tracing::warn!(job_id = rt.job.id, item_id, "transfer failed: {e}");
            board.bump_failed().await;
            if !rt.ctrl.is_cancelled() {
                board
                    .report(item_id, TaskIcon::Failed, &short_error(&e), true)
                    .await;
            }
            Ok(Outcome::Failed)
        }
    }
}
