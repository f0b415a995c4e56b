//! Concurrency-bounded execution of discovered tasks.
//!
//! Tasks are submitted in fixed-size groups so the scraper, the permit pool,
//! and a cancel request interleave fairly: cancellation is honored within one
//! group's worth of latency. Inside a group every task runs concurrently,
//! each holding one permit from the process-wide pool.

use std::sync::Arc;
use tokio::task::JoinSet;

use crate::controller::JobRuntime;
use crate::error::EngineError;
use crate::materialize;
use crate::progress::ProgressBoard;
use crate::source::SourceEntity;

/// Execute one batch of discovered item ids for a job.
///
/// Per group: check cancel, block on the job's gate, then run the group
/// under the global permit pool. Each task blocks on the gate again before
/// its transfer starts. Per-task failures never abort the batch; store
/// errors do.
pub async fn run_batch(
    rt: &Arc<JobRuntime>,
    board: &Arc<ProgressBoard>,
    entity: &SourceEntity,
    item_ids: &[i64],
) -> Result<(), EngineError> {
    let group_size = rt.cfg.batch_size.max(1);

    for group in item_ids.chunks(group_size) {
        if rt.ctrl.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        rt.ctrl.wait_gate().await;
        if rt.ctrl.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let mut set = JoinSet::new();
        for &item_id in group {
            let rt = Arc::clone(rt);
            let board = Arc::clone(board);
            let entity = entity.clone();
            set.spawn(async move {
                // A pause can land after the group was submitted, so each
                // task re-checks the gate itself and returns its permit if
                // the gate closed while it was queued on the pool.
                let _permit = loop {
                    rt.ctrl.wait_gate().await;
                    if rt.ctrl.is_cancelled() {
                        return Ok(materialize::Outcome::Cancelled);
                    }
                    let Ok(permit) = rt.permits.clone().acquire_owned().await else {
                        // Pool closed; the process is shutting down.
                        return Ok(materialize::Outcome::Cancelled);
                    };
                    if !rt.ctrl.is_paused() {
                        break permit;
                    }
                    drop(permit);
                };
                materialize::materialize_task(&rt, &board, &entity, item_id).await
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(outcome)) => {
                    tracing::debug!(job_id = rt.job.id, ?outcome, "task finished");
                }
                Ok(Err(e)) => {
                    // Store failure: stop handing out work for this job.
                    set.abort_all();
                    return Err(e);
                }
                Err(join_err) => {
                    tracing::error!(job_id = rt.job.id, "task panicked: {join_err}");
                }
            }
        }
    }

    Ok(())
}
