//! Job controller: the public façade.
//!
//! Creates and persists jobs, launches the discovery/execution loop for each,
//! and exposes pause/resume/cancel plus the live-job listing. All collaborators
//! (store, content source, status sink) are held here and passed into
//! components by handle; nothing reads ambient globals.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OnceCell, Semaphore};

use crate::config::EngineConfig;
use crate::control::{BatchControl, JobRegistry};
use crate::error::EngineError;
use crate::progress::{ProgressBoard, StatusSink};
use crate::scrape;
use crate::source::ContentSource;
use crate::store::{JobId, JobRecord, TaskDb};

/// Everything one running job needs, owned for the lifetime of its execution
/// instance. Not shared across processes; after a restart, jobs are rebuilt
/// from the store via [`JobController::reload_jobs`].
pub struct JobRuntime {
    pub job: JobRecord,
    pub db: TaskDb,
    pub source: Arc<dyn ContentSource>,
    pub sink: Arc<dyn StatusSink>,
    pub ctrl: Arc<BatchControl>,
    /// Process-wide transfer permit pool, shared by every job.
    pub permits: Arc<Semaphore>,
    pub cfg: EngineConfig,
    board: OnceCell<Arc<ProgressBoard>>,
}

impl JobRuntime {
    pub fn new(
        job: JobRecord,
        db: TaskDb,
        source: Arc<dyn ContentSource>,
        sink: Arc<dyn StatusSink>,
        ctrl: Arc<BatchControl>,
        permits: Arc<Semaphore>,
        cfg: EngineConfig,
    ) -> Self {
        Self {
            job,
            db,
            source,
            sink,
            ctrl,
            permits,
            cfg,
            board: OnceCell::new(),
        }
    }

    /// The job's progress board, created on first resolve so the title can
    /// carry the entity's name. Later passes reuse the same board.
    pub async fn board_for(&self, entity_title: &str) -> Arc<ProgressBoard> {
        self.board
            .get_or_init(|| async {
                let kind = if self.job.is_monitor { "monitor" } else { "batch" };
                let title = format!("{kind} #{} | {entity_title}", self.job.id);
                Arc::new(ProgressBoard::new(
                    Arc::clone(&self.sink),
                    self.job.owner_channel,
                    title,
                    Duration::from_secs_f64(self.cfg.snapshot_interval_secs),
                    self.cfg.snapshot_lines,
                ))
            })
            .await
            .clone()
    }
}

/// Summary of one live job for the control layer.
#[derive(Debug, Clone)]
pub struct ActiveJob {
    pub job_id: JobId,
    pub paused: bool,
    pub filter_tag: String,
    pub is_monitor: bool,
}

pub struct JobController {
    db: TaskDb,
    source: Arc<dyn ContentSource>,
    sink: Arc<dyn StatusSink>,
    registry: Arc<JobRegistry>,
    permits: Arc<Semaphore>,
    cfg: EngineConfig,
}

impl JobController {
    pub fn new(
        db: TaskDb,
        source: Arc<dyn ContentSource>,
        sink: Arc<dyn StatusSink>,
        cfg: EngineConfig,
    ) -> Self {
        Self {
            db,
            source,
            sink,
            registry: Arc::new(JobRegistry::new()),
            permits: Arc::new(Semaphore::new(cfg.max_concurrent_transfers.max(1))),
            cfg,
        }
    }

    /// Create and persist a job, then launch its discovery/execution loop.
    pub async fn start_job(
        &self,
        source_reference: &str,
        filter_tag: &str,
        is_monitor: bool,
        owner_channel: i64,
    ) -> Result<JobId, EngineError> {
        let tag = if filter_tag.is_empty() { "all" } else { filter_tag };
        let job = self
            .db
            .create_job(source_reference, tag, is_monitor, owner_channel)
            .await?;
        let id = job.id;
        tracing::info!(job_id = id, reference = source_reference, tag, is_monitor, "job created");
        self.launch(job);
        Ok(id)
    }

    /// Re-launch every job persisted in the active-job table. Call once
    /// after process start; jobs already running are left alone.
    pub async fn reload_jobs(&self) -> Result<Vec<JobId>, EngineError> {
        let mut launched = Vec::new();
        for job in self.db.load_jobs().await? {
            if self.registry.get(job.id).is_some() {
                continue;
            }
            launched.push(job.id);
            tracing::info!(job_id = job.id, "resuming persisted job");
            self.launch(job);
        }
        Ok(launched)
    }

    fn launch(&self, job: JobRecord) {
        let ctrl = self.registry.register(job.id);
        let rt = Arc::new(JobRuntime::new(
            job,
            self.db.clone(),
            Arc::clone(&self.source),
            Arc::clone(&self.sink),
            ctrl,
            Arc::clone(&self.permits),
            self.cfg.clone(),
        ));
        let db = self.db.clone();
        let registry = Arc::clone(&self.registry);

        tokio::spawn(async move {
            let job_id = rt.job.id;
            let is_monitor = rt.job.is_monitor;
            match scrape::run_job(Arc::clone(&rt)).await {
                Ok(()) => {
                    // Natural completion, or cancellation (cancel already
                    // removed the job from the store).
                    if !is_monitor && !rt.ctrl.is_cancelled() {
                        if let Err(e) = db.delete_job(job_id).await {
                            tracing::warn!(job_id, "failed to remove completed job: {e}");
                        }
                        tracing::info!(job_id, "job completed");
                    }
                }
                Err(EngineError::Resolution(_)) => {
                    // Already reported to the owner channel. A one-shot job
                    // that cannot resolve its source is over.
                    if let Err(e) = db.delete_job(job_id).await {
                        tracing::warn!(job_id, "failed to remove unresolvable job: {e}");
                    }
                }
                Err(e) => {
                    // Store errors and broken enumeration leave the row in
                    // place; a later reload retries the job.
                    tracing::error!(job_id, "job loop ended: {e}");
                }
            }
            registry.unregister(job_id);
        });
    }

    /// Close the job's gate. In-flight transfers finish quietly; nothing new
    /// starts until `resume`.
    pub fn pause(&self, job_id: JobId) -> Result<(), EngineError> {
        let ctrl = self
            .registry
            .get(job_id)
            .ok_or(EngineError::UnknownJob(job_id))?;
        ctrl.pause();
        tracing::info!(job_id, "job paused");
        Ok(())
    }

    /// Reopen the job's gate.
    pub fn resume(&self, job_id: JobId) -> Result<(), EngineError> {
        let ctrl = self
            .registry
            .get(job_id)
            .ok_or(EngineError::UnknownJob(job_id))?;
        ctrl.resume();
        tracing::info!(job_id, "job resumed");
        Ok(())
    }

    /// Cancel a job: set the one-way flag, open the gate so blocked loops can
    /// observe it, and remove the job from the store.
    pub async fn cancel(&self, job_id: JobId) -> Result<(), EngineError> {
        let ctrl = self
            .registry
            .get(job_id)
            .ok_or(EngineError::UnknownJob(job_id))?;
        ctrl.cancel();
        self.db.delete_job(job_id).await?;
        tracing::info!(job_id, "job cancelled");
        Ok(())
    }

    /// Live jobs with their gate state. Cancelled jobs drop out immediately,
    /// even while their loops are still unwinding.
    pub async fn list_active(&self) -> Result<Vec<ActiveJob>, EngineError> {
        let mut out = Vec::new();
        for job_id in self.registry.active_ids() {
            let Some(ctrl) = self.registry.get(job_id) else {
                continue;
            };
            if ctrl.is_cancelled() {
                continue;
            }
            let Some(job) = self.db.get_job(job_id).await? else {
                continue;
            };
            out.push(ActiveJob {
                job_id,
                paused: ctrl.is_paused(),
                filter_tag: job.filter_tag,
                is_monitor: job.is_monitor,
            });
        }
        Ok(out)
    }
}
