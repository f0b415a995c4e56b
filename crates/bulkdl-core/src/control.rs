//! Per-job pause/cancel control.
//!
//! Each running job gets a [`BatchControl`]: a gate that is open (proceed) or
//! closed (paused), and a one-way cancel flag. The scraper and executor block
//! on the gate before each unit of work and check the cancel flag at every
//! loop step. Cancel opens the gate so loops blocked on it observe the flag
//! and exit instead of deadlocking on a closed gate.
//!
//! The [`JobRegistry`] maps live job ids to their control blocks; control
//! calls from the controller go through it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;

use crate::store::JobId;

/// Runtime control block for one active job. Not persisted; discarded when
/// the job finishes, is cancelled, or the process restarts.
pub struct BatchControl {
    gate: watch::Sender<bool>,
    cancel: watch::Sender<bool>,
}

impl Default for BatchControl {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchControl {
    /// New control block: gate open, not cancelled.
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        let (cancel, _) = watch::channel(false);
        Self { gate, cancel }
    }

    /// Close the gate. In-flight transfers keep running but stop reporting;
    /// nothing new starts until `resume`.
    ///
    /// `send_replace` rather than `send`: the flags must stick even when no
    /// task is currently subscribed to the channel.
    pub fn pause(&self) {
        self.gate.send_replace(false);
    }

    /// Reopen the gate.
    pub fn resume(&self) {
        self.gate.send_replace(true);
    }

    /// Set the cancel flag (one-way) and open the gate so blocked waiters
    /// wake up and observe it.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
        self.gate.send_replace(true);
    }

    pub fn is_paused(&self) -> bool {
        !*self.gate.borrow()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Wait until the gate is open. Returns immediately once cancelled;
    /// callers must check `is_cancelled` afterwards.
    pub async fn wait_gate(&self) {
        let mut rx = self.gate.subscribe();
        loop {
            if *rx.borrow() || self.is_cancelled() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Sleep for `dur`, waking early on cancel. Returns true if the job was
    /// cancelled (before or during the sleep).
    pub async fn sleep_cancellable(&self, dur: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }
        let mut rx = self.cancel.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(dur) => self.is_cancelled(),
            _ = rx.changed() => true,
        }
    }
}

/// Shared registry of job id -> control block. The controller registers a
/// job when it starts executing and unregisters it when its task exits.
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Arc<BatchControl>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running job; returns the control block to pass into the
    /// scraper and executor.
    pub fn register(&self, job_id: JobId) -> Arc<BatchControl> {
        let ctrl = Arc::new(BatchControl::new());
        self.jobs.write().unwrap().insert(job_id, Arc::clone(&ctrl));
        ctrl
    }

    /// Unregister a job (call when its task exits, success or failure).
    pub fn unregister(&self, job_id: JobId) {
        self.jobs.write().unwrap().remove(&job_id);
    }

    pub fn get(&self, job_id: JobId) -> Option<Arc<BatchControl>> {
        self.jobs.read().unwrap().get(&job_id).cloned()
    }

    /// Ids of all registered jobs, ascending.
    pub fn active_ids(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self.jobs.read().unwrap().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
