//! Progress aggregation: per-task status lines coalesced into a throttled
//! snapshot.
//!
//! Every task event updates the in-memory board; an outbound snapshot is
//! only emitted when forced (terminal outcomes) or when the configured
//! interval has elapsed since the last one. All state sits behind one async
//! mutex so concurrent reports never interleave two snapshot edits.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Outbound seam for rendered snapshots. An implementation creates or edits
/// a single status message in the owner channel.
#[async_trait]
pub trait StatusSink: Send + Sync {
    /// Publish `text` as the job's status snapshot, replacing the previous
    /// one.
    async fn publish(&self, channel: i64, text: &str) -> anyhow::Result<()>;

    /// One-off notice (job-level errors, pass summaries).
    async fn notice(&self, channel: i64, text: &str) -> anyhow::Result<()>;
}

/// Status marker for one task line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskIcon {
    /// Discovered, queued.
    Found,
    /// Transfer in progress.
    Active,
    /// Transferred and finalized.
    Done,
    /// Final path already existed; nothing to do.
    Present,
    /// Transfer failed; still pending in the store.
    Failed,
}

impl TaskIcon {
    fn marker(self) -> &'static str {
        match self {
            TaskIcon::Found => " +",
            TaskIcon::Active => " >",
            TaskIcon::Done => "ok",
            TaskIcon::Present => "==",
            TaskIcon::Failed => "!!",
        }
    }
}

#[derive(Default)]
struct BoardState {
    lines: HashMap<i64, String>,
    order: Vec<i64>,
    total: u64,
    done: u64,
    failed: u64,
    last_emit: Option<Instant>,
}

/// Per-job aggregation of task lines and running totals.
pub struct ProgressBoard {
    sink: Arc<dyn StatusSink>,
    channel: i64,
    title: String,
    interval: Duration,
    display_lines: usize,
    inner: Mutex<BoardState>,
}

impl ProgressBoard {
    pub fn new(
        sink: Arc<dyn StatusSink>,
        channel: i64,
        title: String,
        interval: Duration,
        display_lines: usize,
    ) -> Self {
        Self {
            sink,
            channel,
            title,
            interval,
            display_lines: display_lines.max(1),
            inner: Mutex::new(BoardState::default()),
        }
    }

    /// Record a task's latest status line and maybe emit a snapshot. With
    /// `force` the throttle is bypassed (always do this for terminal
    /// outcomes); otherwise emission is skipped until the interval elapses.
    pub async fn report(&self, task_id: i64, icon: TaskIcon, detail: &str, force: bool) {
        let mut state = self.inner.lock().await;
        if !state.lines.contains_key(&task_id) {
            state.order.push(task_id);
        }
        state
            .lines
            .insert(task_id, format!("{} #{} {}", icon.marker(), task_id, detail));

        let due = match state.last_emit {
            Some(t) => t.elapsed() >= self.interval,
            None => true,
        };
        if !(force || due) {
            return;
        }
        state.last_emit = Some(Instant::now());
        let text = render(&self.title, &state, self.display_lines);
        // Emit while holding the lock so snapshots never interleave.
        if let Err(e) = self.sink.publish(self.channel, &text).await {
            tracing::warn!(channel = self.channel, "snapshot publish failed: {e:#}");
        }
    }

    /// Add newly discovered tasks to the running total.
    pub async fn bump_total(&self, n: u64) {
        self.inner.lock().await.total += n;
    }

    pub async fn bump_done(&self) {
        self.inner.lock().await.done += 1;
    }

    pub async fn bump_failed(&self) {
        self.inner.lock().await.failed += 1;
    }

    /// Running `(total, done, failed)` tally.
    pub async fn tally(&self) -> (u64, u64, u64) {
        let state = self.inner.lock().await;
        (state.total, state.done, state.failed)
    }
}

fn render(title: &str, state: &BoardState, display_lines: usize) -> String {
    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    out.push_str(&format!(
        "{}/{} done, {} failed\n",
        state.done, state.total, state.failed
    ));
    let shown = state.order.len().min(display_lines);
    for id in &state.order[state.order.len() - shown..] {
        if let Some(line) = state.lines.get(id) {
            out.push_str(line);
            out.push('\n');
        }
    }
    if state.order.len() > display_lines {
        out.push_str(&format!("(+{} more)\n", state.order.len() - display_lines));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingSink {
        published: StdMutex<Vec<String>>,
        notices: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl StatusSink for RecordingSink {
        async fn publish(&self, _channel: i64, text: &str) -> anyhow::Result<()> {
            self.published.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn notice(&self, _channel: i64, text: &str) -> anyhow::Result<()> {
            self.notices.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn board(sink: Arc<RecordingSink>, interval: Duration, lines: usize) -> ProgressBoard {
        // No "#<id>" in the title so line assertions never match it.
        ProgressBoard::new(sink, 1, "batch | test".to_string(), interval, lines)
    }

    #[tokio::test]
    async fn first_report_emits_then_throttles() {
        let sink = Arc::new(RecordingSink::default());
        let b = board(Arc::clone(&sink), Duration::from_secs(60), 8);
        b.report(1, TaskIcon::Found, "found", false).await;
        b.report(2, TaskIcon::Found, "found", false).await;
        b.report(3, TaskIcon::Found, "found", false).await;
        // Only the first report got through the throttle.
        assert_eq!(sink.published.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn forced_report_bypasses_throttle() {
        let sink = Arc::new(RecordingSink::default());
        let b = board(Arc::clone(&sink), Duration::from_secs(60), 8);
        b.report(1, TaskIcon::Found, "found", false).await;
        b.report(1, TaskIcon::Done, "done", true).await;
        b.report(2, TaskIcon::Failed, "failed", true).await;
        assert_eq!(sink.published.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn buffered_lines_appear_in_next_snapshot() {
        let sink = Arc::new(RecordingSink::default());
        let b = board(Arc::clone(&sink), Duration::from_secs(60), 8);
        b.report(1, TaskIcon::Found, "found", false).await;
        b.report(2, TaskIcon::Found, "found", false).await; // buffered
        b.report(2, TaskIcon::Done, "done", true).await;
        let last = sink.published.lock().unwrap().last().unwrap().clone();
        assert!(last.contains("#1 found"));
        assert!(last.contains("ok #2 done"));
    }

    #[tokio::test]
    async fn snapshot_windows_to_most_recent_lines() {
        let sink = Arc::new(RecordingSink::default());
        let b = board(Arc::clone(&sink), Duration::from_millis(0), 3);
        for id in 1..=5 {
            b.bump_total(1).await;
            b.report(id, TaskIcon::Found, "found", false).await;
        }
        b.report(5, TaskIcon::Done, "done", true).await;
        let last = sink.published.lock().unwrap().last().unwrap().clone();
        assert!(!last.contains("#1 "));
        assert!(!last.contains("#2 "));
        assert!(last.contains("#3 "));
        assert!(last.contains("#4 "));
        assert!(last.contains("ok #5 done"));
        assert!(last.contains("(+2 more)"));
    }

    #[tokio::test]
    async fn tally_shows_in_header() {
        let sink = Arc::new(RecordingSink::default());
        let b = board(Arc::clone(&sink), Duration::from_millis(0), 8);
        b.bump_total(3).await;
        b.bump_done().await;
        b.report(1, TaskIcon::Done, "done", true).await;
        let last = sink.published.lock().unwrap().last().unwrap().clone();
        assert!(last.contains("1/3 done, 0 failed"));
    }
}
