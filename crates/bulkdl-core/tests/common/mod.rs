//! Shared test doubles: an in-memory content source and a recording sink.

pub mod mock_source;

use async_trait::async_trait;
use bulkdl_core::progress::StatusSink;
use std::sync::Mutex;
use std::time::Duration;

/// Sink that records everything the engine would send to the owner channel.
#[derive(Default)]
pub struct RecordingSink {
    pub published: Mutex<Vec<String>>,
    pub notices: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn published_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    pub fn last_snapshot(&self) -> Option<String> {
        self.published.lock().unwrap().last().cloned()
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().unwrap().clone()
    }
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

/// Poll `cond` until it holds or the timeout expires; panics on timeout.
pub async fn wait_until<F: Fn() -> bool>(what: &str, cond: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !cond() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for: {what}");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
