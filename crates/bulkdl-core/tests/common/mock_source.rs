//! In-memory [`ContentSource`] with controllable failures and timing.

use async_trait::async_trait;
use bulkdl_core::source::{
    ContentSource, MediaInfo, MediaKind, ProgressFn, SourceEntity, SourceError, SourceItem,
};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// How `resolve` should fail, if at all.
#[derive(Clone, Copy)]
pub enum ResolveMode {
    Ok,
    NotFound,
    AccessDenied,
}

pub struct MockSource {
    entity: SourceEntity,
    items: Vec<SourceItem>,
    payloads: HashMap<i64, Vec<u8>>,
    fail_ids: HashSet<i64>,
    resolve_mode: ResolveMode,
    enumerate_error: Option<String>,
    transfer_delay: Duration,
    /// Ids passed to `transfer`, in call order.
    pub transfer_log: Mutex<Vec<i64>>,
    pub transfers_done: AtomicUsize,
    /// Transfers in flight right now / high-water mark.
    pub current: AtomicUsize,
    pub max_concurrent: AtomicUsize,
}

impl MockSource {
    pub fn new(entity_id: i64, title: &str) -> Self {
        Self {
            entity: SourceEntity {
                id: entity_id,
                title: title.to_string(),
            },
            items: Vec::new(),
            payloads: HashMap::new(),
            fail_ids: HashSet::new(),
            resolve_mode: ResolveMode::Ok,
            enumerate_error: None,
            transfer_delay: Duration::from_millis(0),
            transfer_log: Mutex::new(Vec::new()),
            transfers_done: AtomicUsize::new(0),
            current: AtomicUsize::new(0),
            max_concurrent: AtomicUsize::new(0),
        }
    }

    pub fn with_item(
        mut self,
        id: i64,
        group_id: Option<i64>,
        kind: MediaKind,
        file_name: Option<&str>,
        payload: &[u8],
    ) -> Self {
        self.items.push(SourceItem {
            id,
            group_id,
            media: Some(MediaInfo {
                kind,
                file_name: file_name.map(str::to_string),
            }),
        });
        self.payloads.insert(id, payload.to_vec());
        self
    }

    /// An item without media; discovery must skip it.
    pub fn with_bare_item(mut self, id: i64) -> Self {
        self.items.push(SourceItem {
            id,
            group_id: None,
            media: None,
        });
        self
    }

    pub fn with_resolve_mode(mut self, mode: ResolveMode) -> Self {
        self.resolve_mode = mode;
        self
    }

    /// Make `enumerate` yield an error after its items, like a connection
    /// dropping mid-scan.
    pub fn with_enumerate_error(mut self, msg: &str) -> Self {
        self.enumerate_error = Some(msg.to_string());
        self
    }

    pub fn with_failing_transfer(mut self, id: i64) -> Self {
        self.fail_ids.insert(id);
        self
    }

    pub fn with_transfer_delay(mut self, delay: Duration) -> Self {
        self.transfer_delay = delay;
        self
    }

    pub fn transfer_count(&self) -> usize {
        self.transfer_log.lock().unwrap().len()
    }

    pub fn transfers_of(&self, id: i64) -> usize {
        self.transfer_log.lock().unwrap().iter().filter(|&&x| x == id).count()
    }

    fn matches(item: &SourceItem, filter: Option<&str>) -> bool {
        match filter {
            None => true,
            Some(f) => item
                .media
                .as_ref()
                .and_then(|m| m.file_name.as_deref())
                .map(|n| n.contains(f))
                .unwrap_or(false),
        }
    }
}

#[async_trait]
impl ContentSource for MockSource {
    async fn resolve(&self, reference: &str) -> Result<SourceEntity, SourceError> {
        match self.resolve_mode {
            ResolveMode::Ok => Ok(self.entity.clone()),
            ResolveMode::NotFound => Err(SourceError::NotFound(reference.to_string())),
            ResolveMode::AccessDenied => Err(SourceError::AccessDenied(reference.to_string())),
        }
    }

    fn enumerate<'a>(
        &'a self,
        _entity: &'a SourceEntity,
        filter: Option<&'a str>,
    ) -> BoxStream<'a, Result<SourceItem, SourceError>> {
        let mut out: Vec<Result<SourceItem, SourceError>> = self
            .items
            .iter()
            .filter(move |i| Self::matches(i, filter))
            .cloned()
            .map(Ok)
            .collect();
        if let Some(msg) = &self.enumerate_error {
            out.push(Err(SourceError::Transfer(msg.clone())));
        }
        futures::stream::iter(out).boxed()
    }

    fn enumerate_range<'a>(
        &'a self,
        _entity: &'a SourceEntity,
        min_id: i64,
        max_id: i64,
    ) -> BoxStream<'a, Result<SourceItem, SourceError>> {
        futures::stream::iter(
            self.items
                .iter()
                .filter(move |i| i.id >= min_id && i.id <= max_id)
                .cloned()
                .map(Ok)
                .collect::<Vec<_>>(),
        )
        .boxed()
    }

    async fn fetch_item(
        &self,
        _entity: &SourceEntity,
        item_id: i64,
    ) -> Result<Option<SourceItem>, SourceError> {
        Ok(self.items.iter().find(|i| i.id == item_id).cloned())
    }

    async fn transfer(
        &self,
        _entity: &SourceEntity,
        item: &SourceItem,
        dest: &Path,
        progress: ProgressFn<'_>,
    ) -> Result<(), SourceError> {
        self.transfer_log.lock().unwrap().push(item.id);
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now, Ordering::SeqCst);

        let res = self.do_transfer(item, dest, progress).await;

        self.current.fetch_sub(1, Ordering::SeqCst);
        if res.is_ok() {
            self.transfers_done.fetch_add(1, Ordering::SeqCst);
        }
        res
    }
}

impl MockSource {
    async fn do_transfer(
        &self,
        item: &SourceItem,
        dest: &Path,
        progress: ProgressFn<'_>,
    ) -> Result<(), SourceError> {
        let payload = self.payloads.get(&item.id).cloned().unwrap_or_default();
        let total = payload.len() as u64;
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| SourceError::Transfer(e.to_string()))?;

        if self.fail_ids.contains(&item.id) {
            // Leave a partial temp file behind, like a dropped connection.
            let half = payload.len() / 2;
            file.write_all(&payload[..half])
                .await
                .map_err(|e| SourceError::Transfer(e.to_string()))?;
            return Err(SourceError::Transfer("mock transfer failure".to_string()));
        }

        let mut written = 0u64;
        for chunk in payload.chunks(256.max(payload.len() / 4).max(1)) {
            if !self.transfer_delay.is_zero() {
                tokio::time::sleep(self.transfer_delay).await;
            }
            file.write_all(chunk)
                .await
                .map_err(|e| SourceError::Transfer(e.to_string()))?;
            written += chunk.len() as u64;
            if let ControlFlow::Break(()) = progress(written, Some(total)) {
                return Err(SourceError::Aborted);
            }
        }
        if payload.is_empty() {
            if let ControlFlow::Break(()) = progress(0, Some(0)) {
                return Err(SourceError::Aborted);
            }
        }
        file.flush()
            .await
            .map_err(|e| SourceError::Transfer(e.to_string()))?;
        Ok(())
    }
}
