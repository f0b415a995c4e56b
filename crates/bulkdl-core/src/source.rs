//! Typed boundary to the remote content source.
//!
//! The engine never speaks the backend's wire protocol itself; everything it
//! needs (entity resolution, history enumeration, media transfer) comes
//! through [`ContentSource`]. Enumeration is lazy and not restartable
//! mid-stream: a new call starts over from the newest item.

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::ops::ControlFlow;
use std::path::Path;
use thiserror::Error;

/// Errors surfaced by a content source implementation.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The reference does not name a known entity.
    #[error("not found: {0}")]
    NotFound(String),
    /// The entity exists but is private/inaccessible to this account.
    #[error("access denied: {0}")]
    AccessDenied(String),
    /// Network or backend failure during enumeration or transfer.
    #[error("{0}")]
    Transfer(String),
    /// The progress callback requested a stop. Deliberate, not a failure.
    #[error("transfer aborted")]
    Aborted,
}

/// A resolved content source (channel, group, feed).
#[derive(Debug, Clone)]
pub struct SourceEntity {
    /// Stable backend identifier; becomes the first path component under the
    /// download root.
    pub id: i64,
    /// Human-readable title; sanitized into the second path component.
    pub title: String,
}

/// What kind of media an item carries; drives the fallback file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Photo,
    Document,
}

#[derive(Debug, Clone)]
pub struct MediaInfo {
    pub kind: MediaKind,
    /// Original filename, when the backend carries one.
    pub file_name: Option<String>,
}

/// One item of an entity's history. Items with `media: None` are skipped by
/// discovery.
#[derive(Debug, Clone)]
pub struct SourceItem {
    pub id: i64,
    /// Group identifier for multi-part posts; siblings share the same value.
    pub group_id: Option<i64>,
    pub media: Option<MediaInfo>,
}

/// Progress callback passed into [`ContentSource::transfer`]. Invoked as
/// bytes arrive with `(bytes_done, total_bytes)`. Returning
/// `ControlFlow::Break` asks the source to stop; the transfer then fails
/// with [`SourceError::Aborted`].
pub type ProgressFn<'a> = &'a (dyn Fn(u64, Option<u64>) -> ControlFlow<()> + Send + Sync);

/// The external collaborator providing access to the messaging backend.
///
/// All methods may suspend the calling task; none of them blocks the runtime.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Resolve an opaque reference (link/id/username) to an entity.
    async fn resolve(&self, reference: &str) -> Result<SourceEntity, SourceError>;

    /// Lazily enumerate the entity's history, newest first, optionally
    /// filtered by keyword.
    fn enumerate<'a>(
        &'a self,
        entity: &'a SourceEntity,
        filter: Option<&'a str>,
    ) -> BoxStream<'a, Result<SourceItem, SourceError>>;

    /// Enumerate only items with ids in `[min_id, max_id]`. Used to expand a
    /// grouped post around its anchor item.
    fn enumerate_range<'a>(
        &'a self,
        entity: &'a SourceEntity,
        min_id: i64,
        max_id: i64,
    ) -> BoxStream<'a, Result<SourceItem, SourceError>>;

    /// Fetch a single item by id. `Ok(None)` means the item no longer exists.
    async fn fetch_item(
        &self,
        entity: &SourceEntity,
        item_id: i64,
    ) -> Result<Option<SourceItem>, SourceError>;

    /// Transfer one item's media to `dest`, reporting progress as bytes
    /// arrive. `dest` is the temporary path; the caller owns the atomic
    /// rename to the final name.
    async fn transfer(
        &self,
        entity: &SourceEntity,
        item: &SourceItem,
        dest: &Path,
        progress: ProgressFn<'_>,
    ) -> Result<(), SourceError>;
}
