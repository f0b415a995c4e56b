//! Destination layout: `<root>/<source_id>/<sanitized_name>/<filename>`,
//! with in-progress files suffixed `.temp`.

use std::path::{Path, PathBuf};

use super::sanitize::sanitize_component;
use crate::source::{MediaKind, SourceItem};

/// Temporary file suffix used before the atomic rename.
pub const TEMP_SUFFIX: &str = ".temp";

/// Directory for one entity's files: raw stable id, then sanitized title.
pub fn destination_dir(root: &Path, entity_id: i64, title: &str) -> PathBuf {
    root.join(entity_id.to_string()).join(sanitize_component(title))
}

/// Filename for one item: the source filename when present, else the item id
/// with an extension inferred from the media kind.
pub fn destination_filename(item: &SourceItem) -> String {
    let media = item.media.as_ref();
    if let Some(name) = media.and_then(|m| m.file_name.as_deref()) {
        let clean = sanitize_component(name);
        if clean != "unnamed" {
            return ensure_extension(clean, media.map(|m| m.kind));
        }
    }
    ensure_extension(item.id.to_string(), media.map(|m| m.kind))
}

fn ensure_extension(name: String, kind: Option<MediaKind>) -> String {
    if name.contains('.') {
        return name;
    }
    let ext = match kind {
        Some(MediaKind::Video) => "mp4",
        Some(MediaKind::Photo) => "jpg",
        Some(MediaKind::Document) | None => "bin",
    };
    format!("{name}.{ext}")
}

/// Path for the temp file: appends `.temp` to the final path.
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}
