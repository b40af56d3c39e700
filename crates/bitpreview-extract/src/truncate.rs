//! Output bounds: text length and listed file count.

use std::borrow::Cow;

use bitpreview_core::{FileRecord, PreviewConfig, TRUNCATION_MARKER};

/// Bounds applied to generated previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruncationPolicy {
    /// Maximum number of individually listed files.
    pub max_leaf_count: usize,
    /// Maximum text length, in characters, marker included.
    pub max_content_length: usize,
}

impl TruncationPolicy {
    /// Create a policy with explicit bounds.
    pub fn new(max_leaf_count: usize, max_content_length: usize) -> Self {
        Self {
            max_leaf_count,
            max_content_length,
        }
    }

    /// Take the bounds from a preview config.
    pub fn from_config(config: &PreviewConfig) -> Self {
        Self::new(config.max_leaf_count, config.max_content_length)
    }

    /// Bound plain-text content; see [`truncate_text`].
    pub fn truncate_content<'a>(&self, text: &'a str) -> Cow<'a, str> {
        truncate_text(text, self.max_content_length)
    }

    /// Bound the number of listed files; see [`limit_leaves`].
    pub fn limit_leaves(&self, records: impl IntoIterator<Item = FileRecord>) -> Vec<FileRecord> {
        limit_leaves(records, self.max_leaf_count)
    }
}

impl Default for TruncationPolicy {
    fn default() -> Self {
        Self::from_config(&PreviewConfig::default())
    }
}

/// Cap `text` at `max_len` characters.
///
/// Longer text keeps its first `max_len - marker` characters followed by
/// [`TRUNCATION_MARKER`]; the marker is always present on truncated output,
/// even when `max_len` is smaller than the marker itself.
pub fn truncate_text(text: &str, max_len: usize) -> Cow<'_, str> {
    if text.chars().nth(max_len).is_none() {
        return Cow::Borrowed(text);
    }

    let keep = max_len.saturating_sub(TRUNCATION_MARKER.chars().count());
    let cut = text
        .char_indices()
        .nth(keep)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len());

    let mut truncated = String::with_capacity(cut + TRUNCATION_MARKER.len());
    truncated.push_str(&text[..cut]);
    truncated.push_str(TRUNCATION_MARKER);
    tracing::debug!(max_len, kept = keep, "truncated text content");
    Cow::Owned(truncated)
}

/// Cap the number of file records at `max_leaves`.
///
/// Directory records are always kept and do not count. Once the limit is
/// reached further files are dropped and a single
/// [`FileRecord::too_many_files`] sentinel is appended at the end.
pub fn limit_leaves(
    records: impl IntoIterator<Item = FileRecord>,
    max_leaves: usize,
) -> Vec<FileRecord> {
    let mut emitted = Vec::new();
    let mut leaves = 0usize;
    let mut dropped = 0usize;

    for record in records {
        if record.is_directory {
            emitted.push(record);
        } else if leaves < max_leaves {
            leaves += 1;
            emitted.push(record);
        } else {
            dropped += 1;
        }
    }

    if dropped > 0 {
        tracing::debug!(max_leaves, dropped, "file listing truncated");
        emitted.push(FileRecord::too_many_files());
    }
    emitted
}
