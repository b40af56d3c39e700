//! Descriptors for previewable bitstreams and their owning items.

use std::fmt;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::kind::ContentKind;

/// Opaque bitstream identifier (a UUID in most repositories).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BitstreamId(pub CompactString);

impl BitstreamId {
    /// Create a new BitstreamId.
    pub fn new(id: impl Into<CompactString>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BitstreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named byte payload that may be previewed.
///
/// Only the declared metadata lives here; content is read through a stream
/// the caller opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bitstream {
    /// Unique identifier.
    pub id: BitstreamId,

    /// Declared filename, if any.
    pub name: Option<CompactString>,

    /// Declared MIME type.
    pub mime_type: CompactString,

    /// Position of the bitstream within its item.
    pub sequence_id: i32,
}

impl Bitstream {
    /// Create a new bitstream descriptor.
    pub fn new(
        id: impl Into<CompactString>,
        name: Option<&str>,
        mime_type: impl Into<CompactString>,
        sequence_id: i32,
    ) -> Self {
        Self {
            id: BitstreamId::new(id),
            name: name.map(CompactString::from),
            mime_type: mime_type.into(),
            sequence_id,
        }
    }

    /// Content kind decided from the declared MIME type.
    pub fn kind(&self) -> ContentKind {
        ContentKind::from_mime(&self.mime_type)
    }

    /// Declared filename, or an empty string.
    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// The item a bitstream belongs to, as far as URL composition cares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    /// Internal item identifier.
    pub id: CompactString,

    /// Persistent handle, when one has been minted.
    pub handle: Option<CompactString>,
}

impl ItemRef {
    /// Create an item reference without a handle.
    pub fn new(id: impl Into<CompactString>) -> Self {
        Self {
            id: id.into(),
            handle: None,
        }
    }

    /// Attach a handle.
    pub fn with_handle(mut self, handle: impl Into<CompactString>) -> Self {
        self.handle = Some(handle.into());
        self
    }
}
