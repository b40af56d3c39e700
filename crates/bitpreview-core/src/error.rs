//! Error types for preview generation and persistence.

use compact_str::CompactString;
use thiserror::Error;

use crate::bitstream::BitstreamId;

/// Errors surfaced to callers of the preview service.
///
/// Extraction failures are deliberately absent: a broken archive degrades to
/// an empty preview and never reaches the caller.
#[derive(Debug, Error)]
pub enum PreviewError {
    /// Declared plain text, but the filename carries an archive extension.
    #[error("Bitstream '{name}' is declared as {mime} but has an archive extension")]
    Validation {
        name: CompactString,
        mime: CompactString,
    },

    /// The backing store failed.
    #[error(transparent)]
    Persistence(#[from] StoreError),

    /// Administrative action attempted without administrator rights.
    #[error("Administrator rights required to delete previews of bitstream {bitstream}")]
    Forbidden { bitstream: BitstreamId },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl PreviewError {
    /// Create a validation error for a mislabelled bitstream.
    pub fn validation(name: impl Into<CompactString>, mime: impl Into<CompactString>) -> Self {
        Self::Validation {
            name: name.into(),
            mime: mime.into(),
        }
    }

    /// Whether this error signals a broken backing store.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

/// Failure reported by a preview store backend.
#[derive(Debug, Error)]
#[error("Preview store error: {message}")]
pub struct StoreError {
    /// Human-readable message.
    pub message: String,
    /// Underlying backend error, if any.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreError {
    /// Create a store error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create a store error wrapping a backend error.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
