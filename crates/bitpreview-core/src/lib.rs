//! Core types for bitpreview.
//!
//! This crate provides the data structures shared across the bitpreview
//! workspace: preview configuration, the content-kind dispatch tag, flat
//! listing records, and the transient and persisted preview trees.

mod bitstream;
mod config;
mod error;
mod kind;
mod node;
mod record;

pub use bitstream::{Bitstream, BitstreamId, ItemRef};
pub use config::{
    DEFAULT_MAX_CONTENT_LENGTH, DEFAULT_MAX_LEAF_COUNT, PreviewConfig, PreviewConfigBuilder,
    TRUNCATION_MARKER,
};
pub use error::{PreviewError, StoreError};
pub use kind::{ARCHIVE_EXTENSIONS, ArchiveCompression, ContentKind, has_archive_extension};
pub use node::{PreviewChildren, PreviewNode, PreviewNodeId, ViewChildren, ViewNode};
pub use record::{
    FIELD_SEPARATOR, FileRecord, PATH_SEPARATOR, RecordParseError, TOO_MANY_FILES,
};
