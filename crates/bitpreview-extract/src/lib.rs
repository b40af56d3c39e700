//! Archive listing and preview-tree building for bitpreview.
//!
//! # Overview
//!
//! `bitpreview-extract` turns archive bytes into preview trees in three
//! independent steps:
//!
//! - **Extraction** ([`ArchiveExtractor`]) lists ZIP and TAR members as flat
//!   [`FileRecord`]s. TAR is streamed; ZIP is copied to a scratch file that
//!   is released before the call returns.
//! - **Truncation** ([`TruncationPolicy`]) caps text length and the number of
//!   listed files.
//! - **Materialization** ([`TreeMaterializer`]) folds separator-delimited
//!   paths into a forest of [`ViewNode`]s.
//!
//! # Example
//!
//! ```rust,no_run
//! use bitpreview_extract::{ArchiveExtractor, ArchiveFormat, TreeMaterializer, TruncationPolicy};
//!
//! let file = std::fs::File::open("bundle.zip").unwrap();
//! let records = ArchiveExtractor::new().extract(file, ArchiveFormat::Zip);
//! let records = TruncationPolicy::default().limit_leaves(records);
//! let roots = TreeMaterializer::new().materialize(&records);
//!
//! for root in &roots {
//!     println!("{} ({} files)", root.name, root.leaf_count());
//! }
//! ```

mod error;
mod extractor;
mod materialize;
mod scratch;
mod truncate;

pub use error::ExtractionError;
pub use extractor::{ArchiveExtractor, ArchiveFormat};
pub use materialize::TreeMaterializer;
pub use scratch::{ScratchSpace, TempScratch};
pub use truncate::{TruncationPolicy, limit_leaves, truncate_text};

// Re-export core types for convenience
pub use bitpreview_core::{ArchiveCompression, FileRecord, ViewNode};
