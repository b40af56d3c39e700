//! Preview orchestration for bitpreview.
//!
//! [`PreviewService`] decides whether a bitstream may be previewed, returns a
//! stored preview when one exists, and otherwise generates one from the
//! content stream and stores it. [`PreviewSweeper`] does the same in bulk.
//!
//! # Example
//!
//! ```no_run
//! use bitpreview_core::{Bitstream, PreviewConfig};
//! use bitpreview_service::{DirectorySource, MemoryStore, OpenAccess, PreviewService};
//!
//! let config = PreviewConfig::builder()
//!     .generate_on_page_load(true)
//!     .build()
//!     .unwrap();
//! let service = PreviewService::new(config, MemoryStore::new(), OpenAccess).unwrap();
//! let source = DirectorySource::new("/srv/assets");
//!
//! let bitstream = Bitstream::new("dataset.zip", Some("dataset.zip"), "application/zip", 1);
//! for root in service.get_or_generate(&bitstream, &source).unwrap() {
//!     println!("{} ({} bytes)", root.name, root.size);
//! }
//! ```

pub mod access;
pub mod convert;
pub mod service;
pub mod source;
pub mod store;
pub mod sweep;
pub mod url;

pub use access::{AccessPolicy, OpenAccess, PreviewGate, ReadAccess};
pub use convert::{to_persisted, to_view};
pub use service::{PreviewOutcome, PreviewService};
pub use source::{ContentSource, DirectorySource};
pub use store::{InsertOutcome, MemoryStore, PreviewStore};
pub use sweep::{PROGRESS_INTERVAL, PreviewSweeper, SweepFailure, SweepProgress, SweepReport};
pub use url::compose_preview_url;
