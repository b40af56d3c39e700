//! Scratch files for archives that need random access.

use std::io::{Read, Seek, Write};
use std::path::PathBuf;

use tempfile::NamedTempFile;

/// Source of short-lived scratch files.
///
/// A scratch file must release its backing storage when dropped, so the
/// extractor only has to drop it on every exit path.
pub trait ScratchSpace {
    /// Scratch file handle.
    type File: Read + Write + Seek;

    /// Create a fresh, empty scratch file.
    fn create(&self) -> std::io::Result<Self::File>;
}

/// Scratch files backed by [`NamedTempFile`], deleted on drop.
#[derive(Debug, Clone, Default)]
pub struct TempScratch {
    dir: Option<PathBuf>,
}

impl TempScratch {
    /// Use the system temporary directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place scratch files in `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }
}

impl ScratchSpace for TempScratch {
    type File = NamedTempFile;

    fn create(&self) -> std::io::Result<NamedTempFile> {
        let file = match &self.dir {
            Some(dir) => tempfile::Builder::new().prefix("bitpreview-").tempfile_in(dir)?,
            None => tempfile::Builder::new().prefix("bitpreview-").tempfile()?,
        };
        tracing::trace!(path = %file.path().display(), "created scratch file");
        Ok(file)
    }
}
