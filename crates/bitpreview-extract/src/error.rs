//! Extraction error types.

use thiserror::Error;

/// Errors that can occur while listing an archive.
///
/// These never leave [`crate::ArchiveExtractor::extract`]; they are logged
/// and the listing degrades to empty.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// I/O failure outside the archive format itself.
    #[error("I/O error while {stage}: {source}")]
    Io {
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The ZIP container could not be read.
    #[error("Invalid ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The TAR stream could not be read.
    #[error("Invalid TAR archive: {source}")]
    Tar {
        #[source]
        source: std::io::Error,
    },
}

impl ExtractionError {
    /// Create an I/O error tagged with the step that failed.
    pub fn io(stage: &'static str, source: std::io::Error) -> Self {
        Self::Io { stage, source }
    }

    /// Create a TAR format error.
    pub fn tar(source: std::io::Error) -> Self {
        Self::Tar { source }
    }
}
