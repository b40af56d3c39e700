//! Content-kind dispatch tag.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Filename suffixes that mark archive payloads.
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "tar", "gz", "tar.gz", "tar.bz2"];

/// Compression wrapped around a TAR stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum ArchiveCompression {
    /// Plain TAR.
    #[default]
    None,
    /// gzip-compressed TAR.
    Gzip,
    /// bzip2-compressed TAR.
    Bzip2,
}

/// What a bitstream holds, decided once from its declared MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
pub enum ContentKind {
    /// Plain text, stored truncated.
    PlainText,
    /// HTML, returned in full and never stored.
    Html,
    /// ZIP archive (needs random access).
    ZipArchive,
    /// TAR archive (streamed).
    TarArchive { compression: ArchiveCompression },
    /// Nothing to preview.
    Unsupported,
}

impl ContentKind {
    /// Decide the kind from a MIME type, ignoring case and parameters.
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "text/plain" => Self::PlainText,
            "text/html" => Self::Html,
            "application/zip" | "application/x-zip-compressed" => Self::ZipArchive,
            "application/x-tar" => Self::TarArchive {
                compression: ArchiveCompression::None,
            },
            "application/gzip"
            | "application/x-gzip"
            | "application/x-gtar"
            | "application/x-compressed-tar" => Self::TarArchive {
                compression: ArchiveCompression::Gzip,
            },
            "application/x-bzip2" | "application/x-bzip-compressed-tar" => Self::TarArchive {
                compression: ArchiveCompression::Bzip2,
            },
            _ => Self::Unsupported,
        }
    }

    /// Whether the kind lists archive members.
    pub fn is_archive(&self) -> bool {
        matches!(self, Self::ZipArchive | Self::TarArchive { .. })
    }

    /// Whether generated output may be written to the store.
    ///
    /// HTML bodies are unbounded and would overflow the content column.
    pub fn is_persistable(&self) -> bool {
        !matches!(self, Self::Html | Self::Unsupported)
    }
}

/// Check whether a filename ends in one of [`ARCHIVE_EXTENSIONS`].
pub fn has_archive_extension(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    ARCHIVE_EXTENSIONS.iter().any(|ext| {
        lower
            .strip_suffix(ext)
            .is_some_and(|stem| stem.ends_with('.'))
    })
}
