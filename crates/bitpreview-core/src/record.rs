//! Flat listing records produced by archive extraction.

use std::fmt;
use std::str::FromStr;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator between path components inside an archive.
pub const PATH_SEPARATOR: char = '/';

/// Separator between path and size in the line form.
pub const FIELD_SEPARATOR: char = '|';

/// Name of the synthetic entry appended when the file limit is exceeded.
pub const TOO_MANY_FILES: &str = "...too many files...";

/// One archive member: path, size and directory-ness.
///
/// Directory paths are stored without a trailing separator; the separator is
/// added back when rendering the line form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Separator-delimited path inside the archive.
    pub path: CompactString,
    /// Uncompressed size in bytes (0 for directories).
    pub size: u64,
    /// Whether the member is a directory.
    pub is_directory: bool,
}

impl FileRecord {
    /// Create a file record.
    pub fn file(path: impl AsRef<str>, size: u64) -> Self {
        Self {
            path: CompactString::from(path.as_ref()),
            size,
            is_directory: false,
        }
    }

    /// Create a directory record; a trailing separator is dropped.
    pub fn directory(path: impl AsRef<str>) -> Self {
        Self {
            path: CompactString::from(path.as_ref().trim_end_matches(PATH_SEPARATOR)),
            size: 0,
            is_directory: true,
        }
    }

    /// Create a record from a raw archive path, treating a trailing
    /// separator as a directory marker.
    pub fn from_raw(path: impl AsRef<str>, size: u64, is_directory: bool) -> Self {
        let path = path.as_ref();
        if is_directory || path.ends_with(PATH_SEPARATOR) {
            Self::directory(path)
        } else {
            Self::file(path, size)
        }
    }

    /// The synthetic record signalling that files were left out.
    pub fn too_many_files() -> Self {
        Self::file(TOO_MANY_FILES, 0)
    }

    /// Whether this is the truncation sentinel.
    pub fn is_sentinel(&self) -> bool {
        !self.is_directory && self.path == TOO_MANY_FILES
    }

    /// Render the `<path>|<size>` line form.
    pub fn to_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_directory {
            write!(f, "{}{PATH_SEPARATOR}{FIELD_SEPARATOR}{}", self.path, self.size)
        } else {
            write!(f, "{}{FIELD_SEPARATOR}{}", self.path, self.size)
        }
    }
}

/// Error parsing a listing line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordParseError {
    /// No `|` between path and size.
    #[error("Missing size separator in listing line: {line}")]
    MissingSeparator { line: String },

    /// Size is not an unsigned integer.
    #[error("Invalid size '{size}' in listing line")]
    InvalidSize { size: String },

    /// Path is empty.
    #[error("Empty path in listing line")]
    EmptyPath,
}

impl FromStr for FileRecord {
    type Err = RecordParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        // Paths may contain '|'; the size never does.
        let (path, size) =
            line.rsplit_once(FIELD_SEPARATOR)
                .ok_or_else(|| RecordParseError::MissingSeparator {
                    line: line.to_string(),
                })?;

        let size: u64 = size.trim().parse().map_err(|_| RecordParseError::InvalidSize {
            size: size.to_string(),
        })?;

        if path.trim_end_matches(PATH_SEPARATOR).is_empty() {
            return Err(RecordParseError::EmptyPath);
        }

        Ok(Self::from_raw(path, size, false))
    }
}
