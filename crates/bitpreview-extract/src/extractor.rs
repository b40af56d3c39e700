//! ZIP and TAR member listing.

use std::io::{Read, Seek, SeekFrom};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use zip::ZipArchive;

use bitpreview_core::{ArchiveCompression, ContentKind, FileRecord, PATH_SEPARATOR};

use crate::error::ExtractionError;
use crate::scratch::{ScratchSpace, TempScratch};

/// Initial capacity for listings; most archives have fewer members.
const ESTIMATED_MEMBER_COUNT: usize = 200;

/// Archive container formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// ZIP, listed from a scratch copy.
    Zip,
    /// TAR, streamed, optionally compressed.
    Tar(ArchiveCompression),
}

impl ArchiveFormat {
    /// Map a content kind to an archive format, if it is one.
    pub fn from_kind(kind: ContentKind) -> Option<Self> {
        match kind {
            ContentKind::ZipArchive => Some(Self::Zip),
            ContentKind::TarArchive { compression } => Some(Self::Tar(compression)),
            ContentKind::PlainText | ContentKind::Html | ContentKind::Unsupported => None,
        }
    }
}

/// Lists archive members as flat [`FileRecord`]s in archive order.
///
/// Member payloads are never decompressed; only names, sizes and directory
/// flags are read.
pub struct ArchiveExtractor<S = TempScratch> {
    scratch: S,
}

impl ArchiveExtractor {
    /// Create an extractor using the system temporary directory.
    pub fn new() -> Self {
        Self {
            scratch: TempScratch::new(),
        }
    }
}

impl Default for ArchiveExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ScratchSpace> ArchiveExtractor<S> {
    /// Create an extractor with a custom scratch space.
    pub fn with_scratch(scratch: S) -> Self {
        Self { scratch }
    }

    /// List the members of an archive, best effort.
    ///
    /// Any failure is logged and yields an empty listing.
    pub fn extract<R: Read>(&self, reader: R, format: ArchiveFormat) -> Vec<FileRecord> {
        match self.try_extract(reader, format) {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(?format, error = %err, "archive extraction failed, preview left empty");
                Vec::new()
            }
        }
    }

    /// List the members of an archive, reporting failures.
    pub fn try_extract<R: Read>(
        &self,
        reader: R,
        format: ArchiveFormat,
    ) -> Result<Vec<FileRecord>, ExtractionError> {
        let records = match format {
            ArchiveFormat::Zip => self.list_zip(reader)?,
            ArchiveFormat::Tar(ArchiveCompression::None) => list_tar(reader)?,
            ArchiveFormat::Tar(ArchiveCompression::Gzip) => list_tar(GzDecoder::new(reader))?,
            ArchiveFormat::Tar(ArchiveCompression::Bzip2) => list_tar(BzDecoder::new(reader))?,
        };
        tracing::debug!(?format, members = records.len(), "listed archive");
        Ok(records)
    }

    /// Copy the stream to a scratch file and walk the ZIP central directory.
    ///
    /// The scratch file lives only inside this call; it is dropped (and its
    /// storage released) on success and on every error path.
    fn list_zip<R: Read>(&self, mut reader: R) -> Result<Vec<FileRecord>, ExtractionError> {
        let mut scratch = self
            .scratch
            .create()
            .map_err(|e| ExtractionError::io("creating scratch file", e))?;

        std::io::copy(&mut reader, &mut scratch)
            .map_err(|e| ExtractionError::io("copying archive to scratch file", e))?;
        scratch
            .seek(SeekFrom::Start(0))
            .map_err(|e| ExtractionError::io("rewinding scratch file", e))?;

        let mut archive = ZipArchive::new(&mut scratch)?;
        let mut records = Vec::with_capacity(archive.len().min(ESTIMATED_MEMBER_COUNT));

        for index in 0..archive.len() {
            let member = archive.by_index_raw(index)?;
            if let Some(path) = normalize_member_path(member.name()) {
                records.push(FileRecord::from_raw(path, member.size(), member.is_dir()));
            }
        }

        Ok(records)
    }
}

/// Stream TAR headers, skipping payloads.
fn list_tar<R: Read>(reader: R) -> Result<Vec<FileRecord>, ExtractionError> {
    let mut archive = tar::Archive::new(reader);
    let mut records = Vec::with_capacity(ESTIMATED_MEMBER_COUNT);

    for entry in archive.entries().map_err(ExtractionError::tar)? {
        let entry = entry.map_err(ExtractionError::tar)?;
        let entry_type = entry.header().entry_type();

        // Extension headers describe the next member, they are not members.
        if entry_type.is_pax_global_extensions()
            || entry_type.is_pax_local_extensions()
            || entry_type.is_gnu_longname()
            || entry_type.is_gnu_longlink()
        {
            continue;
        }

        let raw = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        if let Some(path) = normalize_member_path(&raw) {
            let is_dir = entry_type.is_dir();
            let size = if is_dir { 0 } else { entry.size() };
            records.push(FileRecord::from_raw(path, size, is_dir));
        }
    }

    Ok(records)
}

/// Strip `./` and leading separators; `None` for the archive root itself.
fn normalize_member_path(raw: &str) -> Option<&str> {
    let mut path = raw.trim_start_matches(PATH_SEPARATOR);
    while let Some(rest) = path.strip_prefix("./") {
        path = rest.trim_start_matches(PATH_SEPARATOR);
    }
    if path.is_empty() || path == "." {
        None
    } else {
        Some(path)
    }
}
