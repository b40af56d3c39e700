//! Where bitstream bytes come from.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use bitpreview_core::Bitstream;

/// Opens the content stream of a bitstream.
pub trait ContentSource {
    /// Open a fresh reader positioned at the first byte.
    fn open(&self, bitstream: &Bitstream) -> io::Result<Box<dyn Read + '_>>;
}

impl<F> ContentSource for F
where
    F: Fn(&Bitstream) -> io::Result<Box<dyn Read>>,
{
    fn open(&self, bitstream: &Bitstream) -> io::Result<Box<dyn Read + '_>> {
        self(bitstream)
    }
}

/// Reads bitstreams from files below a root directory; the bitstream id is
/// the path relative to that root. Ids that are absolute or contain `..`
/// are rejected.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Create a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the on-disk path of a bitstream.
    ///
    /// Fails with [`io::ErrorKind::InvalidInput`] when the id would resolve
    /// outside the root.
    pub fn path_of(&self, bitstream: &Bitstream) -> io::Result<PathBuf> {
        let relative = Path::new(bitstream.id.as_str());
        let escapes = relative.components().any(|component| {
            matches!(
                component,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("bitstream id '{}' is not below the source root", bitstream.id),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl ContentSource for DirectorySource {
    fn open(&self, bitstream: &Bitstream) -> io::Result<Box<dyn Read + '_>> {
        let file = File::open(self.path_of(bitstream)?)?;
        Ok(Box::new(BufReader::new(file)))
    }
}
