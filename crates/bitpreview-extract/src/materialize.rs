//! Flat listing to preview tree.

use compact_str::CompactString;
use indexmap::IndexMap;

use bitpreview_core::{FileRecord, PATH_SEPARATOR, RecordParseError, ViewChildren, ViewNode};

/// Builds [`ViewNode`] trees from separator-delimited paths.
///
/// Knows nothing about archive formats. Intermediate directories are created
/// on first use and reused afterwards; nodes are only ever appended below
/// their parent, so the result is a forest without back-edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeMaterializer;

impl TreeMaterializer {
    /// Create a new materializer.
    pub fn new() -> Self {
        Self
    }

    /// Build root nodes from records, in first-seen order.
    pub fn materialize<'a>(&self, records: impl IntoIterator<Item = &'a FileRecord>) -> Vec<ViewNode> {
        let mut roots: ViewChildren = IndexMap::new();
        for record in records {
            insert_record(&mut roots, record);
        }
        roots.into_values().collect()
    }

    /// Parse `<path>|<size>` lines and build root nodes.
    pub fn materialize_lines<I, L>(&self, lines: I) -> Result<Vec<ViewNode>, RecordParseError>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<str>,
    {
        let records = lines
            .into_iter()
            .map(|line| line.as_ref().parse::<FileRecord>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.materialize(&records))
    }
}

/// Attach one record below `roots`, creating parents as needed.
fn insert_record(roots: &mut ViewChildren, record: &FileRecord) {
    let components: Vec<&str> = record
        .path
        .split(PATH_SEPARATOR)
        .filter(|c| !c.is_empty() && *c != ".")
        .collect();

    let Some((last, parents)) = components.split_last() else {
        return;
    };

    let mut level = roots;
    for &parent in parents {
        let node = level
            .entry(CompactString::from(parent))
            .or_insert_with(|| ViewNode::directory(parent));
        promote_to_directory(node);
        level = &mut node.children;
    }

    match level.get_mut(*last) {
        Some(existing) if record.is_directory => promote_to_directory(existing),
        Some(existing) if existing.is_directory => {
            tracing::debug!(path = %record.path, "file record shadows a directory, ignored");
        }
        Some(existing) => existing.size = record.size,
        None => {
            let node = if record.is_directory {
                ViewNode::directory(*last)
            } else {
                ViewNode::file(*last, record.size)
            };
            level.insert(CompactString::from(*last), node);
        }
    }
}

/// A node that gains children must be a directory.
fn promote_to_directory(node: &mut ViewNode) {
    if !node.is_directory {
        tracing::debug!(name = %node.name, "file node promoted to directory");
        node.is_directory = true;
        node.size = 0;
        node.content.clear();
    }
}
