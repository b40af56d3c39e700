//! Preview tree node types.
//!
//! [`ViewNode`] is the transient tree handed to callers; [`PreviewNode`] is
//! the persisted form owned by a bitstream. Both trees are built insert-only
//! (children are appended, never re-parented), so neither can contain cycles.

use compact_str::CompactString;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::bitstream::BitstreamId;

/// Children keyed by name; keys are unique per parent, order is not significant.
pub type ViewChildren = IndexMap<CompactString, ViewNode>;

/// Persisted children keyed by name.
pub type PreviewChildren = IndexMap<CompactString, PreviewNode>;

/// Transient preview node used for extraction output and responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewNode {
    /// File or directory name (not full path).
    pub name: CompactString,

    /// Inline content; empty for directories and archive members.
    #[serde(default)]
    pub content: String,

    /// Size in bytes (0 for directories).
    pub size: u64,

    /// Whether this node is a directory.
    pub is_directory: bool,

    /// Child nodes (directories only).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub children: ViewChildren,
}

impl ViewNode {
    /// Create a file node.
    pub fn file(name: impl Into<CompactString>, size: u64) -> Self {
        Self {
            name: name.into(),
            content: String::new(),
            size,
            is_directory: false,
            children: IndexMap::new(),
        }
    }

    /// Create an empty directory node.
    pub fn directory(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            content: String::new(),
            size: 0,
            is_directory: true,
            children: IndexMap::new(),
        }
    }

    /// Create a single-file node carrying inline text, sized by its byte length.
    pub fn text(name: impl Into<CompactString>, content: String) -> Self {
        let size = content.len() as u64;
        Self {
            name: name.into(),
            content,
            size,
            is_directory: false,
            children: IndexMap::new(),
        }
    }

    /// Look up a direct child by name.
    pub fn child(&self, name: &str) -> Option<&ViewNode> {
        self.children.get(name)
    }

    /// Get the number of direct children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Count non-directory nodes in this subtree, including this node.
    pub fn leaf_count(&self) -> usize {
        if self.is_directory {
            self.children.values().map(ViewNode::leaf_count).sum()
        } else {
            1
        }
    }

    /// Count all nodes in this subtree, including this node.
    pub fn node_count(&self) -> usize {
        1 + self.children.values().map(ViewNode::node_count).sum::<usize>()
    }

    /// Check the structural invariant: only directories have children.
    pub fn is_well_formed(&self) -> bool {
        (self.is_directory || self.children.is_empty())
            && self.children.iter().all(|(key, child)| {
                key.as_str() == child.name.as_str() && child.is_well_formed()
            })
    }
}

/// Store-assigned identity of a persisted node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PreviewNodeId(pub u64);

impl PreviewNodeId {
    /// Create a new PreviewNodeId from a u64.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Persisted preview node, owned by a bitstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewNode {
    /// Store-assigned identity.
    pub id: PreviewNodeId,

    /// Owning bitstream.
    pub bitstream: BitstreamId,

    /// File or directory name.
    pub name: CompactString,

    /// Stored content, already truncated.
    pub content: String,

    /// Whether this node is a directory.
    pub is_directory: bool,

    /// Size in bytes, as stored (string column).
    pub size: String,

    /// Child nodes.
    pub children: PreviewChildren,
}

impl PreviewNode {
    /// Count all nodes in this subtree, including this node.
    pub fn node_count(&self) -> usize {
        1 + self.children.values().map(PreviewNode::node_count).sum::<usize>()
    }

    /// Visit every node id in this subtree, parent before children.
    pub fn ids(&self) -> Vec<PreviewNodeId> {
        let mut ids = Vec::with_capacity(self.node_count());
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            ids.push(node.id);
            stack.extend(node.children.values());
        }
        ids
    }

    /// Find a node by id in this subtree.
    pub fn find(&self, id: PreviewNodeId) -> Option<&PreviewNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.values().find_map(|child| child.find(id))
    }
}
