//! Preview persistence.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use bitpreview_core::{BitstreamId, PreviewNode, PreviewNodeId, StoreError};

/// Result of inserting a preview tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The tree was stored.
    Inserted,
    /// Another writer stored a tree for this bitstream first; its roots are
    /// returned and the offered tree was discarded.
    AlreadyPresent(Vec<PreviewNode>),
}

/// Storage for persisted preview trees, keyed by bitstream.
///
/// Implementations must make [`insert_tree`](Self::insert_tree) an atomic
/// create-if-absent so that concurrent generators never leave two trees for
/// one bitstream.
pub trait PreviewStore {
    /// Allocate a fresh node id.
    fn next_id(&self) -> Result<PreviewNodeId, StoreError>;

    /// Store the root nodes of a bitstream's preview unless one already exists.
    fn insert_tree(
        &self,
        bitstream: &BitstreamId,
        roots: Vec<PreviewNode>,
    ) -> Result<InsertOutcome, StoreError>;

    /// Whether a non-empty preview is stored for the bitstream.
    fn has_preview(&self, bitstream: &BitstreamId) -> Result<bool, StoreError>;

    /// Root nodes stored for the bitstream, empty when none.
    fn find_roots(&self, bitstream: &BitstreamId) -> Result<Vec<PreviewNode>, StoreError>;

    /// Look up any stored node by id.
    fn find_node(&self, id: PreviewNodeId) -> Result<Option<PreviewNode>, StoreError>;

    /// Bitstreams that currently have a stored preview.
    fn bitstreams(&self) -> Result<Vec<BitstreamId>, StoreError>;

    /// Remove the bitstream's preview; returns the number of nodes removed.
    fn delete_tree(&self, bitstream: &BitstreamId) -> Result<usize, StoreError>;
}

/// In-memory [`PreviewStore`] backed by a concurrent map.
#[derive(Debug)]
pub struct MemoryStore {
    trees: DashMap<BitstreamId, Vec<PreviewNode>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            trees: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of bitstreams with a stored preview.
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Check if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Total number of stored nodes across all trees.
    pub fn node_count(&self) -> usize {
        self.trees
            .iter()
            .map(|entry| entry.value().iter().map(PreviewNode::node_count).sum::<usize>())
            .sum()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewStore for MemoryStore {
    fn next_id(&self) -> Result<PreviewNodeId, StoreError> {
        Ok(PreviewNodeId::new(self.next_id.fetch_add(1, Ordering::Relaxed)))
    }

    fn insert_tree(
        &self,
        bitstream: &BitstreamId,
        roots: Vec<PreviewNode>,
    ) -> Result<InsertOutcome, StoreError> {
        if roots.is_empty() {
            return Ok(InsertOutcome::Inserted);
        }
        match self.trees.entry(bitstream.clone()) {
            Entry::Occupied(existing) => {
                tracing::debug!(%bitstream, "preview already stored, keeping existing tree");
                Ok(InsertOutcome::AlreadyPresent(existing.get().clone()))
            }
            Entry::Vacant(slot) => {
                slot.insert(roots);
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    fn has_preview(&self, bitstream: &BitstreamId) -> Result<bool, StoreError> {
        Ok(self.trees.contains_key(bitstream))
    }

    fn find_roots(&self, bitstream: &BitstreamId) -> Result<Vec<PreviewNode>, StoreError> {
        Ok(self
            .trees
            .get(bitstream)
            .map(|roots| roots.value().clone())
            .unwrap_or_default())
    }

    fn find_node(&self, id: PreviewNodeId) -> Result<Option<PreviewNode>, StoreError> {
        Ok(self
            .trees
            .iter()
            .find_map(|entry| entry.value().iter().find_map(|root| root.find(id)).cloned()))
    }

    fn bitstreams(&self) -> Result<Vec<BitstreamId>, StoreError> {
        let mut ids: Vec<BitstreamId> = self.trees.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }

    fn delete_tree(&self, bitstream: &BitstreamId) -> Result<usize, StoreError> {
        Ok(self
            .trees
            .remove(bitstream)
            .map(|(_, roots)| roots.iter().map(PreviewNode::node_count).sum::<usize>())
            .unwrap_or(0))
    }
}
