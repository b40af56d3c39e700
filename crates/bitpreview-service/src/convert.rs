//! Conversion between transient and persisted preview nodes.

use indexmap::IndexMap;

use bitpreview_core::{BitstreamId, PreviewNode, StoreError, ViewNode};

use crate::store::PreviewStore;

/// Convert a view tree into its persisted form.
///
/// Every node in the subtree gets a fresh id from `store` and is owned by
/// `bitstream`. Nothing is written yet; hand the roots to
/// [`PreviewStore::insert_tree`].
pub fn to_persisted<S: PreviewStore + ?Sized>(
    store: &S,
    bitstream: &BitstreamId,
    view: &ViewNode,
) -> Result<PreviewNode, StoreError> {
    let id = store.next_id()?;

    let mut children = IndexMap::with_capacity(view.children.len());
    for (name, child) in &view.children {
        children.insert(name.clone(), to_persisted(store, bitstream, child)?);
    }

    Ok(PreviewNode {
        id,
        bitstream: bitstream.clone(),
        name: view.name.clone(),
        content: view.content.clone(),
        is_directory: view.is_directory,
        size: view.size.to_string(),
        children,
    })
}

/// Convert a persisted tree back into a view tree.
///
/// A stored size that does not parse as an integer reads back as 0.
pub fn to_view(node: &PreviewNode) -> ViewNode {
    ViewNode {
        name: node.name.clone(),
        content: node.content.clone(),
        size: parse_size(node),
        is_directory: node.is_directory,
        children: node
            .children
            .iter()
            .map(|(name, child)| (name.clone(), to_view(child)))
            .collect(),
    }
}

fn parse_size(node: &PreviewNode) -> u64 {
    match node.size.trim().parse() {
        Ok(size) => size,
        Err(_) => {
            tracing::warn!(id = node.id.0, size = %node.size, "unreadable stored size, using 0");
            0
        }
    }
}
