//! Descendant rewrite after a rename or move
//!
//! When a node's `path`, `ancestors` or `depth` changes, every record below it
//! carries a stale copy of those values. [`ReparentPropagator`] rewrites them
//! in one batch write:
//!
//! - `path`: the old `node/` prefix is replaced by the new one, the
//!   descendant's own relative sub-path is kept verbatim
//! - `ancestors`: everything up to and including the node is replaced by the
//!   node's new chain plus the node itself
//! - `depth`: shifted by the node's depth change

use crate::db::{BulkUpdate, BulkWriteResult, TreeStore};
use crate::models::{Category, CategoryPatch};
use crate::hierarchy::error::HierarchyResult;

/// Before/after tree position of the node whose subtree is being rewritten
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtreeShift {
    pub node_id: String,
    pub old_path: String,
    pub new_path: String,
    pub old_ancestors: Vec<String>,
    pub new_ancestors: Vec<String>,
    pub old_depth: u32,
    pub new_depth: u32,
}

impl SubtreeShift {
    /// Shift between two snapshots of the same record
    pub fn between(before: &Category, after: &Category) -> Self {
        Self {
            node_id: before.id.clone(),
            old_path: before.path.clone(),
            new_path: after.path.clone(),
            old_ancestors: before.ancestors.clone(),
            new_ancestors: after.ancestors.clone(),
            old_depth: before.depth,
            new_depth: after.depth,
        }
    }

    /// Whether descendants need rewriting at all
    pub fn is_noop(&self) -> bool {
        self.old_path == self.new_path
            && self.old_ancestors == self.new_ancestors
            && self.old_depth == self.new_depth
    }

    /// Patch bringing `descendant` in line with the node's new position.
    ///
    /// Returns `None` if `descendant` does not list the node among its ancestors.
    pub fn rewrite(&self, descendant: &Category) -> Option<CategoryPatch> {
        let position = descendant
            .ancestors
            .iter()
            .position(|a| a == &self.node_id)?;
        let tail = &descendant.ancestors[position + 1..];

        let mut ancestors = Vec::with_capacity(self.new_ancestors.len() + 1 + tail.len());
        ancestors.extend(self.new_ancestors.iter().cloned());
        ancestors.push(self.node_id.clone());
        ancestors.extend(tail.iter().cloned());

        let old_prefix = format!("{}/", self.old_path);
        let relative = match descendant.path.strip_prefix(&old_prefix) {
            Some(relative) => relative.to_string(),
            None => {
                let segments: Vec<&str> = descendant.path.split('/').collect();
                let keep = (tail.len() + 1).min(segments.len());
                tracing::warn!(
                    descendant_id = %descendant.id,
                    path = %descendant.path,
                    expected_prefix = %old_prefix,
                    "Descendant path does not start with the node's old path, rebuilding from trailing segments"
                );
                segments[segments.len() - keep..].join("/")
            }
        };
        let path = format!("{}/{}", self.new_path, relative);

        // Equals descendant.depth + (new_depth - old_depth) on a consistent tree
        let depth = ancestors.len() as u32;

        Some(CategoryPatch::tree_fields(ancestors, depth, path))
    }
}

/// Rewrites the derived tree fields of every descendant of a shifted node.
pub struct ReparentPropagator<'a> {
    store: &'a dyn TreeStore,
}

impl<'a> ReparentPropagator<'a> {
    pub fn new(store: &'a dyn TreeStore) -> Self {
        Self { store }
    }

    /// Rewrite all descendants of `shift.node_id` in a single `bulk_update`.
    ///
    /// The batch is best effort: the returned [`BulkWriteResult`] lists any
    /// entries the backend did not apply. Nothing is rolled back.
    pub async fn propagate(
        &self,
        tenant_id: &str,
        shift: &SubtreeShift,
    ) -> HierarchyResult<BulkWriteResult> {
        if shift.is_noop() {
            return Ok(BulkWriteResult::default());
        }

        let descendants = self
            .store
            .find_descendants(tenant_id, &shift.node_id)
            .await?;
        if descendants.is_empty() {
            return Ok(BulkWriteResult::default());
        }

        let updates: Vec<BulkUpdate> = descendants
            .iter()
            .filter_map(|d| shift.rewrite(d).map(|patch| BulkUpdate::new(d.id.clone(), patch)))
            .collect();

        tracing::debug!(
            tenant_id,
            node_id = %shift.node_id,
            descendants = updates.len(),
            old_path = %shift.old_path,
            new_path = %shift.new_path,
            "Propagating subtree shift"
        );

        let result = self.store.bulk_update(tenant_id, updates).await?;
        if !result.is_complete() {
            tracing::warn!(
                tenant_id,
                node_id = %shift.node_id,
                requested = result.requested,
                matched = result.matched,
                failed = result.failures.len(),
                "Descendant propagation partially applied"
            );
        }
        Ok(result)
    }
}
