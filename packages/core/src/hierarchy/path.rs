//! Tree position resolution for a node's intended parent

use crate::db::{StoreError, TreeStore};
use crate::models::TreeInfo;
use crate::hierarchy::error::{HierarchyError, HierarchyResult};

/// Computes `{ancestors, depth, path_prefix}` from a parent record.
pub struct PathBuilder<'a> {
    store: &'a dyn TreeStore,
}

impl<'a> PathBuilder<'a> {
    pub fn new(store: &'a dyn TreeStore) -> Self {
        Self { store }
    }

    /// Resolve the tree position of a node placed under `parent_id`.
    ///
    /// `None` yields the root position. A parent id that does not exist in the
    /// tenant fails with `ParentNotFound`.
    pub async fn resolve(
        &self,
        tenant_id: &str,
        parent_id: Option<&str>,
    ) -> HierarchyResult<TreeInfo> {
        let Some(parent_id) = parent_id else {
            return Ok(TreeInfo::root());
        };

        match self.store.find_by_id(tenant_id, parent_id).await {
            Ok(parent) => Ok(TreeInfo::child_of(&parent)),
            Err(StoreError::NotFound { .. }) => {
                Err(HierarchyError::parent_not_found(parent_id))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::Category;

    #[tokio::test]
    async fn test_resolve_root_and_nested() {
        let store = MemoryStore::new();
        let a = store
            .create(Category::new("t1", "A", "a", TreeInfo::root()))
            .await
            .unwrap();
        let b = store
            .create(Category::new("t1", "B", "b", TreeInfo::child_of(&a)))
            .await
            .unwrap();
        let builder = PathBuilder::new(&store);

        assert_eq!(builder.resolve("t1", None).await.unwrap(), TreeInfo::root());

        let info = builder.resolve("t1", Some(&b.id)).await.unwrap();
        assert_eq!(info.parent_id.as_deref(), Some(b.id.as_str()));
        assert_eq!(info.ancestors, vec![a.id.clone(), b.id.clone()]);
        assert_eq!(info.depth, 2);
        assert_eq!(info.path_for("c"), "a/b/c");
    }

    #[tokio::test]
    async fn test_resolve_missing_parent() {
        let store = MemoryStore::new();
        let a = store
            .create(Category::new("t1", "A", "a", TreeInfo::root()))
            .await
            .unwrap();
        let builder = PathBuilder::new(&store);

        let err = builder.resolve("t1", Some("nope")).await.unwrap_err();
        assert!(matches!(err, HierarchyError::ParentNotFound { .. }));

        // Parents are tenant scoped
        let err = builder.resolve("t2", Some(&a.id)).await.unwrap_err();
        assert!(matches!(err, HierarchyError::ParentNotFound { .. }));
    }
}
