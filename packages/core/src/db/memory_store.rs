//! MemoryStore - In-Process TreeStore Backend
//!
//! Keeps every tenant's categories in one `HashMap` behind a tokio `RwLock`.
//! Used as the default backend, in tests, and by the dev tools.
//!
//! The store enforces the same uniqueness rules a document store would
//! enforce with indexes: unique id, and unique `(tenant_id, slug)`.

use crate::db::error::{StoreError, StoreResult};
use crate::db::tree_store::{BulkUpdate, BulkWriteFailure, BulkWriteResult, TreeStore};
use crate::models::{Category, CategoryOutline, CategoryQuery, Page};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory `TreeStore`
#[derive(Default)]
pub struct MemoryStore {
    /// Map: category id → record (all tenants)
    rows: Arc<RwLock<HashMap<String, Category>>>,

    /// Ids whose `bulk_update` entries are rejected (failure injection for tests)
    failing_updates: Arc<RwLock<HashSet<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `bulk_update` reject entries for these ids.
    ///
    /// Simulates a backend that partially fails a batch write.
    pub async fn fail_updates_for(&self, ids: impl IntoIterator<Item = String>) {
        self.failing_updates.write().await.extend(ids);
    }

    /// Stop rejecting any `bulk_update` entries
    pub async fn clear_update_failures(&self) {
        self.failing_updates.write().await.clear();
    }

    /// Number of rows across all tenants
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    fn slug_taken(
        rows: &HashMap<String, Category>,
        tenant_id: &str,
        slug: &str,
        exclude_id: Option<&str>,
    ) -> bool {
        rows.values().any(|c| {
            c.tenant_id == tenant_id && c.slug == slug && Some(c.id.as_str()) != exclude_id
        })
    }
}

#[async_trait]
impl TreeStore for MemoryStore {
    async fn create(&self, category: Category) -> StoreResult<Category> {
        let mut rows = self.rows.write().await;

        if rows.contains_key(&category.id) {
            return Err(StoreError::DuplicateId {
                id: category.id.clone(),
            });
        }
        if Self::slug_taken(&rows, &category.tenant_id, &category.slug, None) {
            return Err(StoreError::duplicate_slug(
                category.tenant_id.clone(),
                category.slug.clone(),
            ));
        }

        rows.insert(category.id.clone(), category.clone());
        Ok(category)
    }

    async fn bulk_update(
        &self,
        tenant_id: &str,
        updates: Vec<BulkUpdate>,
    ) -> StoreResult<BulkWriteResult> {
        let failing = self.failing_updates.read().await.clone();
        let mut rows = self.rows.write().await;

        let mut result = BulkWriteResult {
            requested: updates.len(),
            ..Default::default()
        };

        for BulkUpdate { id, patch } in updates {
            if failing.contains(&id) {
                result.failures.push(BulkWriteFailure {
                    id,
                    reason: "write rejected by backend".to_string(),
                });
                continue;
            }

            let in_tenant = rows
                .get(&id)
                .map(|c| c.tenant_id == tenant_id)
                .unwrap_or(false);
            if !in_tenant {
                result.failures.push(BulkWriteFailure {
                    id,
                    reason: "no matching category".to_string(),
                });
                continue;
            }

            if let Some(slug) = &patch.slug {
                if Self::slug_taken(&rows, tenant_id, slug, Some(&id)) {
                    result.failures.push(BulkWriteFailure {
                        id,
                        reason: format!("duplicate slug '{}'", slug),
                    });
                    continue;
                }
            }

            if let Some(row) = rows.get_mut(&id) {
                row.apply_patch(&patch);
                result.matched += 1;
            }
        }

        Ok(result)
    }

    async fn delete_one(&self, tenant_id: &str, id: &str) -> StoreResult<()> {
        let mut rows = self.rows.write().await;
        match rows.get(id) {
            Some(c) if c.tenant_id == tenant_id => {
                rows.remove(id);
                Ok(())
            }
            _ => Err(StoreError::not_found(tenant_id, id)),
        }
    }

    async fn find_by_id(&self, tenant_id: &str, id: &str) -> StoreResult<Category> {
        self.rows
            .read()
            .await
            .get(id)
            .filter(|c| c.tenant_id == tenant_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(tenant_id, id))
    }

    async fn find_by_slug(&self, tenant_id: &str, slug: &str) -> StoreResult<Category> {
        self.rows
            .read()
            .await
            .values()
            .find(|c| c.tenant_id == tenant_id && c.slug == slug)
            .cloned()
            .ok_or_else(|| StoreError::slug_not_found(tenant_id, slug))
    }

    async fn find_many(&self, tenant_id: &str, ids: &[String]) -> StoreResult<Vec<Category>> {
        let rows = self.rows.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| rows.get(id))
            .filter(|c| c.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn slug_exists(
        &self,
        tenant_id: &str,
        slug: &str,
        exclude_id: Option<&str>,
    ) -> StoreResult<bool> {
        let rows = self.rows.read().await;
        Ok(Self::slug_taken(&rows, tenant_id, slug, exclude_id))
    }

    async fn list(
        &self,
        tenant_id: &str,
        query: &CategoryQuery,
        limit: usize,
    ) -> StoreResult<Page<Category>> {
        let rows = self.rows.read().await;

        let mut matching: Vec<&Category> = rows
            .values()
            .filter(|c| c.tenant_id == tenant_id && query.matches(c))
            .collect();
        matching.sort_by(|a, b| query.compare(a, b));

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(query.offset(limit))
            .take(limit)
            .cloned()
            .collect();

        Ok(Page {
            items,
            total,
            page: query.page_number(),
            limit,
        })
    }

    async fn list_all(&self, tenant_id: &str) -> StoreResult<Vec<Category>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|c| c.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn load_outline(&self, tenant_id: &str) -> StoreResult<Vec<CategoryOutline>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|c| c.tenant_id == tenant_id)
            .map(CategoryOutline::from)
            .collect())
    }

    async fn exists_child_of(&self, tenant_id: &str, parent_id: &str) -> StoreResult<bool> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .any(|c| c.tenant_id == tenant_id && c.parent_id.as_deref() == Some(parent_id)))
    }

    async fn find_descendants(
        &self,
        tenant_id: &str,
        node_id: &str,
    ) -> StoreResult<Vec<Category>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|c| c.tenant_id == tenant_id && c.ancestors.iter().any(|a| a == node_id))
            .cloned()
            .collect())
    }
}
