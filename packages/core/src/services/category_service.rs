//! Category Service - Hierarchy Engine Operations
//!
//! This module provides the operations that mutate and read a tenant's
//! category tree, composed from the hierarchy components:
//!
//! - Create with slug allocation and tree position resolution
//! - Edit (rename, re-slug, re-parent) with descendant propagation
//! - Move with cycle rejection
//! - Reorder, availability toggle, guarded delete
//! - Detail, listing, children, breadcrumb and nested tree reads
//! - Consistency verification and repair
//!
//! # Consistency
//!
//! The mutated node's own record is written as a single-entry batch, so it is
//! either fully applied or rejected. Descendant rewrites are one best-effort
//! batch; a partial result surfaces as
//! [`CategoryServiceError::PartialPropagation`] and can be fixed later with
//! [`CategoryService::repair_tree`].
//!
//! When `serialize_structural_mutations` is enabled (default), every mutation
//! holds its tenant's lock for the full read-compute-write sequence. Reads
//! never lock.
//!
//! # Examples
//!
//! ```rust,no_run
//! use catalog_core::db::MemoryStore;
//! use catalog_core::models::CreateCategoryParams;
//! use catalog_core::services::CategoryService;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = CategoryService::new(Arc::new(MemoryStore::new()));
//!
//!     let drinks = service
//!         .create_category("tenant-1", CreateCategoryParams::new("Drinks"))
//!         .await?;
//!     let coffee = service
//!         .create_category(
//!             "tenant-1",
//!             CreateCategoryParams::new("Coffee").with_parent(drinks.id.clone()),
//!         )
//!         .await?;
//!     assert_eq!(coffee.path, "drinks/coffee");
//!     Ok(())
//! }
//! ```

use crate::config::CatalogConfig;
use crate::db::{BulkUpdate, BulkWriteResult, StoreError, TreeStore};
use crate::hierarchy::audit::{self, RepairReport, TreeViolation};
use crate::hierarchy::{
    CycleGuard, PathBuilder, ReparentPropagator, SlugAllocator, SubtreeShift, TreeAssembler,
};
use crate::models::{
    Category, CategoryPatch, CategoryQuery, CategoryTreeNode, CreateCategoryParams, Page,
    ReorderItem, UpdateCategoryParams, ValidationError,
};
use crate::services::error::{CategoryServiceError, ServiceResult};
use crate::services::tenant_locks::TenantLocks;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::instrument;

/// Turn a best-effort batch result into an error when anything was skipped
fn ensure_complete(result: BulkWriteResult) -> ServiceResult<BulkWriteResult> {
    if result.is_complete() {
        return Ok(result);
    }
    Err(CategoryServiceError::PartialPropagation {
        requested: result.requested,
        applied: result.matched,
        failures: result.failures,
    })
}

fn normalize_name(name: &str) -> ServiceResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField("name".to_string()).into());
    }
    Ok(trimmed.to_string())
}

/// Multi-tenant category tree operations over a [`TreeStore`]
pub struct CategoryService {
    store: Arc<dyn TreeStore>,
    config: CatalogConfig,
    locks: TenantLocks,
}

impl CategoryService {
    /// Service with default configuration
    pub fn new(store: Arc<dyn TreeStore>) -> Self {
        Self::with_config(store, CatalogConfig::default())
    }

    pub fn with_config(store: Arc<dyn TreeStore>, config: CatalogConfig) -> Self {
        Self {
            store,
            config,
            locks: TenantLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn TreeStore> {
        &self.store
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    async fn lock_tenant(&self, tenant_id: &str) -> Option<OwnedMutexGuard<()>> {
        if !self.config.serialize_structural_mutations {
            return None;
        }
        Some(self.locks.acquire(tenant_id).await)
    }

    //
    // CREATE
    //

    /// Create a category under `params.parent_id` (or as a root).
    ///
    /// The slug comes from `params.slug` if given, otherwise from the name,
    /// and is made unique within the tenant by appending `-2`, `-3`, ...
    ///
    /// # Errors
    ///
    /// - `Validation` if the trimmed name is empty
    /// - `ParentNotFound` if the parent does not exist in the tenant
    /// - `SlugConflict` if a concurrent writer took the slug first
    #[instrument(skip(self, params), fields(tenant_id = %tenant_id))]
    pub async fn create_category(
        &self,
        tenant_id: &str,
        params: CreateCategoryParams,
    ) -> ServiceResult<Category> {
        let _guard = self.lock_tenant(tenant_id).await;
        let store = self.store.as_ref();

        let name = normalize_name(&params.name)?;
        let tree = PathBuilder::new(store)
            .resolve(tenant_id, params.parent_id.as_deref())
            .await?;
        let candidate = params.slug.as_deref().unwrap_or(&name);
        let slug = SlugAllocator::new(store)
            .ensure_unique(tenant_id, candidate, None)
            .await?;

        let mut category = Category::new(tenant_id, name, slug, tree);
        category.description = params.description;
        category.image = params.image;
        category.is_active = params.is_active.unwrap_or(true);
        category.sort_index = params.sort_index.unwrap_or(0);
        category.items_count = params.items_count.unwrap_or(0);
        category.extra = params.extra;
        category.validate()?;

        let created = store.create(category).await?;
        tracing::info!(
            id = %created.id,
            slug = %created.slug,
            path = %created.path,
            "Created category"
        );
        Ok(created)
    }

    //
    // READ
    //

    pub async fn get_category(&self, tenant_id: &str, id: &str) -> ServiceResult<Category> {
        Ok(self.store.find_by_id(tenant_id, id).await?)
    }

    pub async fn get_by_slug(&self, tenant_id: &str, slug: &str) -> ServiceResult<Category> {
        Ok(self.store.find_by_slug(tenant_id, slug).await?)
    }

    /// Filtered, sorted page of categories.
    ///
    /// `query.limit` falls back to the configured default page size and is
    /// clamped to the configured maximum.
    pub async fn list_categories(
        &self,
        tenant_id: &str,
        query: &CategoryQuery,
    ) -> ServiceResult<Page<Category>> {
        let limit = self.config.page_size(query.limit);
        Ok(self.store.list(tenant_id, query, limit).await?)
    }

    /// Direct children of `parent_id` (roots when `None`), ordered by `(sort_index, name)`
    pub async fn children(
        &self,
        tenant_id: &str,
        parent_id: Option<&str>,
    ) -> ServiceResult<Vec<Category>> {
        let mut children: Vec<Category> = self
            .store
            .list_all(tenant_id)
            .await?
            .into_iter()
            .filter(|c| c.parent_id.as_deref() == parent_id)
            .collect();
        children.sort_by(|a, b| {
            a.sort_index
                .cmp(&b.sort_index)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(children)
    }

    /// Ancestors root-first followed by the category itself
    pub async fn breadcrumb(&self, tenant_id: &str, id: &str) -> ServiceResult<Vec<Category>> {
        let node = self.store.find_by_id(tenant_id, id).await?;
        let mut by_id: HashMap<String, Category> = self
            .store
            .find_many(tenant_id, &node.ancestors)
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        let mut trail: Vec<Category> = node
            .ancestors
            .iter()
            .filter_map(|ancestor_id| by_id.remove(ancestor_id))
            .collect();
        if trail.len() != node.ancestors.len() {
            tracing::warn!(
                tenant_id,
                id,
                expected = node.ancestors.len(),
                found = trail.len(),
                "Breadcrumb is missing ancestors"
            );
        }
        trail.push(node);
        Ok(trail)
    }

    /// Nested view of the tenant's tree, or of the forest below `root_parent_id`
    pub async fn build_tree(
        &self,
        tenant_id: &str,
        root_parent_id: Option<&str>,
    ) -> ServiceResult<Vec<CategoryTreeNode>> {
        Ok(TreeAssembler::new(self.store.as_ref())
            .build_tree(tenant_id, root_parent_id)
            .await?)
    }

    //
    // UPDATE / MOVE
    //

    /// Edit a category.
    ///
    /// - A new `name` without an explicit `slug` re-derives the slug
    /// - An explicit `slug` is normalized and made unique
    /// - A present `parent_id` moves the category (same rules as [`Self::move_category`])
    ///
    /// Whenever the path, ancestors or depth change, every descendant is rewritten.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the category does not exist
    /// - `Validation` if the new name is empty
    /// - `InvalidParent` / `ParentNotFound` for an invalid new parent
    /// - `PartialPropagation` if some descendants could not be rewritten; the
    ///   category itself has been updated in that case
    #[instrument(skip(self, params), fields(tenant_id = %tenant_id, id = %id))]
    pub async fn update_category(
        &self,
        tenant_id: &str,
        id: &str,
        params: UpdateCategoryParams,
    ) -> ServiceResult<Category> {
        let _guard = self.lock_tenant(tenant_id).await;
        self.apply_update(tenant_id, id, params).await
    }

    /// Move a category (and its subtree) under `new_parent_id`, or to the root level.
    ///
    /// # Errors
    ///
    /// - `InvalidParent` if the target is the category itself or one of its descendants
    /// - `ParentNotFound` if the target does not exist
    /// - `PartialPropagation` if some descendants could not be rewritten
    #[instrument(skip(self), fields(tenant_id = %tenant_id, id = %id))]
    pub async fn move_category(
        &self,
        tenant_id: &str,
        id: &str,
        new_parent_id: Option<&str>,
    ) -> ServiceResult<Category> {
        let _guard = self.lock_tenant(tenant_id).await;
        let params = UpdateCategoryParams::new().with_parent(new_parent_id.map(str::to_string));
        self.apply_update(tenant_id, id, params).await
    }

    async fn apply_update(
        &self,
        tenant_id: &str,
        id: &str,
        params: UpdateCategoryParams,
    ) -> ServiceResult<Category> {
        let store = self.store.as_ref();
        let current = store.find_by_id(tenant_id, id).await?;
        if params.is_empty() {
            return Ok(current);
        }

        let name = params.name.as_deref().map(normalize_name).transpose()?;
        let name_changed = name.as_ref().is_some_and(|n| n != &current.name);

        let allocator = SlugAllocator::new(store);
        let slug = match (&params.slug, &name) {
            (Some(explicit), _) => {
                allocator
                    .ensure_unique(tenant_id, explicit, Some(id))
                    .await?
            }
            (None, Some(new_name)) if name_changed => {
                allocator
                    .ensure_unique(tenant_id, new_name, Some(id))
                    .await?
            }
            _ => current.slug.clone(),
        };

        let reparent = match &params.parent_id {
            Some(new_parent) if new_parent != &current.parent_id => Some(new_parent.as_deref()),
            _ => None,
        };
        let tree = match reparent {
            Some(new_parent) => {
                CycleGuard::new(store)
                    .assert_no_cycle(tenant_id, id, new_parent)
                    .await?;
                PathBuilder::new(store).resolve(tenant_id, new_parent).await?
            }
            None => current.tree_info(),
        };

        let mut patch = CategoryPatch {
            name,
            description: params.description.clone(),
            image: params.image.clone(),
            is_active: params.is_active,
            sort_index: params.sort_index,
            extra: params.extra.clone(),
            ..Default::default()
        };
        if slug != current.slug {
            patch.slug = Some(slug.clone());
        }
        let path = tree.path_for(&slug);
        if reparent.is_some() || path != current.path {
            patch.parent_id = Some(tree.parent_id.clone());
            patch.ancestors = Some(tree.ancestors.clone());
            patch.depth = Some(tree.depth);
            patch.path = Some(path);
        }

        if patch.is_empty() {
            return Ok(current);
        }

        let mut updated = current.clone();
        updated.apply_patch(&patch);

        self.write_own(tenant_id, id, patch).await?;

        let shift = SubtreeShift::between(&current, &updated);
        if !shift.is_noop() {
            tracing::info!(
                old_path = %shift.old_path,
                new_path = %shift.new_path,
                old_depth = shift.old_depth,
                new_depth = shift.new_depth,
                "Category position changed, propagating to descendants"
            );
            let result = ReparentPropagator::new(store)
                .propagate(tenant_id, &shift)
                .await?;
            ensure_complete(result)?;
        }

        Ok(store.find_by_id(tenant_id, id).await?)
    }

    /// Write one record's patch, translating a rejected entry into a service error.
    async fn write_own(&self, tenant_id: &str, id: &str, patch: CategoryPatch) -> ServiceResult<()> {
        let new_slug = patch.slug.clone();
        let result = self
            .store
            .bulk_update(tenant_id, vec![BulkUpdate::new(id, patch)])
            .await?;

        let Some(failure) = result.failures.into_iter().next() else {
            return Ok(());
        };

        match self.store.find_by_id(tenant_id, id).await {
            Err(StoreError::NotFound { .. }) => return Err(CategoryServiceError::not_found(id)),
            Err(e) => return Err(e.into()),
            Ok(_) => {}
        }
        if let Some(slug) = new_slug {
            if self.store.slug_exists(tenant_id, &slug, Some(id)).await? {
                return Err(CategoryServiceError::SlugConflict { slug });
            }
        }
        Err(StoreError::backend(format!(
            "update of category {} rejected: {}",
            failure.id, failure.reason
        ))
        .into())
    }

    //
    // REORDER / TOGGLE
    //

    /// Set `sort_index` for each listed category in one batch.
    ///
    /// Tree fields are never touched. Applying the same payload twice yields
    /// the same values. An empty payload is a no-op.
    ///
    /// # Errors
    ///
    /// `PartialPropagation` listing the entries that did not apply (e.g. ids
    /// not present in the tenant); all other entries are still written.
    #[instrument(skip(self, items), fields(tenant_id = %tenant_id, count = items.len()))]
    pub async fn reorder(
        &self,
        tenant_id: &str,
        items: Vec<ReorderItem>,
    ) -> ServiceResult<BulkWriteResult> {
        if items.is_empty() {
            return Ok(BulkWriteResult::default());
        }
        let _guard = self.lock_tenant(tenant_id).await;

        let updates = items
            .into_iter()
            .map(|item| BulkUpdate::new(item.id, CategoryPatch::sort_index(item.sort_index)))
            .collect();
        let result = self.store.bulk_update(tenant_id, updates).await?;
        tracing::debug!(
            requested = result.requested,
            matched = result.matched,
            "Reordered categories"
        );
        ensure_complete(result)
    }

    /// Toggle availability; tree fields are untouched
    #[instrument(skip(self), fields(tenant_id = %tenant_id, id = %id))]
    pub async fn set_active(
        &self,
        tenant_id: &str,
        id: &str,
        is_active: bool,
    ) -> ServiceResult<Category> {
        let _guard = self.lock_tenant(tenant_id).await;

        let current = self.store.find_by_id(tenant_id, id).await?;
        if current.is_active == is_active {
            return Ok(current);
        }

        let patch = CategoryPatch {
            is_active: Some(is_active),
            ..Default::default()
        };
        self.write_own(tenant_id, id, patch).await?;
        Ok(self.store.find_by_id(tenant_id, id).await?)
    }

    //
    // DELETE
    //

    /// Delete a leaf category.
    ///
    /// Only child categories block deletion; catalog items referencing the
    /// category are not checked.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the category does not exist
    /// - `HasChildren` if any category has it as parent
    #[instrument(skip(self), fields(tenant_id = %tenant_id, id = %id))]
    pub async fn delete_category(&self, tenant_id: &str, id: &str) -> ServiceResult<()> {
        let _guard = self.lock_tenant(tenant_id).await;

        if self.store.exists_child_of(tenant_id, id).await? {
            return Err(CategoryServiceError::has_children(id));
        }
        self.store.delete_one(tenant_id, id).await?;

        tracing::info!("Deleted category");
        Ok(())
    }

    //
    // AUDIT
    //

    /// Every violated tree rule in the tenant, recomputed from parent pointers
    pub async fn verify_tree(&self, tenant_id: &str) -> ServiceResult<Vec<TreeViolation>> {
        let categories = self.store.list_all(tenant_id).await?;
        Ok(audit::verify(&categories))
    }

    /// Rewrite stale `ancestors`/`depth`/`path` for every node reachable from a root.
    ///
    /// Nodes whose parent chain is broken (missing parent, cycle) are reported
    /// in `unreachable` and left as they are.
    ///
    /// # Errors
    ///
    /// `PartialPropagation` if some rewrites did not apply.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn repair_tree(&self, tenant_id: &str) -> ServiceResult<RepairReport> {
        let _guard = self.lock_tenant(tenant_id).await;

        let categories = self.store.list_all(tenant_id).await?;
        let (updates, unreachable) = audit::plan_repair(&categories);
        if !unreachable.is_empty() {
            tracing::warn!(
                count = unreachable.len(),
                ids = ?unreachable,
                "Categories not reachable from any root were left untouched"
            );
        }

        let mut updated: Vec<String> = updates.iter().map(|u| u.id.clone()).collect();
        if !updates.is_empty() {
            let result = self.store.bulk_update(tenant_id, updates).await?;
            let result = ensure_complete(result)?;
            tracing::info!(updated = result.matched, "Repaired category tree");
        }
        updated.sort();

        Ok(RepairReport {
            updated,
            unreachable,
        })
    }
}

// Comprehensive tests in separate module
#[cfg(test)]
#[path = "category_service_test.rs"]
mod category_service_test;
