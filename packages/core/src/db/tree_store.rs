//! TreeStore Trait - Persistence Abstraction for Category Trees
//!
//! This module defines the `TreeStore` trait that abstracts tenant-scoped
//! persistence of category records. The hierarchy engine only talks to this
//! trait, so any backend offering point lookups, filtered listing, an
//! "array contains value" predicate and an unordered batch update qualifies.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All methods are async so embedded and networked backends
//!    share one interface
//! 2. **Tenant Scoping**: Every read and write takes the tenant id; no method can
//!    observe another tenant's rows
//! 3. **Best-Effort Batches**: `bulk_update` is unordered and never rolls back;
//!    per-entry failures are reported in [`BulkWriteResult`]
//! 4. **Ownership Semantics**: Methods take ownership of records and patches to
//!    avoid unnecessary cloning
//!
//! # Examples
//!
//! ```rust,no_run
//! use catalog_core::db::{MemoryStore, TreeStore};
//! use catalog_core::models::{Category, TreeInfo};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store: Arc<dyn TreeStore> = Arc::new(MemoryStore::new());
//!
//!     let root = Category::new("tenant-1", "Drinks", "drinks", TreeInfo::root());
//!     let created = store.create(root).await?;
//!     let found = store.find_by_slug("tenant-1", "drinks").await?;
//!     assert_eq!(created.id, found.id);
//!     Ok(())
//! }
//! ```

use crate::db::error::StoreResult;
use crate::models::{Category, CategoryOutline, CategoryPatch, CategoryQuery, Page};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One entry of a batch update
#[derive(Debug, Clone, PartialEq)]
pub struct BulkUpdate {
    pub id: String,
    pub patch: CategoryPatch,
}

impl BulkUpdate {
    pub fn new(id: impl Into<String>, patch: CategoryPatch) -> Self {
        Self {
            id: id.into(),
            patch,
        }
    }
}

/// Per-entry failure of a batch update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkWriteFailure {
    pub id: String,
    pub reason: String,
}

/// Outcome of a batch update
///
/// `matched` counts entries that hit an existing row; `failures` lists the rest
/// together with any entry the backend rejected. A non-empty `failures` list is
/// the partial-result indicator surfaced to callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkWriteResult {
    pub requested: usize,
    pub matched: usize,
    pub failures: Vec<BulkWriteFailure>,
}

impl BulkWriteResult {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Abstraction layer for tenant-scoped category persistence
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the service holds them as
/// `Arc<dyn TreeStore>` across await points.
///
/// # Method Categories
///
/// - **Point lookups**: `find_by_id`, `find_by_slug`, `find_many`, `slug_exists`
/// - **Listing**: `list`, `list_all`, `load_outline`
/// - **Hierarchy**: `exists_child_of`, `find_descendants`
/// - **Writes**: `create`, `bulk_update`, `delete_one`
#[async_trait]
pub trait TreeStore: Send + Sync {
    //
    // WRITES
    //

    /// Persist a new category
    ///
    /// # Errors
    ///
    /// - `StoreError::DuplicateSlug` if `(tenant_id, slug)` is already taken. The
    ///   slug allocator normally prevents this; it can still happen when two
    ///   writers race.
    /// - `StoreError::DuplicateId` if the id already exists
    async fn create(&self, category: Category) -> StoreResult<Category>;

    /// Apply a batch of sparse patches
    ///
    /// Entries are independent and unordered. An entry whose id does not match a
    /// row in `tenant_id` is reported in `failures`; other entries are still
    /// applied. Nothing is rolled back.
    ///
    /// Backends that enforce slug uniqueness report an entry that would collide
    /// as a failure instead of aborting the batch.
    async fn bulk_update(
        &self,
        tenant_id: &str,
        updates: Vec<BulkUpdate>,
    ) -> StoreResult<BulkWriteResult>;

    /// Delete one category
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if no row matched.
    async fn delete_one(&self, tenant_id: &str, id: &str) -> StoreResult<()>;

    //
    // POINT LOOKUPS
    //

    /// Get a category by id, `StoreError::NotFound` if absent
    async fn find_by_id(&self, tenant_id: &str, id: &str) -> StoreResult<Category>;

    /// Get a category by slug, `StoreError::SlugNotFound` if absent
    async fn find_by_slug(&self, tenant_id: &str, slug: &str) -> StoreResult<Category>;

    /// Get every category whose id is in `ids`; missing ids are skipped and the
    /// result order is unspecified
    async fn find_many(&self, tenant_id: &str, ids: &[String]) -> StoreResult<Vec<Category>>;

    /// Whether `slug` is taken in the tenant by any row other than `exclude_id`
    async fn slug_exists(
        &self,
        tenant_id: &str,
        slug: &str,
        exclude_id: Option<&str>,
    ) -> StoreResult<bool>;

    //
    // LISTING
    //

    /// Filtered, sorted, paginated listing
    ///
    /// `limit` is the effective page size chosen by the caller (the query's own
    /// `limit` is advisory). Sorting follows [`CategoryQuery::effective_sort`].
    async fn list(
        &self,
        tenant_id: &str,
        query: &CategoryQuery,
        limit: usize,
    ) -> StoreResult<Page<Category>>;

    /// Every category of the tenant, unordered
    async fn list_all(&self, tenant_id: &str) -> StoreResult<Vec<Category>>;

    /// Lightweight projection of every category of the tenant, unordered
    async fn load_outline(&self, tenant_id: &str) -> StoreResult<Vec<CategoryOutline>>;

    //
    // HIERARCHY
    //

    /// Whether any category has `parent_id == parent_id`
    async fn exists_child_of(&self, tenant_id: &str, parent_id: &str) -> StoreResult<bool>;

    /// Every category whose `ancestors` contains `node_id`
    async fn find_descendants(&self, tenant_id: &str, node_id: &str)
        -> StoreResult<Vec<Category>>;
}
