//! SurrealStore - TreeStore Implementation for SurrealDB Backend
//!
//! Embedded SurrealDB (RocksDB engine) backend for category trees.
//!
//! # Schema
//!
//! - `category` table, SCHEMALESS, record id `category:<uuid>`
//! - UNIQUE index on `(tenant_id, slug)` backs slug uniqueness
//! - Index on `(tenant_id, parent_id)` for child lookups
//!
//! Descendant lookups use the `CONTAINS` array predicate on `ancestors`.
//! Batch updates are sent as one multi-statement query of independent
//! `UPDATE .. MERGE` statements, so one failing entry does not abort the others.
//!
//! # Examples
//!
//! ```rust,no_run
//! use catalog_core::db::{SurrealStore, TreeStore};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = SurrealStore::new(PathBuf::from("./data/catalog.db")).await?;
//!     let roots = store.list_all("tenant-1").await?;
//!     println!("{} categories", roots.len());
//!     Ok(())
//! }
//! ```

use crate::db::error::{StoreError, StoreResult};
use crate::db::tree_store::{BulkUpdate, BulkWriteFailure, BulkWriteResult, TreeStore};
use crate::models::{
    Category, CategoryOutline, CategoryPatch, CategoryQuery, Page, ParentFilter, SortDirection,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use surrealdb::engine::local::{Db, RocksDb};
use surrealdb::Surreal;

const TABLE: &str = "category";

/// Stored shape of a category ('uuid' carries our id, the record id is derived from it)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SurrealCategory {
    uuid: String,
    tenant_id: String,
    name: String,
    slug: String,
    description: Option<String>,
    image: Option<String>,
    parent_id: Option<String>,
    #[serde(default)]
    ancestors: Vec<String>,
    depth: u32,
    path: String,
    is_active: bool,
    sort_index: i64,
    items_count: i64,
    #[serde(default)]
    extra: Map<String, Value>,
    created_at: String,
    updated_at: String,
}

impl From<Category> for SurrealCategory {
    fn from(c: Category) -> Self {
        Self {
            uuid: c.id,
            tenant_id: c.tenant_id,
            name: c.name,
            slug: c.slug,
            description: c.description,
            image: c.image,
            parent_id: c.parent_id,
            ancestors: c.ancestors,
            depth: c.depth,
            path: c.path,
            is_active: c.is_active,
            sort_index: c.sort_index,
            items_count: c.items_count,
            extra: c.extra,
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.to_rfc3339(),
        }
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl From<SurrealCategory> for Category {
    fn from(sc: SurrealCategory) -> Self {
        Category {
            id: sc.uuid,
            tenant_id: sc.tenant_id,
            name: sc.name,
            slug: sc.slug,
            description: sc.description,
            image: sc.image,
            parent_id: sc.parent_id,
            ancestors: sc.ancestors,
            depth: sc.depth,
            path: sc.path,
            is_active: sc.is_active,
            sort_index: sc.sort_index,
            items_count: sc.items_count,
            extra: sc.extra,
            created_at: parse_timestamp(&sc.created_at),
            updated_at: parse_timestamp(&sc.updated_at),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OutlineRow {
    uuid: String,
    name: String,
    slug: String,
    parent_id: Option<String>,
    sort_index: i64,
    is_active: bool,
}

impl From<OutlineRow> for CategoryOutline {
    fn from(row: OutlineRow) -> Self {
        Self {
            id: row.uuid,
            name: row.name,
            slug: row.slug,
            parent_id: row.parent_id,
            sort_index: row.sort_index,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UuidRow {
    #[allow(dead_code)]
    uuid: String,
}

#[derive(Debug, Deserialize)]
struct CountRow {
    total: usize,
}

/// Convert a storage patch into a MERGE object with stored field names.
fn patch_to_merge(patch: &CategoryPatch) -> Map<String, Value> {
    let mut merge = Map::new();
    let mut set = |key: &str, value: Value| {
        merge.insert(key.to_string(), value);
    };

    if let Some(name) = &patch.name {
        set("name", Value::from(name.clone()));
    }
    if let Some(slug) = &patch.slug {
        set("slug", Value::from(slug.clone()));
    }
    if let Some(description) = &patch.description {
        set("description", description.clone().map(Value::from).unwrap_or(Value::Null));
    }
    if let Some(image) = &patch.image {
        set("image", image.clone().map(Value::from).unwrap_or(Value::Null));
    }
    if let Some(parent_id) = &patch.parent_id {
        set("parent_id", parent_id.clone().map(Value::from).unwrap_or(Value::Null));
    }
    if let Some(ancestors) = &patch.ancestors {
        set("ancestors", Value::from(ancestors.clone()));
    }
    if let Some(depth) = patch.depth {
        set("depth", Value::from(depth));
    }
    if let Some(path) = &patch.path {
        set("path", Value::from(path.clone()));
    }
    if let Some(is_active) = patch.is_active {
        set("is_active", Value::from(is_active));
    }
    if let Some(sort_index) = patch.sort_index {
        set("sort_index", Value::from(sort_index));
    }
    if let Some(items_count) = patch.items_count {
        set("items_count", Value::from(items_count));
    }
    if let Some(extra) = &patch.extra {
        set("extra", Value::Object(extra.clone()));
    }
    set("updated_at", Value::from(Utc::now().to_rfc3339()));

    merge
}

/// WHERE clause (without the keyword) for a listing query
fn list_conditions(query: &CategoryQuery) -> Vec<&'static str> {
    let mut conditions = vec!["tenant_id = $tenant_id"];
    if query.is_active.is_some() {
        conditions.push("is_active = $is_active");
    }
    match &query.parent {
        Some(ParentFilter::Root) => conditions.push("(parent_id IS NONE OR parent_id IS NULL)"),
        Some(ParentFilter::Id(_)) => conditions.push("parent_id = $parent_id"),
        None => {}
    }
    if query.search.as_deref().map(str::trim).is_some_and(|s| !s.is_empty()) {
        conditions.push(
            "(string::lowercase(name) CONTAINS $search \
             OR string::lowercase(description ?? '') CONTAINS $search)",
        );
    }
    conditions
}

fn order_clause(query: &CategoryQuery) -> String {
    query
        .effective_sort()
        .iter()
        .map(|spec| {
            let direction = match spec.direction {
                SortDirection::Asc => "ASC",
                SortDirection::Desc => "DESC",
            };
            format!("{} {}", spec.field.column(), direction)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// SurrealStore implements TreeStore for the SurrealDB embedded backend
pub struct SurrealStore {
    db: Arc<Surreal<Db>>,
}

impl SurrealStore {
    /// Open (or create) an embedded RocksDB database and initialize the schema
    ///
    /// # Errors
    ///
    /// Returns error if the RocksDB engine cannot be opened or schema setup fails.
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        let db = Surreal::new::<RocksDb>(db_path)
            .await
            .context("Failed to initialize SurrealDB with RocksDB backend")?;

        db.use_ns("catalog")
            .use_db("categories")
            .await
            .context("Failed to set namespace/database")?;

        let db = Arc::new(db);
        Self::initialize_schema(&db).await?;

        Ok(Self { db })
    }

    async fn initialize_schema(db: &Surreal<Db>) -> Result<()> {
        db.query(
            "
            DEFINE TABLE IF NOT EXISTS category SCHEMALESS;
            DEFINE INDEX IF NOT EXISTS category_tenant_slug ON TABLE category FIELDS tenant_id, slug UNIQUE;
            DEFINE INDEX IF NOT EXISTS category_tenant_parent ON TABLE category FIELDS tenant_id, parent_id;
            DEFINE INDEX IF NOT EXISTS category_tenant_uuid ON TABLE category FIELDS tenant_id, uuid UNIQUE;
            ",
        )
        .await
        .context("Failed to create category table and indexes")?
        .check()
        .context("Failed to create category table and indexes")?;

        Ok(())
    }

    async fn select_where(
        &self,
        condition: &'static str,
        tenant_id: &str,
        binding: (&'static str, String),
    ) -> StoreResult<Vec<Category>> {
        let sql = format!("SELECT * FROM {} WHERE tenant_id = $tenant_id AND {};", TABLE, condition);
        let mut response = self
            .db
            .query(sql)
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(binding)
            .await
            .context("Failed to query categories")?;

        let rows: Vec<SurrealCategory> = response
            .take(0)
            .context("Failed to extract query results")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl TreeStore for SurrealStore {
    async fn create(&self, category: Category) -> StoreResult<Category> {
        if self
            .slug_exists(&category.tenant_id, &category.slug, None)
            .await?
        {
            return Err(StoreError::duplicate_slug(
                category.tenant_id.clone(),
                category.slug.clone(),
            ));
        }

        let record = SurrealCategory::from(category.clone());
        let mut response = self
            .db
            .query("CREATE type::thing($table, $id) CONTENT $record;")
            .bind(("table", TABLE))
            .bind(("id", category.id.clone()))
            .bind(("record", record))
            .await
            .context("Failed to create category")?;

        let created: surrealdb::Result<Vec<SurrealCategory>> = response.take(0);
        match created {
            Ok(_) => Ok(category),
            // The unique index catches a racing writer that passed the pre-check
            Err(e) if e.to_string().contains("category_tenant_slug") => Err(
                StoreError::duplicate_slug(category.tenant_id.clone(), category.slug.clone()),
            ),
            Err(e) if e.to_string().contains("already exists") => {
                Err(StoreError::DuplicateId { id: category.id })
            }
            Err(e) => Err(StoreError::Backend(
                anyhow::Error::new(e).context("Failed to create category"),
            )),
        }
    }

    async fn bulk_update(
        &self,
        tenant_id: &str,
        updates: Vec<BulkUpdate>,
    ) -> StoreResult<BulkWriteResult> {
        let mut result = BulkWriteResult {
            requested: updates.len(),
            ..Default::default()
        };
        if updates.is_empty() {
            return Ok(result);
        }

        let sql: String = (0..updates.len())
            .map(|i| {
                format!(
                    "UPDATE {} MERGE $patch{i} WHERE tenant_id = $tenant_id AND uuid = $uuid{i} RETURN AFTER;\n",
                    TABLE
                )
            })
            .collect();

        let mut builder = self
            .db
            .query(sql)
            .bind(("tenant_id", tenant_id.to_string()));
        for (i, update) in updates.iter().enumerate() {
            builder = builder
                .bind((format!("uuid{}", i), update.id.clone()))
                .bind((format!("patch{}", i), Value::Object(patch_to_merge(&update.patch))));
        }

        let mut response = builder
            .await
            .context("Failed to submit batch update")?;

        for (i, update) in updates.into_iter().enumerate() {
            let taken: surrealdb::Result<Vec<SurrealCategory>> = response.take(i);
            match taken {
                Ok(rows) if !rows.is_empty() => result.matched += 1,
                Ok(_) => result.failures.push(BulkWriteFailure {
                    id: update.id,
                    reason: "no matching category".to_string(),
                }),
                Err(e) => result.failures.push(BulkWriteFailure {
                    id: update.id,
                    reason: e.to_string(),
                }),
            }
        }

        Ok(result)
    }

    async fn delete_one(&self, tenant_id: &str, id: &str) -> StoreResult<()> {
        let mut response = self
            .db
            .query("DELETE category WHERE tenant_id = $tenant_id AND uuid = $uuid RETURN BEFORE;")
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("uuid", id.to_string()))
            .await
            .context("Failed to delete category")?;

        let deleted: Vec<SurrealCategory> = response
            .take(0)
            .context("Failed to extract delete results")?;
        if deleted.is_empty() {
            return Err(StoreError::not_found(tenant_id, id));
        }
        Ok(())
    }

    async fn find_by_id(&self, tenant_id: &str, id: &str) -> StoreResult<Category> {
        self.select_where("uuid = $uuid LIMIT 1", tenant_id, ("uuid", id.to_string()))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::not_found(tenant_id, id))
    }

    async fn find_by_slug(&self, tenant_id: &str, slug: &str) -> StoreResult<Category> {
        self.select_where("slug = $slug LIMIT 1", tenant_id, ("slug", slug.to_string()))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::slug_not_found(tenant_id, slug))
    }

    async fn find_many(&self, tenant_id: &str, ids: &[String]) -> StoreResult<Vec<Category>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut response = self
            .db
            .query("SELECT * FROM category WHERE tenant_id = $tenant_id AND uuid IN $ids;")
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("ids", ids.to_vec()))
            .await
            .context("Failed to query categories by id")?;

        let rows: Vec<SurrealCategory> = response
            .take(0)
            .context("Failed to extract query results")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn slug_exists(
        &self,
        tenant_id: &str,
        slug: &str,
        exclude_id: Option<&str>,
    ) -> StoreResult<bool> {
        let mut response = self
            .db
            .query(
                "SELECT uuid FROM category WHERE tenant_id = $tenant_id AND slug = $slug \
                 AND uuid != $exclude LIMIT 1;",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("slug", slug.to_string()))
            .bind(("exclude", exclude_id.unwrap_or_default().to_string()))
            .await
            .context("Failed to look up slug")?;

        let rows: Vec<UuidRow> = response
            .take(0)
            .context("Failed to extract slug lookup")?;
        Ok(!rows.is_empty())
    }

    async fn list(
        &self,
        tenant_id: &str,
        query: &CategoryQuery,
        limit: usize,
    ) -> StoreResult<Page<Category>> {
        let where_clause = list_conditions(query).join(" AND ");
        let sql = format!(
            "SELECT * FROM {table} WHERE {cond} ORDER BY {order} LIMIT $limit START $start;
             SELECT count() AS total FROM {table} WHERE {cond} GROUP ALL;",
            table = TABLE,
            cond = where_clause,
            order = order_clause(query),
        );

        let mut builder = self
            .db
            .query(sql)
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("limit", limit))
            .bind(("start", query.offset(limit).min(i64::MAX as usize)));
        if let Some(is_active) = query.is_active {
            builder = builder.bind(("is_active", is_active));
        }
        if let Some(ParentFilter::Id(parent_id)) = &query.parent {
            builder = builder.bind(("parent_id", parent_id.clone()));
        }
        if let Some(search) = &query.search {
            builder = builder.bind(("search", search.trim().to_lowercase()));
        }

        let mut response = builder.await.context("Failed to list categories")?;
        let rows: Vec<SurrealCategory> = response
            .take(0)
            .context("Failed to extract listing")?;
        let counts: Vec<CountRow> = response.take(1).context("Failed to extract count")?;

        Ok(Page {
            items: rows.into_iter().map(Into::into).collect(),
            total: counts.first().map(|c| c.total).unwrap_or(0),
            page: query.page_number(),
            limit,
        })
    }

    async fn list_all(&self, tenant_id: &str) -> StoreResult<Vec<Category>> {
        let mut response = self
            .db
            .query("SELECT * FROM category WHERE tenant_id = $tenant_id;")
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .context("Failed to list categories")?;

        let rows: Vec<SurrealCategory> = response
            .take(0)
            .context("Failed to extract listing")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn load_outline(&self, tenant_id: &str) -> StoreResult<Vec<CategoryOutline>> {
        let mut response = self
            .db
            .query(
                "SELECT uuid, name, slug, parent_id, sort_index, is_active \
                 FROM category WHERE tenant_id = $tenant_id;",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .context("Failed to load category outline")?;

        let rows: Vec<OutlineRow> = response
            .take(0)
            .context("Failed to extract outline")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn exists_child_of(&self, tenant_id: &str, parent_id: &str) -> StoreResult<bool> {
        let mut response = self
            .db
            .query(
                "SELECT uuid FROM category WHERE tenant_id = $tenant_id \
                 AND parent_id = $parent_id LIMIT 1;",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("parent_id", parent_id.to_string()))
            .await
            .context("Failed to look up children")?;

        let rows: Vec<UuidRow> = response
            .take(0)
            .context("Failed to extract child lookup")?;
        Ok(!rows.is_empty())
    }

    async fn find_descendants(
        &self,
        tenant_id: &str,
        node_id: &str,
    ) -> StoreResult<Vec<Category>> {
        self.select_where(
            "ancestors CONTAINS $node_id",
            tenant_id,
            ("node_id", node_id.to_string()),
        )
        .await
    }
}
