//! Category Data Structures
//!
//! This module defines the `Category` record and the parameter/patch types used
//! to mutate it.
//!
//! # Architecture
//!
//! - **Flat records**: The tree is stored as rows with a `parent_id` pointer plus
//!   derived fields (`ancestors`, `depth`, `path`). There is no in-memory pointer graph.
//! - **Tenant scoped**: Every record carries a `tenant_id`; slugs are unique per tenant.
//! - **Materialized path**: `path` is the slash-joined slugs of the ancestor chain
//!   followed by the record's own slug.
//!
//! # Examples
//!
//! ```rust
//! use catalog_core::models::{Category, TreeInfo};
//!
//! let root = Category::new("tenant-1", "Drinks", "drinks", TreeInfo::root());
//! assert_eq!(root.path, "drinks");
//! assert!(root.is_root());
//!
//! let child = Category::new("tenant-1", "Coffee", "coffee", TreeInfo::child_of(&root));
//! assert_eq!(child.path, "drinks/coffee");
//! assert_eq!(child.ancestors, vec![root.id.clone()]);
//! assert_eq!(child.depth, 1);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for Category operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid slug: {0}")]
    InvalidSlug(String),

    #[error("Invalid parent reference: {0}")]
    InvalidParent(String),

    #[error("Inconsistent tree fields: {0}")]
    InconsistentTree(String),
}

/// Tree position computed for a node from its intended parent.
///
/// Produced by the path builder; consumed when creating or moving a category.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TreeInfo {
    /// Parent id, `None` for roots
    pub parent_id: Option<String>,
    /// Ancestor ids, root first, ending with `parent_id`
    pub ancestors: Vec<String>,
    /// Always `ancestors.len()`
    pub depth: u32,
    /// Parent path followed by `/`, empty for roots
    pub path_prefix: String,
}

impl TreeInfo {
    /// Position of a root node
    pub fn root() -> Self {
        Self::default()
    }

    /// Position of a direct child of `parent`
    pub fn child_of(parent: &Category) -> Self {
        let mut ancestors = parent.ancestors.clone();
        ancestors.push(parent.id.clone());
        Self {
            parent_id: Some(parent.id.clone()),
            ancestors,
            depth: parent.depth + 1,
            path_prefix: format!("{}/", parent.path),
        }
    }

    /// Full path for a node with `slug` at this position
    pub fn path_for(&self, slug: &str) -> String {
        format!("{}{}", self.path_prefix, slug)
    }
}

/// One node of a tenant's category tree.
///
/// # Fields
///
/// - `id`: Unique identifier (UUID v4)
/// - `tenant_id`: Isolation boundary; all lookups and mutations are scoped by it
/// - `name` / `slug`: Display name and URL-safe key (slug unique per tenant)
/// - `parent_id` / `ancestors` / `depth` / `path`: Tree position (see module docs)
/// - `is_active`: Availability flag, independent of tree shape
/// - `sort_index`: Sibling ordering key
/// - `items_count`: Denormalized count of catalog items, only initialized here
/// - `extra`: Opaque passthrough map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,

    pub tenant_id: String,

    pub name: String,

    pub slug: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Parent category ID (`None` means this category is a root)
    pub parent_id: Option<String>,

    /// Ancestor IDs, root first. Last element equals `parent_id`.
    #[serde(default)]
    pub ancestors: Vec<String>,

    /// Number of ancestors
    #[serde(default)]
    pub depth: u32,

    /// Slash-joined ancestor slugs followed by own slug
    pub path: String,

    #[serde(default = "default_active")]
    pub is_active: bool,

    #[serde(default)]
    pub sort_index: i64,

    #[serde(default)]
    pub items_count: i64,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Category {
    /// Create a new active category with a generated UUID at the given tree position.
    pub fn new(
        tenant_id: impl Into<String>,
        name: impl Into<String>,
        slug: impl Into<String>,
        tree: TreeInfo,
    ) -> Self {
        let slug = slug.into();
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            name: name.into().trim().to_string(),
            path: tree.path_for(&slug),
            slug,
            description: None,
            image: None,
            parent_id: tree.parent_id,
            ancestors: tree.ancestors,
            depth: tree.depth,
            is_active: true,
            sort_index: 0,
            items_count: 0,
            extra: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether this category is a root (no parent)
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Current tree position of this category, as seen by its own children.
    pub fn tree_info(&self) -> TreeInfo {
        TreeInfo {
            parent_id: self.parent_id.clone(),
            ancestors: self.ancestors.clone(),
            depth: self.depth,
            path_prefix: match self.path.rfind('/') {
                Some(idx) => self.path[..=idx].to_string(),
                None => String::new(),
            },
        }
    }

    /// Validate the record's own fields.
    ///
    /// Checks everything that can be decided without looking at other records:
    /// required fields, slug shape, self-parenting, and the local relations
    /// between `parent_id`, `ancestors`, `depth` and `path`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingField("id".to_string()));
        }
        if self.tenant_id.is_empty() {
            return Err(ValidationError::MissingField("tenantId".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name".to_string()));
        }
        if !crate::hierarchy::slug::is_valid_slug(&self.slug) {
            return Err(ValidationError::InvalidSlug(self.slug.clone()));
        }

        if let Some(parent_id) = &self.parent_id {
            if parent_id == &self.id {
                return Err(ValidationError::InvalidParent(
                    "Category cannot be its own parent".to_string(),
                ));
            }
        }
        if self.ancestors.iter().any(|a| a == &self.id) {
            return Err(ValidationError::InvalidParent(
                "Category cannot be its own ancestor".to_string(),
            ));
        }

        if self.ancestors.last() != self.parent_id.as_ref() {
            return Err(ValidationError::InconsistentTree(format!(
                "last ancestor {:?} does not match parent {:?}",
                self.ancestors.last(),
                self.parent_id
            )));
        }
        if self.depth as usize != self.ancestors.len() {
            return Err(ValidationError::InconsistentTree(format!(
                "depth {} does not match {} ancestors",
                self.depth,
                self.ancestors.len()
            )));
        }
        let segments = self.path.split('/').count();
        let last_segment = self.path.rsplit('/').next();
        if segments != self.ancestors.len() + 1 || last_segment != Some(self.slug.as_str()) {
            return Err(ValidationError::InconsistentTree(format!(
                "path '{}' does not end with slug '{}' at depth {}",
                self.path, self.slug, self.depth
            )));
        }

        Ok(())
    }

    /// Apply a sparse patch in place and bump `updated_at`.
    pub fn apply_patch(&mut self, patch: &CategoryPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(slug) = &patch.slug {
            self.slug = slug.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(image) = &patch.image {
            self.image = image.clone();
        }
        if let Some(parent_id) = &patch.parent_id {
            self.parent_id = parent_id.clone();
        }
        if let Some(ancestors) = &patch.ancestors {
            self.ancestors = ancestors.clone();
        }
        if let Some(depth) = patch.depth {
            self.depth = depth;
        }
        if let Some(path) = &patch.path {
            self.path = path.clone();
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        if let Some(sort_index) = patch.sort_index {
            self.sort_index = sort_index;
        }
        if let Some(items_count) = patch.items_count {
            self.items_count = items_count;
        }
        if let Some(extra) = &patch.extra {
            self.extra = extra.clone();
        }
        self.updated_at = Utc::now();
    }
}

/// Accept both plain values and `null` for double-Option fields.
///
/// - Missing field → `None` (don't update)
/// - `null` → `Some(None)` (clear)
/// - `"value"` → `Some(Some("value"))` (set)
fn deserialize_optional_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

/// Sparse update applied by the store.
///
/// This is the storage-level patch: it can touch derived tree fields and is
/// what `bulk_update` carries. Client-facing edits go through
/// [`UpdateCategoryParams`] instead, which never exposes `ancestors`, `depth`
/// or `path`.
///
/// Nullable fields use the double-`Option` pattern:
///
/// - `None`: leave unchanged
/// - `Some(None)`: set to null
/// - `Some(Some(v))`: set to `v`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub description: Option<Option<String>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub image: Option<Option<String>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub parent_id: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ancestors: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_index: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_count: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Map<String, Value>>,
}

impl CategoryPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch that only moves the record to a new tree position with a new path.
    pub fn tree_fields(ancestors: Vec<String>, depth: u32, path: String) -> Self {
        Self {
            ancestors: Some(ancestors),
            depth: Some(depth),
            path: Some(path),
            ..Default::default()
        }
    }

    /// Patch that only changes the sibling ordering key.
    pub fn sort_index(sort_index: i64) -> Self {
        Self {
            sort_index: Some(sort_index),
            ..Default::default()
        }
    }

    /// Check if the patch contains any changes
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.slug.is_none()
            && self.description.is_none()
            && self.image.is_none()
            && self.parent_id.is_none()
            && self.ancestors.is_none()
            && self.depth.is_none()
            && self.path.is_none()
            && self.is_active.is_none()
            && self.sort_index.is_none()
            && self.items_count.is_none()
            && self.extra.is_none()
    }
}

/// Parameters for creating a category
///
/// # Examples
///
/// ```rust
/// # use catalog_core::models::CreateCategoryParams;
/// let params = CreateCategoryParams::new("Hot Drinks")
///     .with_parent("parent-id")
///     .with_slug("hot");
/// assert_eq!(params.slug.as_deref(), Some("hot"));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryParams {
    pub name: String,

    /// Parent category, `None` to create a root
    #[serde(default)]
    pub parent_id: Option<String>,

    /// Slug hint; the name is slugified when absent
    #[serde(default)]
    pub slug: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub image: Option<String>,

    /// Defaults to `true`
    #[serde(default)]
    pub is_active: Option<bool>,

    #[serde(default)]
    pub sort_index: Option<i64>,

    #[serde(default)]
    pub items_count: Option<i64>,

    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl CreateCategoryParams {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_sort_index(mut self, sort_index: i64) -> Self {
        self.sort_index = Some(sort_index);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Client-facing edit of a category.
///
/// A change of `name` without an explicit `slug` re-derives the slug.
/// A present `parent_id` moves the category (`Some(None)` moves it to the root level).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub description: Option<Option<String>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub image: Option<Option<String>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub parent_id: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_index: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Map<String, Value>>,
}

impl UpdateCategoryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_parent(mut self, parent_id: Option<String>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.slug.is_none()
            && self.description.is_none()
            && self.image.is_none()
            && self.parent_id.is_none()
            && self.is_active.is_none()
            && self.sort_index.is_none()
            && self.extra.is_none()
    }
}

/// One entry of a reorder request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderItem {
    pub id: String,
    pub sort_index: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_root_and_child_positions() {
        let root = Category::new("t1", "  Food  ", "food", TreeInfo::root());
        assert_eq!(root.name, "Food");
        assert_eq!(root.path, "food");
        assert_eq!(root.depth, 0);
        assert!(root.validate().is_ok());

        let child = Category::new("t1", "Pizza", "pizza", TreeInfo::child_of(&root));
        assert_eq!(child.parent_id.as_deref(), Some(root.id.as_str()));
        assert_eq!(child.path, "food/pizza");
        assert!(child.validate().is_ok());

        let info = child.tree_info();
        assert_eq!(info.path_prefix, "food/");
        assert_eq!(info.ancestors, vec![root.id.clone()]);
    }

    #[test]
    fn test_validate_rejects_self_parent() {
        let mut node = Category::new("t1", "Loop", "loop", TreeInfo::root());
        node.parent_id = Some(node.id.clone());
        node.ancestors = vec![node.id.clone()];
        node.depth = 1;
        node.path = "loop/loop".to_string();
        assert!(matches!(
            node.validate(),
            Err(ValidationError::InvalidParent(_))
        ));
    }

    #[test]
    fn test_validate_rejects_depth_mismatch() {
        let mut node = Category::new("t1", "Food", "food", TreeInfo::root());
        node.depth = 3;
        assert!(matches!(
            node.validate(),
            Err(ValidationError::InconsistentTree(_))
        ));
    }

    #[test]
    fn test_apply_patch_clears_nullable_fields() {
        let mut node = Category::new("t1", "Food", "food", TreeInfo::root());
        node.description = Some("tasty".to_string());

        let patch = CategoryPatch {
            description: Some(None),
            sort_index: Some(7),
            ..Default::default()
        };
        node.apply_patch(&patch);

        assert_eq!(node.description, None);
        assert_eq!(node.sort_index, 7);
        assert_eq!(node.name, "Food");
    }

    #[test]
    fn test_update_params_double_option_deserialization() {
        let missing: UpdateCategoryParams = serde_json::from_value(json!({"name": "x"})).unwrap();
        assert_eq!(missing.parent_id, None);

        let to_root: UpdateCategoryParams =
            serde_json::from_value(json!({"parentId": null})).unwrap();
        assert_eq!(to_root.parent_id, Some(None));

        let to_parent: UpdateCategoryParams =
            serde_json::from_value(json!({"parentId": "abc"})).unwrap();
        assert_eq!(to_parent.parent_id, Some(Some("abc".to_string())));
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(CategoryPatch::new().is_empty());
        assert!(!CategoryPatch::sort_index(1).is_empty());
    }
}
