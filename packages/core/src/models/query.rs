//! Listing filters, sort specifications and pagination
//!
//! `CategoryQuery` is backend-neutral: `matches()` and `compare()` give the
//! reference semantics that the in-memory store applies directly and that
//! other backends translate into their own query language.

use crate::models::Category;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Parent filter for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParentFilter {
    /// Only categories without a parent
    Root,
    /// Only direct children of the given category
    Id(String),
}

impl ParentFilter {
    /// Parse a request parameter: `"root"`, `"null"` or empty select roots,
    /// anything else is taken as a parent id.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "root" | "null" => Self::Root,
            id => Self::Id(id.to_string()),
        }
    }

    fn accepts(&self, parent_id: Option<&str>) -> bool {
        match self {
            Self::Root => parent_id.is_none(),
            Self::Id(id) => parent_id == Some(id.as_str()),
        }
    }
}

/// Sortable category fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Name,
    Slug,
    Path,
    Depth,
    SortIndex,
    ItemsCount,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    fn parse(key: &str) -> Option<Self> {
        match key {
            "name" => Some(Self::Name),
            "slug" => Some(Self::Slug),
            "path" => Some(Self::Path),
            "depth" => Some(Self::Depth),
            "sortIndex" | "sort_index" => Some(Self::SortIndex),
            "itemsCount" | "items_count" => Some(Self::ItemsCount),
            "createdAt" | "created_at" => Some(Self::CreatedAt),
            "updatedAt" | "updated_at" => Some(Self::UpdatedAt),
            _ => None,
        }
    }

    /// Column name used by storage backends
    pub fn column(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Slug => "slug",
            Self::Path => "path",
            Self::Depth => "depth",
            Self::SortIndex => "sort_index",
            Self::ItemsCount => "items_count",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }

    fn compare(&self, a: &Category, b: &Category) -> Ordering {
        match self {
            Self::Name => a.name.cmp(&b.name),
            Self::Slug => a.slug.cmp(&b.slug),
            Self::Path => a.path.cmp(&b.path),
            Self::Depth => a.depth.cmp(&b.depth),
            Self::SortIndex => a.sort_index.cmp(&b.sort_index),
            Self::ItemsCount => a.items_count.cmp(&b.items_count),
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
            Self::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One sort key with direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Desc,
        }
    }

    /// Parse a comma separated sort parameter such as `"name,-createdAt"`.
    ///
    /// A leading `-` means descending. Unknown keys are skipped.
    ///
    /// ```rust
    /// # use catalog_core::models::{SortField, SortSpec};
    /// let specs = SortSpec::parse_list("name,-createdAt,bogus");
    /// assert_eq!(specs, vec![
    ///     SortSpec::asc(SortField::Name),
    ///     SortSpec::desc(SortField::CreatedAt),
    /// ]);
    /// ```
    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .filter_map(|key| match key.strip_prefix('-') {
                Some(field) => SortField::parse(field).map(Self::desc),
                None => SortField::parse(key.trim_start_matches('+')).map(Self::asc),
            })
            .collect()
    }

    fn compare(&self, a: &Category, b: &Category) -> Ordering {
        let ordering = self.field.compare(a, b);
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Filter, sort and pagination for category listings
///
/// All filter fields are combined with AND; `None` means "no filtering".
///
/// # Examples
///
/// ```rust
/// # use catalog_core::models::{CategoryQuery, ParentFilter};
/// let query = CategoryQuery::new()
///     .with_parent(ParentFilter::Root)
///     .with_active(true)
///     .with_search("coffee")
///     .with_page(2, 10);
/// assert_eq!(query.offset(10), 10);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentFilter>,

    /// Case-insensitive substring over name and description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,

    /// Caller sort keys; the default tie-break is always appended
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortSpec>,

    /// 1-based page number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl CategoryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn with_parent(mut self, parent: ParentFilter) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_sort(mut self, sort: Vec<SortSpec>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_page(mut self, page: usize, limit: usize) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }

    /// Page number, never below 1
    pub fn page_number(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    /// Row offset for the given effective limit, saturating for far-out pages
    pub fn offset(&self, limit: usize) -> usize {
        (self.page_number() - 1).saturating_mul(limit)
    }

    /// Caller sort keys followed by the default `sortIndex asc, createdAt desc`
    pub fn effective_sort(&self) -> Vec<SortSpec> {
        let mut specs = self.sort.clone();
        for fallback in [
            SortSpec::asc(SortField::SortIndex),
            SortSpec::desc(SortField::CreatedAt),
        ] {
            if !specs.iter().any(|s| s.field == fallback.field) {
                specs.push(fallback);
            }
        }
        specs
    }

    /// Whether `category` passes every filter
    pub fn matches(&self, category: &Category) -> bool {
        if let Some(is_active) = self.is_active {
            if category.is_active != is_active {
                return false;
            }
        }
        if let Some(parent) = &self.parent {
            if !parent.accepts(category.parent_id.as_deref()) {
                return false;
            }
        }
        if let Some(search) = self.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                let needle = search.to_lowercase();
                let in_name = category.name.to_lowercase().contains(&needle);
                let in_description = category
                    .description
                    .as_deref()
                    .map(|d| d.to_lowercase().contains(&needle))
                    .unwrap_or(false);
                if !in_name && !in_description {
                    return false;
                }
            }
        }
        true
    }

    /// Order two categories by the effective sort
    pub fn compare(&self, a: &Category, b: &Category) -> Ordering {
        self.effective_sort()
            .iter()
            .map(|spec| spec.compare(a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Matches across all pages
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> usize {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TreeInfo;

    fn category(name: &str, sort_index: i64) -> Category {
        let mut c = Category::new("t1", name, name.to_lowercase(), TreeInfo::root());
        c.sort_index = sort_index;
        c
    }

    #[test]
    fn test_parent_filter_parse() {
        assert_eq!(ParentFilter::parse("root"), ParentFilter::Root);
        assert_eq!(ParentFilter::parse("null"), ParentFilter::Root);
        assert_eq!(
            ParentFilter::parse("abc"),
            ParentFilter::Id("abc".to_string())
        );
    }

    #[test]
    fn test_matches_search_over_name_and_description() {
        let mut c = category("Espresso", 0);
        c.description = Some("Strong COFFEE shot".to_string());

        assert!(CategoryQuery::new().with_search("press").matches(&c));
        assert!(CategoryQuery::new().with_search("coffee").matches(&c));
        assert!(!CategoryQuery::new().with_search("tea").matches(&c));
    }

    #[test]
    fn test_matches_parent_and_active() {
        let root = category("Root", 0);
        let mut child = Category::new("t1", "Child", "child", TreeInfo::child_of(&root));
        child.is_active = false;

        let roots = CategoryQuery::new().with_parent(ParentFilter::Root);
        assert!(roots.matches(&root));
        assert!(!roots.matches(&child));

        let under_root = CategoryQuery::new().with_parent(ParentFilter::Id(root.id.clone()));
        assert!(under_root.matches(&child));

        assert!(!CategoryQuery::new().with_active(true).matches(&child));
    }

    #[test]
    fn test_default_sort_is_sort_index_then_newest() {
        let older = category("Older", 1);
        let mut newer = category("Newer", 1);
        newer.created_at = older.created_at + chrono::Duration::seconds(5);
        let first = category("First", 0);

        let query = CategoryQuery::new();
        let mut items = vec![older.clone(), newer.clone(), first.clone()];
        items.sort_by(|a, b| query.compare(a, b));

        let names: Vec<_> = items.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Newer", "Older"]);
    }

    #[test]
    fn test_caller_sort_takes_precedence() {
        let query = CategoryQuery::new().with_sort(SortSpec::parse_list("-name"));
        let mut items = vec![category("Apple", 0), category("Banana", 5)];
        items.sort_by(|a, b| query.compare(a, b));
        assert_eq!(items[0].name, "Banana");
    }

    #[test]
    fn test_page_math() {
        let query = CategoryQuery::new().with_page(0, 10);
        assert_eq!(query.page_number(), 1);
        assert_eq!(query.offset(10), 0);

        let page: Page<()> = Page {
            items: vec![],
            total: 21,
            page: 1,
            limit: 10,
        };
        assert_eq!(page.total_pages(), 3);
    }

    #[test]
    fn test_offset_saturates_for_huge_page() {
        let query = CategoryQuery::new().with_page(usize::MAX, 10);
        assert_eq!(query.offset(10), usize::MAX);
        assert_eq!(query.page_number(), usize::MAX);
    }
}
