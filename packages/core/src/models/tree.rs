//! Nested tree view types

use crate::models::Category;
use serde::{Deserialize, Serialize};

/// Lightweight projection loaded for tree assembly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryOutline {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<String>,
    pub sort_index: i64,
    pub is_active: bool,
}

impl From<&Category> for CategoryOutline {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id.clone(),
            name: category.name.clone(),
            slug: category.slug.clone(),
            parent_id: category.parent_id.clone(),
            sort_index: category.sort_index,
            is_active: category.is_active,
        }
    }
}

/// A node of the assembled tree with its sorted children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTreeNode {
    #[serde(flatten)]
    pub category: CategoryOutline,

    /// Always present, empty for leaves
    pub children: Vec<CategoryTreeNode>,
}

impl CategoryTreeNode {
    /// Pre-order walk over this node and its descendants
    pub fn walk<'a>(&'a self, out: &mut Vec<&'a CategoryTreeNode>) {
        out.push(self);
        for child in &self.children {
            child.walk(out);
        }
    }
}

/// Flatten a forest depth-first (pre-order)
pub fn flatten_forest(forest: &[CategoryTreeNode]) -> Vec<&CategoryTreeNode> {
    let mut out = Vec::new();
    for node in forest {
        node.walk(&mut out);
    }
    out
}
