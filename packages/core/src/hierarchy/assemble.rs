//! Nested tree assembly from the flat outline of a tenant

use crate::db::TreeStore;
use crate::models::{CategoryOutline, CategoryTreeNode};
use crate::hierarchy::error::HierarchyResult;
use std::collections::{HashMap, HashSet};

/// Build the forest under `root_parent_id` (`None` = the actual roots).
///
/// Outlines are grouped into an adjacency list keyed by parent id, with `None`
/// as the key for roots. Siblings are ordered by `(sort_index, name)`. Nodes
/// whose parent chain never reaches the requested start are left out, and a
/// parent-pointer cycle is cut at the first repeated node.
pub fn assemble_tree(
    outlines: Vec<CategoryOutline>,
    root_parent_id: Option<&str>,
) -> Vec<CategoryTreeNode> {
    let mut adjacency_list: HashMap<Option<String>, Vec<CategoryOutline>> = HashMap::new();
    for outline in outlines {
        adjacency_list
            .entry(outline.parent_id.clone())
            .or_default()
            .push(outline);
    }

    for siblings in adjacency_list.values_mut() {
        siblings.sort_by(|a, b| {
            a.sort_index
                .cmp(&b.sort_index)
                .then_with(|| a.name.cmp(&b.name))
        });
    }

    let mut visited = HashSet::new();
    if let Some(root) = root_parent_id {
        visited.insert(root.to_string());
    }
    attach_children(
        &root_parent_id.map(str::to_string),
        &mut adjacency_list,
        &mut visited,
    )
}

fn attach_children(
    parent_key: &Option<String>,
    adjacency_list: &mut HashMap<Option<String>, Vec<CategoryOutline>>,
    visited: &mut HashSet<String>,
) -> Vec<CategoryTreeNode> {
    let Some(children) = adjacency_list.remove(parent_key) else {
        return Vec::new();
    };

    let mut nodes = Vec::with_capacity(children.len());
    for child in children {
        if !visited.insert(child.id.clone()) {
            continue;
        }
        let grandchildren = attach_children(&Some(child.id.clone()), adjacency_list, visited);
        nodes.push(CategoryTreeNode {
            category: child,
            children: grandchildren,
        });
    }
    nodes
}

/// Loads a tenant's outline and assembles it into a nested view.
pub struct TreeAssembler<'a> {
    store: &'a dyn TreeStore,
}

impl<'a> TreeAssembler<'a> {
    pub fn new(store: &'a dyn TreeStore) -> Self {
        Self { store }
    }

    /// Children forest under `root_parent_id`, or the whole tree when `None`.
    ///
    /// The starting node itself is not part of the result; an unknown start
    /// yields an empty forest.
    pub async fn build_tree(
        &self,
        tenant_id: &str,
        root_parent_id: Option<&str>,
    ) -> HierarchyResult<Vec<CategoryTreeNode>> {
        let outlines = self.store.load_outline(tenant_id).await?;
        let total = outlines.len();
        let forest = assemble_tree(outlines, root_parent_id);

        tracing::debug!(
            tenant_id,
            root = root_parent_id.unwrap_or("<roots>"),
            loaded = total,
            top_level = forest.len(),
            "Assembled category tree"
        );
        Ok(forest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::flatten_forest;

    fn outline(id: &str, name: &str, parent: Option<&str>, sort_index: i64) -> CategoryOutline {
        CategoryOutline {
            id: id.to_string(),
            name: name.to_string(),
            slug: name.to_lowercase(),
            parent_id: parent.map(str::to_string),
            sort_index,
            is_active: true,
        }
    }

    fn sample() -> Vec<CategoryOutline> {
        vec![
            outline("c", "Cold", Some("d"), 1),
            outline("d", "Drinks", None, 0),
            outline("h", "Hot", Some("d"), 0),
            outline("f", "Food", None, 0),
            outline("t", "Tea", Some("h"), 0),
            outline("b", "Beer", Some("c"), 0),
        ]
    }

    #[test]
    fn test_assemble_full_forest_sorted() {
        let forest = assemble_tree(sample(), None);

        let roots: Vec<_> = forest.iter().map(|n| n.category.name.as_str()).collect();
        assert_eq!(roots, vec!["Drinks", "Food"]);

        let drinks = &forest[0];
        let children: Vec<_> = drinks
            .children
            .iter()
            .map(|n| n.category.name.as_str())
            .collect();
        assert_eq!(children, vec!["Hot", "Cold"]);

        let flat: Vec<_> = flatten_forest(&forest)
            .iter()
            .map(|n| n.category.id.as_str())
            .collect();
        assert_eq!(flat, vec!["d", "h", "t", "c", "b", "f"]);
    }

    #[test]
    fn test_assemble_from_subtree_root() {
        let forest = assemble_tree(sample(), Some("h"));
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].category.id, "t");
        assert!(forest[0].children.is_empty());

        assert!(assemble_tree(sample(), Some("missing")).is_empty());
    }

    #[test]
    fn test_assemble_skips_orphans_and_cycles() {
        let mut outlines = sample();
        outlines.push(outline("o", "Orphan", Some("gone"), 0));
        outlines.push(outline("x", "X", Some("y"), 0));
        outlines.push(outline("y", "Y", Some("x"), 0));

        let forest = assemble_tree(outlines.clone(), None);
        assert_eq!(flatten_forest(&forest).len(), 6);

        // Starting inside a cycle terminates
        let forest = assemble_tree(outlines, Some("x"));
        let flat: Vec<_> = flatten_forest(&forest)
            .iter()
            .map(|n| n.category.id.as_str())
            .collect();
        assert_eq!(flat, vec!["y"]);
    }
}
