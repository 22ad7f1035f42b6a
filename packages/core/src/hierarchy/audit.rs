//! Consistency audit and repair of a tenant's tree
//!
//! Batch propagation is best effort, so a failed write can leave descendants
//! with stale `ancestors`, `depth` or `path`. The audit recomputes those
//! fields from the `parent_id` pointers, which are the source of truth, and
//! either reports or fixes the differences.

use crate::db::BulkUpdate;
use crate::models::{Category, CategoryPatch};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One broken tree rule, tagged with the offending record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TreeViolation {
    /// The parent chain references a record that does not exist
    #[serde(rename_all = "camelCase")]
    MissingParent { id: String, missing_id: String },

    /// Following parent pointers from this record loops
    Cycle { id: String },

    #[serde(rename_all = "camelCase")]
    AncestorsMismatch {
        id: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[serde(rename_all = "camelCase")]
    DepthMismatch { id: String, expected: u32, actual: u32 },

    #[serde(rename_all = "camelCase")]
    PathMismatch {
        id: String,
        expected: String,
        actual: String,
    },

    /// Several records share one slug
    DuplicateSlug { slug: String, ids: Vec<String> },
}

/// Outcome of a repair run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    /// Records whose derived fields were rewritten
    pub updated: Vec<String>,
    /// Records not reachable from any root; left untouched
    pub unreachable: Vec<String>,
}

/// Why a parent chain could not be resolved
enum ChainBreak {
    Missing(String),
    Cycle,
}

/// Derived fields a record should have
struct Expected {
    ancestors: Vec<String>,
    path: String,
}

/// Resolve `node`'s ancestor chain (root first) from parent pointers only
fn resolve_chain<'a>(
    node: &'a Category,
    by_id: &HashMap<&str, &'a Category>,
) -> Result<Vec<&'a Category>, ChainBreak> {
    let mut chain = Vec::new();
    let mut seen: HashSet<&str> = HashSet::from([node.id.as_str()]);
    let mut current = node.parent_id.as_deref();

    while let Some(parent_id) = current {
        if !seen.insert(parent_id) {
            return Err(ChainBreak::Cycle);
        }
        let Some(parent) = by_id.get(parent_id) else {
            return Err(ChainBreak::Missing(parent_id.to_string()));
        };
        chain.push(*parent);
        current = parent.parent_id.as_deref();
    }

    chain.reverse();
    Ok(chain)
}

fn expected_fields(node: &Category, chain: &[&Category]) -> Expected {
    let mut segments: Vec<&str> = chain.iter().map(|c| c.slug.as_str()).collect();
    segments.push(&node.slug);
    Expected {
        ancestors: chain.iter().map(|c| c.id.clone()).collect(),
        path: segments.join("/"),
    }
}

fn index(categories: &[Category]) -> HashMap<&str, &Category> {
    categories.iter().map(|c| (c.id.as_str(), c)).collect()
}

/// List every violated tree rule in one tenant's records.
///
/// Results are ordered by record id so repeated runs compare equal.
pub fn verify(categories: &[Category]) -> Vec<TreeViolation> {
    let by_id = index(categories);
    let mut sorted: Vec<&Category> = categories.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let mut violations = Vec::new();
    for node in sorted {
        let chain = match resolve_chain(node, &by_id) {
            Ok(chain) => chain,
            Err(ChainBreak::Missing(missing_id)) => {
                violations.push(TreeViolation::MissingParent {
                    id: node.id.clone(),
                    missing_id,
                });
                continue;
            }
            Err(ChainBreak::Cycle) => {
                violations.push(TreeViolation::Cycle {
                    id: node.id.clone(),
                });
                continue;
            }
        };

        let expected = expected_fields(node, &chain);
        let expected_depth = expected.ancestors.len() as u32;
        if node.ancestors != expected.ancestors {
            violations.push(TreeViolation::AncestorsMismatch {
                id: node.id.clone(),
                expected: expected.ancestors,
                actual: node.ancestors.clone(),
            });
        }
        if node.depth != expected_depth {
            violations.push(TreeViolation::DepthMismatch {
                id: node.id.clone(),
                expected: expected_depth,
                actual: node.depth,
            });
        }
        if node.path != expected.path {
            violations.push(TreeViolation::PathMismatch {
                id: node.id.clone(),
                expected: expected.path,
                actual: node.path.clone(),
            });
        }
    }

    let mut by_slug: HashMap<&str, Vec<String>> = HashMap::new();
    for c in categories {
        by_slug.entry(c.slug.as_str()).or_default().push(c.id.clone());
    }
    let mut duplicates: Vec<(&str, Vec<String>)> = by_slug
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .collect();
    duplicates.sort_by(|a, b| a.0.cmp(b.0));
    violations.extend(duplicates.into_iter().map(|(slug, mut ids)| {
        ids.sort();
        TreeViolation::DuplicateSlug {
            slug: slug.to_string(),
            ids,
        }
    }));

    violations
}

/// Patches that bring every reachable record back in line, plus the ids that
/// cannot be repaired because their chain never reaches a root.
pub fn plan_repair(categories: &[Category]) -> (Vec<BulkUpdate>, Vec<String>) {
    let by_id = index(categories);
    let mut updates = Vec::new();
    let mut unreachable = Vec::new();

    for node in categories {
        let chain = match resolve_chain(node, &by_id) {
            Ok(chain) => chain,
            Err(_) => {
                unreachable.push(node.id.clone());
                continue;
            }
        };

        let expected = expected_fields(node, &chain);
        let depth = expected.ancestors.len() as u32;
        if node.ancestors != expected.ancestors || node.depth != depth || node.path != expected.path
        {
            updates.push(BulkUpdate::new(
                node.id.clone(),
                CategoryPatch::tree_fields(expected.ancestors, depth, expected.path),
            ));
        }
    }

    updates.sort_by(|a, b| a.id.cmp(&b.id));
    unreachable.sort();
    (updates, unreachable)
}
