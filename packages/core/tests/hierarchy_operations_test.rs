//! Integration tests for the category hierarchy engine
//!
//! Tests cover:
//! - Building a realistic menu tree through the public service API
//! - Rename and move propagation across several levels
//! - Delete guard ordering
//! - Reorder idempotence and tree assembly order
//! - Recovery from a partially applied propagation

use anyhow::Result;
use catalog_core::db::MemoryStore;
use catalog_core::hierarchy::TreeViolation;
use catalog_core::models::{
    flatten_forest, CategoryQuery, CreateCategoryParams, ParentFilter, ReorderItem, SortSpec,
    UpdateCategoryParams,
};
use catalog_core::{CategoryService, CategoryServiceError, ErrorKind, TreeStore};
use std::sync::Arc;

const TENANT: &str = "bistro";

/// Test helper: service over a fresh in-memory store
fn create_test_env() -> (Arc<MemoryStore>, CategoryService) {
    let store = Arc::new(MemoryStore::new());
    let service = CategoryService::new(store.clone());
    (store, service)
}

async fn add(service: &CategoryService, name: &str, parent: Option<&str>) -> Result<String> {
    let mut params = CreateCategoryParams::new(name);
    if let Some(parent) = parent {
        params = params.with_parent(parent);
    }
    Ok(service.create_category(TENANT, params).await?.id)
}

// =========================================================================
// Menu Tree Scenarios
// =========================================================================

#[tokio::test]
async fn test_menu_tree_lifecycle() -> Result<()> {
    let (_store, service) = create_test_env();

    let drinks = add(&service, "Drinks", None).await?;
    let hot = add(&service, "Hot Drinks", Some(&drinks)).await?;
    let coffee = add(&service, "Coffee", Some(&hot)).await?;
    let espresso = add(&service, "Espresso", Some(&coffee)).await?;
    let food = add(&service, "Food", None).await?;

    let espresso_row = service.get_category(TENANT, &espresso).await?;
    assert_eq!(espresso_row.path, "drinks/hot-drinks/coffee/espresso");
    assert_eq!(espresso_row.depth, 3);

    // Rename a middle node: descendants keep their chain, paths follow the new slug
    service
        .update_category(TENANT, &hot, UpdateCategoryParams::new().with_name("Warm"))
        .await?;
    let espresso_row = service.get_category(TENANT, &espresso).await?;
    assert_eq!(espresso_row.path, "drinks/warm/coffee/espresso");
    assert_eq!(espresso_row.ancestors, vec![drinks.clone(), hot.clone(), coffee.clone()]);

    // Move the coffee subtree under food
    service.move_category(TENANT, &coffee, Some(&food)).await?;
    let espresso_row = service.get_category(TENANT, &espresso).await?;
    assert_eq!(espresso_row.path, "food/coffee/espresso");
    assert_eq!(espresso_row.ancestors, vec![food.clone(), coffee.clone()]);
    assert_eq!(espresso_row.depth, 2);

    // The slug index follows the rename
    assert_eq!(service.get_by_slug(TENANT, "warm").await?.id, hot);
    let err = service.get_by_slug(TENANT, "hot-drinks").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert!(service.verify_tree(TENANT).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_cycle_rejection_leaves_tree_unchanged() -> Result<()> {
    let (_store, service) = create_test_env();
    let a = add(&service, "A", None).await?;
    let b = add(&service, "B", Some(&a)).await?;
    let c = add(&service, "C", Some(&b)).await?;

    let before = service.build_tree(TENANT, None).await?;
    let err = service.move_category(TENANT, &a, Some(&c)).await.unwrap_err();
    assert!(matches!(err, CategoryServiceError::InvalidParent { .. }));
    assert_eq!(service.build_tree(TENANT, None).await?, before);
    Ok(())
}

#[tokio::test]
async fn test_delete_leaf_first() -> Result<()> {
    let (store, service) = create_test_env();
    let a = add(&service, "A", None).await?;
    let b = add(&service, "B", Some(&a)).await?;

    let err = service.delete_category(TENANT, &a).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert_eq!(store.len().await, 2);

    service.delete_category(TENANT, &b).await?;
    service.delete_category(TENANT, &a).await?;
    assert!(store.is_empty().await);
    Ok(())
}

// =========================================================================
// Ordering and Listing
// =========================================================================

#[tokio::test]
async fn test_reorder_drives_tree_order() -> Result<()> {
    let (_store, service) = create_test_env();
    let menu = add(&service, "Menu", None).await?;
    let starters = add(&service, "Starters", Some(&menu)).await?;
    let mains = add(&service, "Mains", Some(&menu)).await?;
    let desserts = add(&service, "Desserts", Some(&menu)).await?;

    let payload = vec![
        ReorderItem {
            id: starters.clone(),
            sort_index: 0,
        },
        ReorderItem {
            id: mains.clone(),
            sort_index: 1,
        },
        ReorderItem {
            id: desserts.clone(),
            sort_index: 2,
        },
    ];
    service.reorder(TENANT, payload.clone()).await?;
    service.reorder(TENANT, payload).await?;

    let forest = service.build_tree(TENANT, Some(&menu)).await?;
    let names: Vec<_> = forest.iter().map(|n| n.category.name.as_str()).collect();
    assert_eq!(names, vec!["Starters", "Mains", "Desserts"]);

    let children = service.children(TENANT, Some(&menu)).await?;
    let ids: Vec<_> = children.iter().map(|c| c.id.clone()).collect();
    assert_eq!(ids, vec![starters, mains, desserts]);
    Ok(())
}

#[tokio::test]
async fn test_listing_filters_and_sorts() -> Result<()> {
    let (_store, service) = create_test_env();
    let menu = add(&service, "Menu", None).await?;
    for name in ["Cold Brew", "Americano", "Brewed Tea"] {
        add(&service, name, Some(&menu)).await?;
    }

    let query = CategoryQuery::new()
        .with_parent(ParentFilter::Id(menu.clone()))
        .with_search("brew")
        .with_sort(SortSpec::parse_list("name"));
    let page = service.list_categories(TENANT, &query).await?;

    let names: Vec<_> = page.items.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Brewed Tea", "Cold Brew"]);
    assert_eq!(page.total, 2);
    assert_eq!(page.page, 1);
    Ok(())
}

#[tokio::test]
async fn test_tree_round_trip_matches_store() -> Result<()> {
    let (_store, service) = create_test_env();
    let a = add(&service, "A", None).await?;
    let b = add(&service, "B", Some(&a)).await?;
    add(&service, "C", Some(&b)).await?;
    add(&service, "D", Some(&a)).await?;
    add(&service, "E", None).await?;

    let forest = service.build_tree(TENANT, None).await?;
    let flat = flatten_forest(&forest);
    let mut flat_ids: Vec<_> = flat.iter().map(|n| n.category.id.clone()).collect();
    flat_ids.sort();

    let mut stored: Vec<_> = service
        .store()
        .list_all(TENANT)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();
    stored.sort();
    assert_eq!(flat_ids, stored);
    Ok(())
}

// =========================================================================
// Partial Propagation Recovery
// =========================================================================

#[tokio::test]
async fn test_repair_after_partial_rename() -> Result<()> {
    let (store, service) = create_test_env();
    let a = add(&service, "A", None).await?;
    let b = add(&service, "B", Some(&a)).await?;
    let c = add(&service, "C", Some(&b)).await?;
    let d = add(&service, "D", Some(&c)).await?;

    store.fail_updates_for([d.clone()]).await;
    let err = service
        .update_category(TENANT, &b, UpdateCategoryParams::new().with_slug("bee"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PartialFailure);

    // c was rewritten, d was not
    assert_eq!(service.get_category(TENANT, &c).await?.path, "a/bee/c");
    assert_eq!(service.get_category(TENANT, &d).await?.path, "a/b/c/d");
    let violations = service.verify_tree(TENANT).await?;
    assert_eq!(
        violations,
        vec![TreeViolation::PathMismatch {
            id: d.clone(),
            expected: "a/bee/c/d".to_string(),
            actual: "a/b/c/d".to_string(),
        }]
    );

    store.clear_update_failures().await;
    let report = service.repair_tree(TENANT).await?;
    assert_eq!(report.updated, vec![d.clone()]);
    assert!(service.verify_tree(TENANT).await?.is_empty());
    Ok(())
}
