//! Integration tests for the SurrealDB backend
//!
//! Run with: `cargo test -p catalog-core --features surrealdb`

#![cfg(feature = "surrealdb")]

use anyhow::Result;
use catalog_core::db::SurrealStore;
use catalog_core::models::{CategoryQuery, CreateCategoryParams, ParentFilter};
use catalog_core::CategoryService;
use std::sync::Arc;
use tempfile::TempDir;

const TENANT: &str = "tenant-1";

/// Test helper: Create a test environment
async fn create_test_env() -> Result<(CategoryService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let store = Arc::new(SurrealStore::new(db_path).await?);
    Ok((CategoryService::new(store), temp_dir))
}

#[tokio::test]
async fn test_move_propagates_on_surreal() -> Result<()> {
    let (service, _temp_dir) = create_test_env().await?;

    let a = service
        .create_category(TENANT, CreateCategoryParams::new("A"))
        .await?;
    let b = service
        .create_category(TENANT, CreateCategoryParams::new("B").with_parent(a.id.clone()))
        .await?;
    let c = service
        .create_category(TENANT, CreateCategoryParams::new("C").with_parent(b.id.clone()))
        .await?;
    let d = service
        .create_category(TENANT, CreateCategoryParams::new("D"))
        .await?;

    service.move_category(TENANT, &b.id, Some(&d.id)).await?;

    let c = service.get_category(TENANT, &c.id).await?;
    assert_eq!(c.path, "d/b/c");
    assert_eq!(c.ancestors, vec![d.id.clone(), b.id.clone()]);
    assert_eq!(c.depth, 2);
    assert!(service.verify_tree(TENANT).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_slug_allocation_and_root_listing_on_surreal() -> Result<()> {
    let (service, _temp_dir) = create_test_env().await?;

    let first = service
        .create_category(TENANT, CreateCategoryParams::new("Foo"))
        .await?;
    let second = service
        .create_category(TENANT, CreateCategoryParams::new("Foo"))
        .await?;
    service
        .create_category(TENANT, CreateCategoryParams::new("Child").with_parent(first.id.clone()))
        .await?;

    assert_eq!(first.slug, "foo");
    assert_eq!(second.slug, "foo-2");

    let roots = service
        .list_categories(TENANT, &CategoryQuery::new().with_parent(ParentFilter::Root))
        .await?;
    assert_eq!(roots.total, 2);
    assert!(roots.items.iter().all(|c| c.parent_id.is_none()));
    Ok(())
}
