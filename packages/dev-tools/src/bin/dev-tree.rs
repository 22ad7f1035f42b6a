//! Development Tree Seeder
//!
//! Seeds a category tree from a JSON file into the configured backend and
//! prints the assembled tree, plus any consistency violations, as JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin dev-tree -- packages/dev-tools/seeds/menu.json
//!
//! # Persist into an embedded SurrealDB instead of memory
//! CATALOG_SURREAL_PATH=./data/dev.db cargo run --bin dev-tree --features surrealdb -- seeds/menu.json
//! ```
//!
//! # Seed Format
//!
//! A JSON array of entries, created in order. `parentSlug` refers to the slug
//! of an entry created earlier (or already stored):
//!
//! ```json
//! [
//!   { "name": "Drinks" },
//!   { "name": "Coffee", "parentSlug": "drinks", "sortIndex": 2 }
//! ]
//! ```
//!
//! # Configuration
//!
//! - `CATALOG_TENANT` - tenant to seed (default `dev`)
//! - `CATALOG_*` - see `CatalogConfig::from_env`

use anyhow::{anyhow, Context, Result};
use catalog_core::logging::init_tracing;
use catalog_core::models::CreateCategoryParams;
use catalog_core::{CatalogConfig, CategoryService, MemoryStore, StoreBackend, TreeStore};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedEntry {
    name: String,
    #[serde(default)]
    parent_slug: Option<String>,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    sort_index: Option<i64>,
}

async fn open_store(backend: &StoreBackend) -> Result<Arc<dyn TreeStore>> {
    match backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        #[cfg(feature = "surrealdb")]
        StoreBackend::Surreal { path } => {
            let store = catalog_core::SurrealStore::new(path.clone())
                .await
                .with_context(|| format!("Failed to open SurrealDB at {}", path.display()))?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "surrealdb"))]
        StoreBackend::Surreal { path } => Err(anyhow!(
            "SurrealDB backend requested at {} but dev-tree was built without the `surrealdb` feature",
            path.display()
        )),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Subscriber first so configuration warnings are visible
    init_tracing(&CatalogConfig::log_filter_from_env());
    let config = CatalogConfig::from_env().map_err(|e| anyhow!("Invalid configuration: {}", e))?;

    let seed_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("Usage: dev-tree <seed.json>")?;
    let tenant_id = std::env::var("CATALOG_TENANT").unwrap_or_else(|_| "dev".to_string());

    let raw = std::fs::read_to_string(&seed_path)
        .with_context(|| format!("Failed to read seed file {}", seed_path.display()))?;
    let entries: Vec<SeedEntry> =
        serde_json::from_str(&raw).context("Seed file is not a valid entry list")?;

    tracing::info!(
        tenant_id = %tenant_id,
        entries = entries.len(),
        backend = ?config.backend,
        "Seeding category tree"
    );

    let store = open_store(&config.backend).await?;
    let service = CategoryService::with_config(store, config);

    for entry in entries {
        let mut params = CreateCategoryParams::new(entry.name.clone());
        if let Some(parent_slug) = &entry.parent_slug {
            let parent = service
                .get_by_slug(&tenant_id, parent_slug)
                .await
                .with_context(|| format!("Parent '{}' of '{}' not found", parent_slug, entry.name))?;
            params = params.with_parent(parent.id);
        }
        if let Some(slug) = entry.slug {
            params = params.with_slug(slug);
        }
        if let Some(description) = entry.description {
            params = params.with_description(description);
        }
        if let Some(sort_index) = entry.sort_index {
            params = params.with_sort_index(sort_index);
        }

        let created = service
            .create_category(&tenant_id, params)
            .await
            .with_context(|| format!("Failed to create '{}'", entry.name))?;
        tracing::debug!(slug = %created.slug, path = %created.path, "Seeded");
    }

    let tree = service.build_tree(&tenant_id, None).await?;
    let violations = service.verify_tree(&tenant_id).await?;

    let report = serde_json::json!({
        "tenantId": tenant_id,
        "tree": tree,
        "violations": violations,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !violations.is_empty() {
        tracing::warn!(count = violations.len(), "Seeded tree has consistency violations");
    }
    Ok(())
}
