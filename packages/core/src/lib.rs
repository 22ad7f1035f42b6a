//! Catalog Core - Category Hierarchy Engine
//!
//! This crate maintains per-tenant category trees stored as flat records with
//! a materialized path, an ordered ancestor chain and a depth, and keeps those
//! fields consistent under create, rename, move, reorder and delete.
//!
//! # Architecture
//!
//! - **Flat records**: parent pointer plus derived `ancestors`/`depth`/`path`, no in-memory graph
//! - **Store abstraction**: all persistence goes through the async `TreeStore` trait
//! - **Best-effort propagation**: descendant rewrites are one batch write; partial
//!   results are surfaced, never masked, and can be repaired
//! - **Per-tenant serialization**: structural mutations of one tenant run one at a time
//!
//! # Modules
//!
//! - [`models`] - Data structures (Category, patches, queries, tree view)
//! - [`db`] - `TreeStore` trait, in-memory and SurrealDB backends
//! - [`hierarchy`] - Slug allocation, path resolution, cycle guard, propagation, assembly, audit
//! - [`services`] - `CategoryService` composing the above
//! - [`config`] - Runtime configuration
//! - [`logging`] - Tracing subscriber setup

pub mod config;
pub mod db;
pub mod hierarchy;
pub mod logging;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use config::{CatalogConfig, StoreBackend};
pub use db::{MemoryStore, StoreError, TreeStore};
#[cfg(feature = "surrealdb")]
pub use db::SurrealStore;
pub use models::*;
pub use services::{CategoryService, CategoryServiceError, ErrorKind};
