//! Database Layer
//!
//! This module handles tenant-scoped persistence of category records:
//!
//! - The [`TreeStore`] abstraction the hierarchy engine is written against
//! - An in-process backend ([`MemoryStore`]) used by default and in tests
//! - An embedded SurrealDB backend ([`SurrealStore`], feature `surrealdb`)
//!
//! # Architecture
//!
//! The tree is stored as flat records with a parent pointer and derived fields
//! (`ancestors`, `depth`, `path`). Backends only need point lookups, filtered
//! listing, an "array contains value" predicate and an unordered batch update.
//! Every tree rule is enforced above this layer, except slug uniqueness which
//! backends back with an index.

mod error;
mod memory_store;
#[cfg(feature = "surrealdb")]
mod surreal_store;
pub mod tree_store;

pub use error::{StoreError, StoreResult};
pub use memory_store::MemoryStore;
#[cfg(feature = "surrealdb")]
pub use surreal_store::SurrealStore;
pub use tree_store::{BulkUpdate, BulkWriteFailure, BulkWriteResult, TreeStore};
