//! Business Services
//!
//! - `CategoryService` - create, edit, move, reorder, delete and read category trees
//! - `TenantLocks` - per-tenant serialization of structural mutations
//!
//! Services coordinate between the database layer and the hierarchy
//! components, implementing the tree rules and orchestrating multi-step
//! operations.

pub mod category_service;
pub mod error;
pub mod tenant_locks;

pub use category_service::CategoryService;
pub use error::{CategoryServiceError, ErrorKind, ServiceResult};
pub use tenant_locks::TenantLocks;
