//! Storage Error Types
//!
//! This module defines error types for tree store operations. Service-level
//! errors are defined in `services::error` and wrap these.

use thiserror::Error;

/// Tree store operation errors
///
/// Lookups that miss and uniqueness violations get their own variants so the
/// service layer can map them onto NotFound / Conflict. Everything else the
/// backend reports is carried as `Backend` with `anyhow` context attached.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No category with this id in the tenant
    #[error("Category not found: {id} (tenant {tenant_id})")]
    NotFound { tenant_id: String, id: String },

    /// No category with this slug in the tenant
    #[error("Category not found for slug '{slug}' (tenant {tenant_id})")]
    SlugNotFound { tenant_id: String, slug: String },

    /// Slug already taken in the tenant
    #[error("Slug '{slug}' already exists in tenant {tenant_id}")]
    DuplicateSlug { tenant_id: String, slug: String },

    /// Record id already present
    #[error("Category id already exists: {id}")]
    DuplicateId { id: String },

    /// Backend failure
    #[error("Store operation failed: {0:#}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    /// Create a not found error
    pub fn not_found(tenant_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            tenant_id: tenant_id.into(),
            id: id.into(),
        }
    }

    /// Create a slug not found error
    pub fn slug_not_found(tenant_id: impl Into<String>, slug: impl Into<String>) -> Self {
        Self::SlugNotFound {
            tenant_id: tenant_id.into(),
            slug: slug.into(),
        }
    }

    /// Create a duplicate slug error
    pub fn duplicate_slug(tenant_id: impl Into<String>, slug: impl Into<String>) -> Self {
        Self::DuplicateSlug {
            tenant_id: tenant_id.into(),
            slug: slug.into(),
        }
    }

    /// Create a backend error from a message
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(anyhow::anyhow!(msg.into()))
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
