//! Service Layer Error Types
//!
//! This module defines error types for the category hierarchy operations.
//! Storage failures are wrapped from [`StoreError`]; everything the engine
//! decides itself (missing parent, cycles, delete guard) has its own variant.

use crate::db::{BulkWriteFailure, StoreError};
use crate::hierarchy::HierarchyError;
use crate::models::ValidationError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a failure, for callers mapping errors to responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    BadRequest,
    /// Some writes of a batch were applied, some were not
    PartialFailure,
    Internal,
}

/// Category service operation errors
#[derive(Error, Debug)]
pub enum CategoryServiceError {
    /// Category not found by ID
    #[error("Category not found: {id}")]
    NotFound { id: String },

    /// Category not found by slug
    #[error("Category not found for slug: {slug}")]
    SlugNotFound { slug: String },

    /// Requested parent does not exist in the tenant
    #[error("parent category not found: {parent_id}")]
    ParentNotFound { parent_id: String },

    /// Slug taken at write time (concurrent writer won the race)
    #[error("Slug already in use: {slug}")]
    SlugConflict { slug: String },

    /// Re-parent would create a cycle or a self-parent
    #[error("Invalid parent: {reason}")]
    InvalidParent { reason: String },

    /// Delete attempted on a category that still has children
    #[error("Category {id} has child categories and cannot be deleted")]
    HasChildren { id: String },

    /// Input validation failed
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A batch write was only partly applied
    #[error("Batch write partially applied: {applied} of {requested} records updated")]
    PartialPropagation {
        requested: usize,
        applied: usize,
        failures: Vec<BulkWriteFailure>,
    },

    /// Storage operation failed
    #[error("Store operation failed: {0}")]
    Store(StoreError),
}

impl CategoryServiceError {
    /// Create a not found error
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a parent not found error
    pub fn parent_not_found(parent_id: impl Into<String>) -> Self {
        Self::ParentNotFound {
            parent_id: parent_id.into(),
        }
    }

    /// Create an invalid parent error
    pub fn invalid_parent(reason: impl Into<String>) -> Self {
        Self::InvalidParent {
            reason: reason.into(),
        }
    }

    /// Create a has children error
    pub fn has_children(id: impl Into<String>) -> Self {
        Self::HasChildren { id: id.into() }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::SlugNotFound { .. } | Self::ParentNotFound { .. } => {
                ErrorKind::NotFound
            }
            Self::SlugConflict { .. } => ErrorKind::Conflict,
            Self::InvalidParent { .. } | Self::HasChildren { .. } | Self::Validation(_) => {
                ErrorKind::BadRequest
            }
            Self::PartialPropagation { .. } => ErrorKind::PartialFailure,
            Self::Store(StoreError::DuplicateId { .. }) => ErrorKind::Conflict,
            Self::Store(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for CategoryServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id, .. } => Self::NotFound { id },
            StoreError::SlugNotFound { slug, .. } => Self::SlugNotFound { slug },
            StoreError::DuplicateSlug { slug, .. } => Self::SlugConflict { slug },
            other => Self::Store(other),
        }
    }
}

impl From<HierarchyError> for CategoryServiceError {
    fn from(err: HierarchyError) -> Self {
        match err {
            HierarchyError::ParentNotFound { parent_id } => Self::ParentNotFound { parent_id },
            HierarchyError::InvalidParent { reason } => Self::InvalidParent { reason },
            HierarchyError::Store(e) => e.into(),
        }
    }
}

pub type ServiceResult<T> = std::result::Result<T, CategoryServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_service_kinds() {
        let err: CategoryServiceError = StoreError::duplicate_slug("t1", "foo").into();
        assert!(matches!(err, CategoryServiceError::SlugConflict { ref slug } if slug == "foo"));
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err: CategoryServiceError = StoreError::not_found("t1", "abc").into();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err: CategoryServiceError = StoreError::backend("disk full").into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_hierarchy_errors_keep_their_kind() {
        let err: CategoryServiceError = HierarchyError::parent_not_found("p1").into();
        assert!(matches!(err, CategoryServiceError::ParentNotFound { ref parent_id } if parent_id == "p1"));

        let err: CategoryServiceError = HierarchyError::invalid_parent("loop").into();
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        // Store failures inside a component map like direct store failures
        let err: CategoryServiceError =
            HierarchyError::from(StoreError::not_found("t1", "abc")).into();
        assert!(matches!(err, CategoryServiceError::NotFound { ref id } if id == "abc"));
    }

    #[test]
    fn test_parent_not_found_message() {
        let err = CategoryServiceError::parent_not_found("p1");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().starts_with("parent category not found"));
    }
}
