//! Hierarchy Component Error Types
//!
//! Errors raised by the tree components themselves. The service layer converts
//! these into `CategoryServiceError`.

use crate::db::StoreError;
use thiserror::Error;

/// Tree rule violations detected while resolving or changing a position
#[derive(Error, Debug)]
pub enum HierarchyError {
    /// Requested parent does not exist in the tenant
    #[error("parent category not found: {parent_id}")]
    ParentNotFound { parent_id: String },

    /// Re-parent would create a cycle or a self-parent
    #[error("Invalid parent: {reason}")]
    InvalidParent { reason: String },

    /// Storage operation failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HierarchyError {
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
}

pub type HierarchyResult<T> = std::result::Result<T, HierarchyError>;
