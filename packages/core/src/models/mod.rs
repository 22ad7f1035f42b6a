//! Data Models
//!
//! Category records, the parameter and patch types that mutate them, listing
//! queries, and the nested tree view.

mod category;
mod query;
mod tree;

pub use category::{
    Category, CategoryPatch, CreateCategoryParams, ReorderItem, TreeInfo, UpdateCategoryParams,
    ValidationError,
};
pub use query::{CategoryQuery, Page, ParentFilter, SortDirection, SortField, SortSpec};
pub use tree::{flatten_forest, CategoryOutline, CategoryTreeNode};
