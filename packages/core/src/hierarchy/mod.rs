//! Category Hierarchy Engine
//!
//! Building blocks that keep the materialized tree fields consistent:
//!
//! - [`slug`] - `SlugAllocator`: URL-safe slugs, unique per tenant
//! - [`path`] - `PathBuilder`: ancestors, depth and path prefix from a parent
//! - [`cycle`] - `CycleGuard`: rejects moves under the node's own subtree
//! - [`propagate`] - `ReparentPropagator`: rewrites descendants after a rename or move
//! - [`assemble`] - `TreeAssembler`: nested view from the flat records
//! - [`audit`] - consistency check and repair from parent pointers
//! - [`error`] - `HierarchyError` raised by the components above
//!
//! Each component borrows a `&dyn TreeStore`; the service layer composes them
//! into the mutating operations.

pub mod assemble;
pub mod audit;
pub mod cycle;
pub mod error;
pub mod path;
pub mod propagate;
pub mod slug;

pub use assemble::{assemble_tree, TreeAssembler};
pub use audit::{RepairReport, TreeViolation};
pub use cycle::CycleGuard;
pub use error::{HierarchyError, HierarchyResult};
pub use path::PathBuilder;
pub use propagate::{ReparentPropagator, SubtreeShift};
pub use slug::{is_valid_slug, slugify, SlugAllocator};
