//! Virtual-DOM reconciliation.
//!
//! - [`NodeOps`]: what a rendering backend must provide
//! - [`Patcher`]: applies the difference between two [`VNode`](grappelli_types::VNode)
//!   trees through a backend
//! - [`same_vnode`]: whether two nodes may share a real node
//! - [`ReconcilerSettings`]: duplicate key policy and move behavior

pub mod backend;
pub mod error;
pub mod keys;
pub mod patch;
pub mod settings;

pub use backend::NodeOps;
pub use error::PatchError;
pub use keys::{Diagnostic, find_duplicate_keys, same_vnode};
pub use patch::{Patcher, create_patch_function, create_patch_function_with};
pub use settings::{DuplicateKeyPolicy, ReconcilerSettings};
