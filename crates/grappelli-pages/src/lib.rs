//! # Grappelli Pages
//!
//! Virtual-DOM reconciliation on top of the Grappelli reactive core.
//!
//! ## Modules
//!
//! - [`vdom`]: the reconciler ([`Patcher`]), the backend contract
//!   ([`NodeOps`]) and reconciler settings
//! - [`mount`](mod@mount): keeps a rendered tree in sync with observable state
//! - [`testing`]: an in-memory backend that records every operation
//!
//! ## Data flow
//!
//! A state write notifies the render subscriber, which renders a new
//! [`VNode`](grappelli_types::VNode) tree; the [`Patcher`] diffs it against
//! the previous tree and issues the minimal backend operations.

#![warn(missing_docs)]

pub mod mount;
pub mod testing;
pub mod vdom;

pub use mount::{Mount, MountError, mount};
pub use vdom::{
	Diagnostic, DuplicateKeyPolicy, NodeOps, PatchError, Patcher, ReconcilerSettings, create_patch_function,
	create_patch_function_with, same_vnode,
};
