//! # Grappelli Types
//!
//! Plain data types shared between the reactive core and the reconciler.
//!
//! - [`vnode`]: the virtual node model ([`VNode`], [`VNodeData`], [`Key`])
//! - [`handle`]: opaque handles to nodes of a real output tree ([`NodeHandle`])
//!
//! Nothing in this crate knows about rendering surfaces or reactivity. A
//! rendering backend hands out [`NodeHandle`]s and the reconciler stores them
//! on the [`VNode`] that produced them.

#![warn(missing_docs)]

pub mod handle;
pub mod vnode;

pub use handle::NodeHandle;
pub use vnode::{Key, VNode, VNodeData, VNodeKind};
