//! # Grappelli
//!
//! A reactive UI runtime: observable state with automatic dependency
//! tracking, and a keyed virtual-DOM reconciler that turns tree differences
//! into the minimal set of operations on a real node tree.
//!
//! ## How the pieces fit
//!
//! 1. [`observe`] instruments a [`Record`] or [`Sequence`] so that reads are
//!    recorded and writes notify.
//! 2. A [`Subscriber`] evaluates an expression against an owner value,
//!    collecting exactly the dependencies it read, and re-evaluates when any
//!    of them changes.
//! 3. A render subscriber produces [`VNode`] trees; the
//!    [`Patcher`](pages::vdom::Patcher) reconciles consecutive trees through a
//!    [`NodeOps`](pages::vdom::NodeOps) backend.
//!
//! ## Feature Flags
//!
//! - `full` (default) - Everything below
//! - `pages` - Virtual-DOM reconciliation and render mounting
//!
//! The reactive core is always available.
//!
//! ## Quick Example
//!
//! ```rust
//! use grappelli::prelude::*;
//!
//! let state = Record::from_fields([("count", 1)]);
//! observe(&Value::from(state.clone()));
//!
//! let mut backend = MemoryBackend::new();
//! let root = backend.create_root("body");
//! let view = mount(backend, ReconcilerSettings::default(), root, state.clone(), |owner| {
//!     let count = owner.as_record().and_then(|s| s.get("count")).and_then(|c| c.as_f64());
//!     VNode::element("span").with_text(count.unwrap_or_default().to_string())
//! })
//! .unwrap();
//!
//! state.set("count", 2).unwrap();
//! assert_eq!(view.backend().describe(root), "<body><span>2</span></body>");
//! ```

#![warn(missing_docs)]

pub mod core;
#[cfg(feature = "pages")]
pub mod pages;
pub mod settings;

// Re-export settings
pub use settings::{Settings, SettingsError};

// Re-export the node model
pub use grappelli_core::types::{Key, NodeHandle, VNode, VNodeData, VNodeKind};

// Re-export the reactive runtime
pub use grappelli_core::reactive::{
	Dep, Expression, ReactiveError, ReactiveSettings, Record, Sequence, Subscriber, Value, batch, configure,
	create_subscriber, define_reactive_field, observe, parse_path,
};

// Re-export the reconciler
#[cfg(feature = "pages")]
pub use grappelli_pages::{
	Mount, MountError, NodeOps, PatchError, Patcher, ReconcilerSettings, create_patch_function, mount,
};

/// Prelude module for convenient imports
///
/// Import everything commonly needed with:
/// ```rust
/// use grappelli::prelude::*;
/// ```
pub mod prelude {
	// Core types - always available
	pub use crate::{
		Expression, Key, Record, Sequence, Subscriber, VNode, Value, batch, create_subscriber, observe,
	};

	// Pages feature
	#[cfg(feature = "pages")]
	pub use crate::{NodeOps, ReconcilerSettings, create_patch_function, mount};
	#[cfg(feature = "pages")]
	pub use grappelli_pages::testing::MemoryBackend;
}
