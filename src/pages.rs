//! Virtual-DOM reconciliation and reactive render mounting
//!
//! This module provides access to grappelli-pages: the [`Patcher`](vdom::Patcher)
//! that turns tree differences into backend operations, and
//! [`mount`](mount::mount) which keeps a rendered tree in sync with the state
//! it was rendered from.
//!
//! ## Example
//!
//! ```rust
//! use grappelli::pages::mount::mount;
//! use grappelli::pages::testing::MemoryBackend;
//! use grappelli::pages::vdom::ReconcilerSettings;
//! use grappelli::core::reactive::{Record, Sequence, Value, observe};
//! use grappelli::core::types::VNode;
//!
//! let state = Record::from_fields([("todos", Sequence::from_values(["write", "test"]))]);
//! observe(&Value::from(state.clone()));
//!
//! let mut backend = MemoryBackend::new();
//! let root = backend.create_root("main");
//! let view = mount(backend, ReconcilerSettings::default(), root, state.clone(), |owner| {
//!     let todos = owner
//!         .as_record()
//!         .and_then(|s| s.get("todos"))
//!         .and_then(|t| t.as_sequence().map(Sequence::to_vec))
//!         .unwrap_or_default();
//!     VNode::element("ol").children(
//!         todos
//!             .iter()
//!             .filter_map(Value::as_str)
//!             .map(|todo| VNode::element("li").with_key(todo).with_text(todo)),
//!     )
//! })
//! .unwrap();
//!
//! let todos = state.get_untracked("todos").unwrap();
//! todos.as_sequence().unwrap().unshift("plan").unwrap();
//!
//! assert_eq!(
//!     view.backend().describe(root),
//!     "<main><ol><li>plan</li><li>write</li><li>test</li></ol></main>"
//! );
//! ```

pub use grappelli_pages::*;
