//! Core runtime module.
//!
//! This module provides access to the virtual node model and the reactive
//! runtime.
//!
//! # Examples
//!
//! ```rust
//! use grappelli::core::reactive::{Record, Value, observe};
//! use grappelli::core::types::VNode;
//!
//! let state = Record::from_fields([("title", "hi")]);
//! observe(&Value::from(state.clone()));
//! let node = VNode::element("h1").with_text("hi");
//! # let _ = node;
//! ```

pub use grappelli_core::*;
