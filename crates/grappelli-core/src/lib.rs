//! # Grappelli Core
//!
//! Core components for Grappelli: the virtual node model shared with the
//! reconciler and the reactive runtime that drives re-rendering.
//!
//! Each sub-crate is re-exported behind a feature of the same name.

#[cfg(feature = "types")]
pub use grappelli_types as types;

#[cfg(feature = "reactive")]
pub use grappelli_reactive as reactive;
