//! # Grappelli Reactive
//!
//! Change tracking for Grappelli: plain data is turned into observable state,
//! computations record which parts of that state they read, and writes re-run
//! exactly the computations that depend on them.
//!
//! ## Building blocks
//!
//! - [`Dep`]: one observable location and its subscribers
//! - [`Value`], [`Record`], [`Sequence`]: the data model
//! - [`observe`] / [`define_reactive_field`]: instrumenting containers
//! - [`Subscriber`] / [`create_subscriber`]: computations over the state
//! - [`Path`]: dotted path expressions like `todos.0.title`
//! - [`batch`]: coalescing several writes into one round of updates
//!
//! ## Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use grappelli_reactive::{Expression, Record, Value, create_subscriber, observe};
//!
//! let state = Record::from_fields([("first", "Ada"), ("last", "Lovelace")]);
//! observe(&Value::from(state.clone()));
//!
//! let renders = Rc::new(Cell::new(0));
//! let count = renders.clone();
//! let full_name = create_subscriber(
//!     state.clone(),
//!     Expression::getter(|owner| {
//!         let record = owner.as_record().unwrap();
//!         let first = record.get("first").unwrap_or_default();
//!         let last = record.get("last").unwrap_or_default();
//!         Value::from(format!("{} {}", first.as_str().unwrap_or(""), last.as_str().unwrap_or("")))
//!     }),
//!     move |_, _| count.set(count.get() + 1),
//! )
//! .unwrap();
//!
//! state.set("last", "Byron").unwrap();
//! assert_eq!(full_name.value(), Value::from("Ada Byron"));
//! assert_eq!(renders.get(), 1);
//! ```
//!
//! ## Threading
//!
//! All runtime state is thread-local and values are `!Send`. Each thread has
//! its own observer stack and dependency graph.

#![warn(missing_docs)]

pub mod dep;
pub mod error;
pub mod observer;
pub mod path;
pub mod record;
pub mod runtime;
pub mod sequence;
pub mod settings;
pub mod subscriber;
pub mod value;

pub use dep::Dep;
pub use error::{BoxError, ReactiveError};
pub use observer::{ObservedKind, Observer, define_reactive_field, observe};
pub use path::{Path, parse_path};
pub use record::{Record, RecordBuilder};
pub use runtime::{DependencyCollector, NodeId, ObserverGuard, batch, configure, with_runtime};
pub use sequence::Sequence;
pub use settings::ReactiveSettings;
pub use subscriber::{Expression, Subscriber, create_subscriber};
pub use value::Value;
