//! Computation subscribers.
//!
//! A [`Subscriber`] evaluates an [`Expression`] against an owner value,
//! remembers which dependency nodes the evaluation read, and re-evaluates when
//! any of them is notified, handing the new and previous results to its
//! change callback.
//!
//! ## Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use grappelli_reactive::{Expression, Record, Value, create_subscriber, observe};
//!
//! let state = Value::from(Record::from_fields([("count", 1)]));
//! observe(&state);
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let log = seen.clone();
//! let _subscriber = create_subscriber(state.clone(), Expression::path("count").unwrap(), move |new, old| {
//!     log.borrow_mut().push((new.clone(), old.clone()));
//! })
//! .unwrap();
//!
//! state.as_record().unwrap().set("count", 2).unwrap();
//! assert_eq!(*seen.borrow(), vec![(Value::from(2), Value::from(1))]);
//! ```

use core::cell::{Cell, RefCell};
use core::fmt;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use crate::error::{BoxError, ReactiveError};
use crate::path::Path;
use crate::runtime::{DependencyCollector, NodeId, ObserverGuard, try_with_runtime, with_runtime};
use crate::value::Value;

type Getter = Rc<dyn Fn(&Value) -> Value>;
type TryGetter = Rc<dyn Fn(&Value) -> Result<Value, BoxError>>;
type Callback = Box<dyn Fn(&Value, &Value) -> Result<(), BoxError>>;

/// What a subscriber evaluates.
#[derive(Clone)]
pub enum Expression {
	/// A closure over the owner.
	Getter(Getter),
	/// A closure over the owner that may fail.
	TryGetter(TryGetter),
	/// A dotted path resolved from the owner.
	Path(Path),
}

impl Expression {
	/// Evaluate with a closure
	pub fn getter<F>(f: F) -> Self
	where
		F: Fn(&Value) -> Value + 'static,
	{
		Expression::Getter(Rc::new(f))
	}

	/// Evaluate with a closure that may fail
	pub fn try_getter<F>(f: F) -> Self
	where
		F: Fn(&Value) -> Result<Value, BoxError> + 'static,
	{
		Expression::TryGetter(Rc::new(f))
	}

	/// Evaluate a dotted path
	///
	/// # Errors
	///
	/// [`ReactiveError::InvalidPath`] for malformed paths.
	pub fn path(path: &str) -> Result<Self, ReactiveError> {
		Path::parse(path).map(Expression::Path)
	}

	fn evaluate(&self, owner: &Value) -> Result<Value, BoxError> {
		match self {
			Expression::Getter(f) => Ok(f(owner)),
			Expression::TryGetter(f) => f(owner),
			Expression::Path(path) => Ok(path.resolve(owner)),
		}
	}
}

impl From<Path> for Expression {
	fn from(path: Path) -> Self {
		Expression::Path(path)
	}
}

impl fmt::Debug for Expression {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Expression::Getter(_) => f.write_str("Getter(..)"),
			Expression::TryGetter(_) => f.write_str("TryGetter(..)"),
			Expression::Path(path) => f.debug_tuple("Path").field(&path.as_str()).finish(),
		}
	}
}

// Live subscribers by id, so dependency nodes can reach them through the
// runtime graph without owning them.
thread_local! {
	static SUBSCRIBERS: RefCell<BTreeMap<NodeId, Weak<SubscriberInner>>> = const { RefCell::new(BTreeMap::new()) };
}

fn lookup(id: NodeId) -> Option<Rc<SubscriberInner>> {
	SUBSCRIBERS.with(|registry| registry.borrow().get(&id).and_then(Weak::upgrade))
}

/// Update each listed subscriber in order.
///
/// Subscribers that no longer exist or were torn down are skipped. All of
/// them run; the first failure is returned and later ones are logged.
pub(crate) fn run_updates(ids: Vec<NodeId>) -> Result<(), ReactiveError> {
	let mut first_error = None;
	for id in ids {
		let Some(subscriber) = lookup(id) else {
			continue;
		};
		if !subscriber.active.get() {
			continue;
		}
		if let Err(err) = subscriber.update() {
			if first_error.is_none() {
				first_error = Some(err);
			} else {
				tracing::error!(subscriber = %id, error = %err, "subscriber update failed");
			}
		}
	}
	first_error.map_or(Ok(()), Err)
}

struct SubscriberInner {
	id: NodeId,
	owner: Value,
	expression: Expression,
	callback: Callback,
	value: RefCell<Value>,
	active: Cell<bool>,
	depth: Cell<usize>,
}

struct DepthGuard<'a>(&'a Cell<usize>);

impl Drop for DepthGuard<'_> {
	fn drop(&mut self) {
		self.0.set(self.0.get().saturating_sub(1));
	}
}

impl SubscriberInner {
	fn evaluate(&self) -> Result<Value, ReactiveError> {
		let result = if self.active.get() {
			let collector = DependencyCollector::begin(self.id);
			let result = {
				let _guard = ObserverGuard::push(self.id);
				self.expression.evaluate(&self.owner)
			};
			// Torn down while evaluating: nothing to subscribe.
			if self.active.get() {
				collector.commit();
			} else {
				collector.discard();
			}
			result
		} else {
			self.expression.evaluate(&self.owner)
		};
		result.map_err(|source| ReactiveError::Evaluation {
			subscriber: self.id,
			source,
		})
	}

	fn update(&self) -> Result<(), ReactiveError> {
		if !self.active.get() {
			return Ok(());
		}

		let limit = with_runtime(|rt| rt.settings().max_update_depth);
		let depth = self.depth.get();
		if depth >= limit {
			return Err(ReactiveError::UpdateLoop {
				subscriber: self.id,
				limit,
			});
		}
		self.depth.set(depth + 1);
		let _depth = DepthGuard(&self.depth);

		let new = self.evaluate()?;
		let old = self.value.replace(new.clone());
		tracing::trace!(subscriber = %self.id, "subscriber updated");

		(self.callback)(&new, &old).map_err(|source| ReactiveError::Callback {
			subscriber: self.id,
			source,
		})
	}

	fn teardown(&self) {
		if !self.active.replace(false) {
			return;
		}
		let _ = try_with_runtime(|rt| rt.remove_node(self.id));
		let _ = SUBSCRIBERS.try_with(|registry| {
			if let Ok(mut registry) = registry.try_borrow_mut() {
				registry.remove(&self.id);
			}
		});
		tracing::debug!(subscriber = %self.id, "subscriber torn down");
	}
}

impl Drop for SubscriberInner {
	fn drop(&mut self) {
		self.teardown();
	}
}

/// A computation that re-runs when the state it read changes.
///
/// Handles are cheap to clone and share one subscriber. It is torn down when
/// [`teardown`](Self::teardown) is called or the last handle is dropped.
#[derive(Clone)]
pub struct Subscriber {
	inner: Rc<SubscriberInner>,
}

impl Subscriber {
	/// Create a subscriber and evaluate it once.
	///
	/// `on_change` receives `(new, old)` after every update.
	///
	/// # Errors
	///
	/// [`ReactiveError::Evaluation`] if a fallible expression fails on the
	/// first evaluation.
	pub fn new<F>(owner: impl Into<Value>, expression: Expression, on_change: F) -> Result<Self, ReactiveError>
	where
		F: Fn(&Value, &Value) + 'static,
	{
		Self::try_new(owner, expression, move |new, old| {
			on_change(new, old);
			Ok(())
		})
	}

	/// Like [`Subscriber::new`], with a callback that may fail.
	///
	/// A callback failure is reported as [`ReactiveError::Callback`] from the
	/// write that triggered the update.
	pub fn try_new<F>(owner: impl Into<Value>, expression: Expression, on_change: F) -> Result<Self, ReactiveError>
	where
		F: Fn(&Value, &Value) -> Result<(), BoxError> + 'static,
	{
		let inner = Rc::new(SubscriberInner {
			id: NodeId::new(),
			owner: owner.into(),
			expression,
			callback: Box::new(on_change),
			value: RefCell::new(Value::Null),
			active: Cell::new(true),
			depth: Cell::new(0),
		});
		SUBSCRIBERS.with(|registry| registry.borrow_mut().insert(inner.id, Rc::downgrade(&inner)));

		let value = inner.evaluate()?;
		*inner.value.borrow_mut() = value;

		tracing::debug!(
			subscriber = %inner.id,
			expression = ?inner.expression,
			dependencies = with_runtime(|rt| rt.dependencies_of(inner.id)).len(),
			"subscriber created"
		);
		Ok(Self { inner })
	}

	/// Runtime id of this subscriber
	pub fn id(&self) -> NodeId {
		self.inner.id
	}

	/// Result of the last evaluation
	pub fn value(&self) -> Value {
		self.inner.value.borrow().clone()
	}

	/// Dependency nodes read by the last evaluation
	pub fn dependencies(&self) -> Vec<NodeId> {
		with_runtime(|rt| rt.dependencies_of(self.inner.id))
	}

	/// Evaluate again, refreshing the dependency set, without storing the
	/// result or running the callback
	pub fn evaluate(&self) -> Result<Value, ReactiveError> {
		self.inner.evaluate()
	}

	/// Re-evaluate, store the result and run the callback with `(new, old)`.
	///
	/// # Errors
	///
	/// Evaluation and callback failures, and
	/// [`ReactiveError::UpdateLoop`] when the subscriber keeps re-triggering
	/// itself.
	pub fn update(&self) -> Result<(), ReactiveError> {
		self.inner.update()
	}

	/// Whether the subscriber still reacts to changes
	pub fn is_active(&self) -> bool {
		self.inner.active.get()
	}

	/// Unsubscribe from every dependency node and stop reacting
	pub fn teardown(&self) {
		self.inner.teardown();
	}
}

impl fmt::Debug for Subscriber {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscriber")
			.field("id", &self.inner.id)
			.field("expression", &self.inner.expression)
			.field("active", &self.inner.active.get())
			.finish()
	}
}

/// Create a [`Subscriber`]; see [`Subscriber::new`].
pub fn create_subscriber<F>(
	owner: impl Into<Value>,
	expression: Expression,
	on_change: F,
) -> Result<Subscriber, ReactiveError>
where
	F: Fn(&Value, &Value) + 'static,
{
	Subscriber::new(owner, expression, on_change)
}
