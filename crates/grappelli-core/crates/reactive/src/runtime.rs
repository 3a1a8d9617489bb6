//! Reactive Runtime
//!
//! This module provides the per-thread bookkeeping shared by dependency nodes
//! and subscribers.
//!
//! ## Architecture
//!
//! 1. **Observer Stack**: the subscriber currently evaluating sits on top of the
//!    stack. Reads made while it is there are recorded as its dependencies.
//!    Nested evaluations push and pop, so the outer subscriber becomes active
//!    again when the inner one finishes.
//! 2. **Dependency Graph**: bidirectional edges between dependency nodes and the
//!    subscribers that read them, keyed by [`NodeId`]. A re-evaluating
//!    subscriber collects what it reads into a pending set first; only the
//!    difference against its previous set is linked or unlinked, so it keeps
//!    its place on every node it still reads.
//! 3. **Batch Queue**: inside a [`batch`] scope, notifications are queued and
//!    de-duplicated instead of running immediately.
//!
//! No borrow of runtime state is held while user code runs; callers take a
//! snapshot and release the runtime before invoking evaluators or callbacks.

use core::cell::{Cell, RefCell};
use core::sync::atomic::{AtomicUsize, Ordering};
use std::collections::BTreeMap;

use crate::error::ReactiveError;
use crate::settings::ReactiveSettings;

/// Unique identifier for reactive nodes (dependency nodes and subscribers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
	/// Create a new unique NodeId
	pub fn new() -> Self {
		static COUNTER: AtomicUsize = AtomicUsize::new(0);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

impl Default for NodeId {
	fn default() -> Self {
		Self::new()
	}
}

impl core::fmt::Display for NodeId {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		write!(f, "n{}", self.0)
	}
}

/// Dependency graph node
#[derive(Debug, Default)]
pub(crate) struct DependencyNode {
	/// IDs of subscribers that read this node, in registration order
	pub(crate) subscribers: Vec<NodeId>,
	/// IDs of nodes this subscriber read during its last evaluation
	pub(crate) dependencies: Vec<NodeId>,
}

/// Per-thread reactive runtime.
pub struct Runtime {
	/// Observer stack; the top entry is the active subscriber
	observer_stack: RefCell<Vec<NodeId>>,
	/// Dependencies read by subscribers that are being re-evaluated, innermost last
	collecting: RefCell<Vec<(NodeId, Vec<NodeId>)>>,
	/// Dependency graph: NodeId -> DependencyNode
	pub(crate) dependency_graph: RefCell<BTreeMap<NodeId, DependencyNode>>,
	/// Subscribers queued by notifications inside a batch scope
	pub(crate) pending_updates: RefCell<Vec<NodeId>>,
	/// Nesting level of batch scopes
	batch_depth: Cell<usize>,
	settings: RefCell<ReactiveSettings>,
}

impl Runtime {
	/// Create a new Runtime instance
	pub fn new() -> Self {
		Self {
			observer_stack: RefCell::new(Vec::new()),
			collecting: RefCell::new(Vec::new()),
			dependency_graph: RefCell::new(BTreeMap::new()),
			pending_updates: RefCell::new(Vec::new()),
			batch_depth: Cell::new(0),
			settings: RefCell::new(ReactiveSettings::default()),
		}
	}

	/// Get the active subscriber, if any
	pub fn current_observer(&self) -> Option<NodeId> {
		self.observer_stack.borrow().last().copied()
	}

	/// Push a subscriber onto the observer stack
	///
	/// Prefer [`ObserverGuard`], which pops on every exit path.
	pub fn push_observer(&self, id: NodeId) {
		self.observer_stack.borrow_mut().push(id);
	}

	/// Pop the active subscriber from the observer stack
	pub fn pop_observer(&self) -> Option<NodeId> {
		self.observer_stack.borrow_mut().pop()
	}

	/// Depth of the observer stack
	pub fn observer_depth(&self) -> usize {
		self.observer_stack.borrow().len()
	}

	/// Record that the active subscriber read `dep_id`
	///
	/// Does nothing when no subscriber is active. While the active subscriber
	/// is collecting (see [`DependencyCollector`]) the read is only noted;
	/// the graph changes when the collection is committed.
	pub fn track_dependency(&self, dep_id: NodeId) {
		let Some(observer_id) = self.current_observer() else {
			return;
		};
		{
			let mut collecting = self.collecting.borrow_mut();
			if let Some((collector, touched)) = collecting.last_mut() {
				if *collector == observer_id {
					if !touched.contains(&dep_id) {
						touched.push(dep_id);
					}
					return;
				}
			}
		}
		self.link(dep_id, observer_id);
	}

	fn begin_collect(&self, subscriber_id: NodeId) {
		self.collecting.borrow_mut().push((subscriber_id, Vec::new()));
	}

	fn end_collect(&self, subscriber_id: NodeId) -> Vec<NodeId> {
		let frame = self.collecting.borrow_mut().pop();
		match frame {
			Some((id, touched)) => {
				debug_assert_eq!(id, subscriber_id, "dependency collection out of balance");
				touched
			}
			None => Vec::new(),
		}
	}

	/// Make `touched` the dependency set of `subscriber_id`.
	///
	/// Nodes read before and again keep the subscriber in its original
	/// position; new nodes append it, nodes no longer read drop it.
	pub fn replace_dependencies(&self, subscriber_id: NodeId, touched: &[NodeId]) {
		let previous = self.dependencies_of(subscriber_id);
		for dep_id in previous.iter().filter(|id| !touched.contains(id)) {
			self.unlink(*dep_id, subscriber_id);
		}
		for dep_id in touched.iter().filter(|id| !previous.contains(id)) {
			self.link(*dep_id, subscriber_id);
		}
	}

	/// Add the edge `dep_id -> subscriber_id` (and its reverse) if absent
	pub fn link(&self, dep_id: NodeId, subscriber_id: NodeId) {
		let mut graph = self.dependency_graph.borrow_mut();

		let dep_node = graph.entry(dep_id).or_default();
		if !dep_node.subscribers.contains(&subscriber_id) {
			dep_node.subscribers.push(subscriber_id);
		}

		let subscriber_node = graph.entry(subscriber_id).or_default();
		if !subscriber_node.dependencies.contains(&dep_id) {
			subscriber_node.dependencies.push(dep_id);
		}
	}

	/// Remove the edge `dep_id -> subscriber_id` (and its reverse)
	///
	/// Only the first match is removed; a missing edge is a no-op.
	pub fn unlink(&self, dep_id: NodeId, subscriber_id: NodeId) {
		let mut graph = self.dependency_graph.borrow_mut();

		if let Some(dep_node) = graph.get_mut(&dep_id) {
			if let Some(pos) = dep_node.subscribers.iter().position(|&id| id == subscriber_id) {
				dep_node.subscribers.remove(pos);
			}
		}
		if let Some(subscriber_node) = graph.get_mut(&subscriber_id) {
			subscriber_node.dependencies.retain(|&id| id != dep_id);
		}
	}

	/// Snapshot of the subscribers of `dep_id`, in registration order
	pub fn subscribers_of(&self, dep_id: NodeId) -> Vec<NodeId> {
		self.dependency_graph
			.borrow()
			.get(&dep_id)
			.map(|node| node.subscribers.clone())
			.unwrap_or_default()
	}

	/// Snapshot of the nodes `subscriber_id` currently depends on
	pub fn dependencies_of(&self, subscriber_id: NodeId) -> Vec<NodeId> {
		self.dependency_graph
			.borrow()
			.get(&subscriber_id)
			.map(|node| node.dependencies.clone())
			.unwrap_or_default()
	}

	/// Clear dependencies for a subscriber
	///
	/// Called before every evaluation so the dependency set afterwards is
	/// exactly what that evaluation read.
	pub fn clear_dependencies(&self, node_id: NodeId) {
		let mut graph = self.dependency_graph.borrow_mut();

		let dependencies = match graph.get_mut(&node_id) {
			Some(node) => core::mem::take(&mut node.dependencies),
			None => return,
		};

		for dep_id in dependencies {
			if let Some(dep_node) = graph.get_mut(&dep_id) {
				dep_node.subscribers.retain(|&id| id != node_id);
			}
		}
	}

	/// Remove a node from the dependency graph
	///
	/// Edges in both directions are dropped, so neither subscribers nor
	/// dependency nodes keep referring to a removed id.
	pub fn remove_node(&self, node_id: NodeId) {
		self.clear_dependencies(node_id);

		let mut graph = self.dependency_graph.borrow_mut();
		if let Some(node) = graph.remove(&node_id) {
			for subscriber_id in node.subscribers {
				if let Some(subscriber_node) = graph.get_mut(&subscriber_id) {
					subscriber_node.dependencies.retain(|&id| id != node_id);
				}
			}
		}
		drop(graph);

		self.pending_updates.borrow_mut().retain(|&id| id != node_id);
	}

	/// Check if a node exists in the dependency graph (for testing)
	pub fn has_node(&self, node_id: NodeId) -> bool {
		self.dependency_graph.borrow().contains_key(&node_id)
	}

	/// Get the number of subscribers for a node (for testing)
	pub fn subscriber_count(&self, node_id: NodeId) -> usize {
		self.dependency_graph
			.borrow()
			.get(&node_id)
			.map(|node| node.subscribers.len())
			.unwrap_or(0)
	}

	/// Whether a batch scope is open
	pub fn is_batching(&self) -> bool {
		self.batch_depth.get() > 0
	}

	/// Queue a subscriber for the end of the current batch
	pub(crate) fn schedule_update(&self, node_id: NodeId) {
		let mut pending = self.pending_updates.borrow_mut();
		if !pending.contains(&node_id) {
			pending.push(node_id);
		}
	}

	fn begin_batch(&self) {
		self.batch_depth.set(self.batch_depth.get() + 1);
	}

	// Returns the queued subscribers once the outermost scope closes.
	fn end_batch(&self) -> Vec<NodeId> {
		let depth = self.batch_depth.get().saturating_sub(1);
		self.batch_depth.set(depth);
		if depth == 0 {
			core::mem::take(&mut *self.pending_updates.borrow_mut())
		} else {
			Vec::new()
		}
	}

	/// Current settings
	pub fn settings(&self) -> ReactiveSettings {
		self.settings.borrow().clone()
	}

	/// Replace the settings
	pub fn set_settings(&self, settings: ReactiveSettings) {
		*self.settings.borrow_mut() = settings;
	}
}

impl Default for Runtime {
	fn default() -> Self {
		Self::new()
	}
}

// Each thread gets its own runtime, so the single active subscriber rule
// holds per thread.
thread_local! {
	static RUNTIME: Runtime = Runtime::new();
}

/// Run `f` with this thread's runtime
pub fn with_runtime<F, R>(f: F) -> R
where
	F: FnOnce(&Runtime) -> R,
{
	RUNTIME.with(f)
}

/// Try to access the runtime (safe version for Drop implementations)
///
/// Returns None if the thread-local storage has been destroyed.
pub(crate) fn try_with_runtime<F, R>(f: F) -> Option<R>
where
	F: FnOnce(&Runtime) -> R,
{
	RUNTIME.try_with(f).ok()
}

/// Install settings for the reactive runtime of the current thread.
pub fn configure(settings: ReactiveSettings) {
	tracing::debug!(max_update_depth = settings.max_update_depth, "reactive runtime configured");
	with_runtime(|rt| rt.set_settings(settings));
}

/// Keeps a subscriber on the observer stack for as long as it lives.
///
/// The entry is popped when the guard drops, including during unwinding, so a
/// panicking evaluator never leaves a stale active subscriber behind.
#[must_use = "the subscriber is popped as soon as the guard is dropped"]
pub struct ObserverGuard {
	id: NodeId,
}

impl ObserverGuard {
	/// Push `id` onto the observer stack
	pub fn push(id: NodeId) -> Self {
		with_runtime(|rt| rt.push_observer(id));
		Self { id }
	}
}

impl Drop for ObserverGuard {
	fn drop(&mut self) {
		let popped = try_with_runtime(|rt| rt.pop_observer()).flatten();
		if !std::thread::panicking() {
			assert_eq!(
				popped,
				Some(self.id),
				"observer stack out of balance: expected {} on top",
				self.id
			);
		}
	}
}

/// Collects the reads of a re-evaluating subscriber.
///
/// Reads made while `id` is the active subscriber are noted instead of linked.
/// [`commit`](Self::commit) swaps them in as the new dependency set. Dropping
/// the collector without committing (an unwinding evaluator) discards them and
/// leaves the previous set in place.
#[must_use = "reads are discarded unless the collector is committed"]
pub struct DependencyCollector {
	id: NodeId,
	open: bool,
}

impl DependencyCollector {
	/// Start collecting for `id`
	pub fn begin(id: NodeId) -> Self {
		with_runtime(|rt| rt.begin_collect(id));
		Self { id, open: true }
	}

	/// Replace the dependency set of the subscriber with what was read
	pub fn commit(mut self) {
		self.open = false;
		with_runtime(|rt| {
			let touched = rt.end_collect(self.id);
			rt.replace_dependencies(self.id, &touched);
		});
	}

	/// Stop collecting and keep the previous dependency set
	pub fn discard(mut self) {
		self.open = false;
		with_runtime(|rt| rt.end_collect(self.id));
	}
}

impl Drop for DependencyCollector {
	fn drop(&mut self) {
		if self.open {
			let _ = try_with_runtime(|rt| rt.end_collect(self.id));
		}
	}
}

struct BatchScope {
	open: bool,
}

impl BatchScope {
	fn open() -> Self {
		with_runtime(|rt| rt.begin_batch());
		Self { open: true }
	}

	fn close(mut self) -> Vec<NodeId> {
		self.open = false;
		with_runtime(|rt| rt.end_batch())
	}
}

impl Drop for BatchScope {
	fn drop(&mut self) {
		if self.open {
			// Unwinding out of the scope: queued updates are discarded.
			let _ = try_with_runtime(|rt| rt.end_batch());
		}
	}
}

/// Run `f` with notifications coalesced.
///
/// Writes inside the scope queue their subscribers instead of running them.
/// When the outermost scope ends, each queued subscriber is updated once, in
/// the order it was first queued. Nested scopes join the outer one.
///
/// # Example
///
/// ```
/// use grappelli_reactive::{Record, Value, batch, observe};
///
/// let state = Record::from_fields([("a", Value::from(1)), ("b", Value::from(2))]);
/// observe(&Value::Record(state.clone()));
///
/// batch(|| {
///     state.set("a", 10)?;
///     state.set("b", 20)
/// })
/// .and_then(|inner| inner)
/// .unwrap();
/// ```
pub fn batch<F, R>(f: F) -> Result<R, ReactiveError>
where
	F: FnOnce() -> R,
{
	let scope = BatchScope::open();
	let result = f();
	let pending = scope.close();
	if !pending.is_empty() {
		tracing::trace!(count = pending.len(), "flushing batched updates");
		crate::subscriber::run_updates(pending)?;
	}
	Ok(result)
}
