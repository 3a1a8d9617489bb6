//! Dependency nodes.
//!
//! A [`Dep`] stands for one observable location (a record field, or a whole
//! record or sequence). Subscribers that read the location while evaluating
//! are recorded on it; writing the location notifies them.

use crate::error::ReactiveError;
use crate::runtime::{NodeId, try_with_runtime, with_runtime};
use crate::subscriber::Subscriber;

/// An observable location and the subscribers that depend on it.
///
/// Subscribers are kept in registration order without duplicates. The node is
/// removed from the runtime when the `Dep` is dropped, which happens together
/// with the record field or container that owns it.
#[derive(Debug)]
pub struct Dep {
	id: NodeId,
}

impl Dep {
	/// Create a new dependency node
	pub fn new() -> Self {
		Self { id: NodeId::new() }
	}

	/// Runtime id of this node
	pub fn id(&self) -> NodeId {
		self.id
	}

	/// Register `subscriber` unless it is already registered
	pub fn subscribe(&self, subscriber: &Subscriber) {
		with_runtime(|rt| rt.link(self.id, subscriber.id()));
	}

	/// Remove `subscriber`; a no-op when it is not registered
	pub fn unsubscribe(&self, subscriber: &Subscriber) {
		with_runtime(|rt| rt.unlink(self.id, subscriber.id()));
	}

	/// Register the active subscriber, if there is one
	pub fn depend(&self) {
		with_runtime(|rt| rt.track_dependency(self.id));
	}

	/// Notify every registered subscriber.
	///
	/// The subscriber list is snapshotted first; subscribers added during the
	/// pass wait for the next notification and subscribers torn down during the
	/// pass are skipped. Inside a [`batch`](crate::batch) scope the snapshot is
	/// queued instead.
	///
	/// Every snapshotted subscriber runs even if an earlier one fails. The
	/// first failure is returned.
	pub fn notify(&self) -> Result<(), ReactiveError> {
		let (snapshot, batching) = with_runtime(|rt| (rt.subscribers_of(self.id), rt.is_batching()));
		if snapshot.is_empty() {
			return Ok(());
		}
		tracing::trace!(dep = %self.id, subscribers = snapshot.len(), batching, "notify");

		if batching {
			with_runtime(|rt| {
				for id in snapshot {
					rt.schedule_update(id);
				}
			});
			return Ok(());
		}

		crate::subscriber::run_updates(snapshot)
	}

	/// Number of registered subscribers
	pub fn subscriber_count(&self) -> usize {
		with_runtime(|rt| rt.subscriber_count(self.id))
	}

	/// Registered subscribers, in registration order
	pub fn subscribers(&self) -> Vec<NodeId> {
		with_runtime(|rt| rt.subscribers_of(self.id))
	}
}

impl Default for Dep {
	fn default() -> Self {
		Self::new()
	}
}

impl Drop for Dep {
	fn drop(&mut self) {
		// The runtime may already be gone during thread teardown.
		let _ = try_with_runtime(|rt| rt.remove_node(self.id));
	}
}
