//! Reconciler errors.

use grappelli_types::Key;
use thiserror::Error;

/// Failure of a patch.
///
/// Nothing is rolled back: operations issued before the failure stay applied.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum PatchError<E> {
	/// A backend operation failed.
	#[error("backend operation failed")]
	Backend(#[source] E),
	/// Siblings share a key and the policy is
	/// [`Reject`](super::DuplicateKeyPolicy::Reject).
	#[error("duplicate key {key} among siblings at positions {first_index} and {duplicate_index}")]
	DuplicateKey {
		/// The shared key.
		key: Key,
		/// Position of the first sibling with the key.
		first_index: usize,
		/// Position of the colliding sibling.
		duplicate_index: usize,
	},
	/// An old node that should be backed by a real node is not.
	#[error("<{tag}> has no real node to patch; was it mounted?")]
	Unmounted {
		/// Tag of the node (`#text` or `#comment` for those).
		tag: String,
	},
}

impl<E> PatchError<E> {
	/// The backend error, if this is one.
	pub fn backend(&self) -> Option<&E> {
		match self {
			PatchError::Backend(err) => Some(err),
			_ => None,
		}
	}
}
