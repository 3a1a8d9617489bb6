//! Real-tree node handles.

use core::fmt;

/// Opaque reference to a node owned by a rendering backend.
///
/// Backends keep the actual nodes (DOM nodes, terminal cells, test arena
/// entries) and identify them to the reconciler through this handle. Two
/// handles are equal exactly when they refer to the same backend node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeHandle(u64);

impl NodeHandle {
	/// Wraps a backend-specific raw identifier.
	pub const fn new(raw: u64) -> Self {
		Self(raw)
	}

	/// Returns the backend-specific raw identifier.
	pub const fn raw(self) -> u64 {
		self.0
	}
}

impl fmt::Display for NodeHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_handle_round_trips_raw_value() {
		let handle = NodeHandle::new(7);
		assert_eq!(handle.raw(), 7);
		assert_eq!(handle.to_string(), "#7");
	}
}
