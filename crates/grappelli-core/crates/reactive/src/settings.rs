//! Runtime settings.

use serde::{Deserialize, Serialize};

/// Tunables of the reactive runtime.
///
/// Installed per thread with [`configure`](crate::configure).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactiveSettings {
	/// How many times a subscriber may re-enter its own update before the
	/// update fails with [`ReactiveError::UpdateLoop`](crate::ReactiveError::UpdateLoop).
	pub max_update_depth: usize,
}

impl Default for ReactiveSettings {
	fn default() -> Self {
		Self {
			max_update_depth: 100,
		}
	}
}
