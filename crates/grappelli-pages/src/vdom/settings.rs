//! Reconciler settings.

use serde::{Deserialize, Serialize};

/// What to do when siblings share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateKeyPolicy {
	/// Record a diagnostic, log a warning and carry on. Key lookups resolve
	/// to the last old sibling holding the key.
	#[default]
	Warn,
	/// Refuse the patch before touching the real tree.
	Reject,
}

/// Tunables of the [`Patcher`](super::Patcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerSettings {
	/// Check new sibling lists for duplicate keys.
	pub check_duplicate_keys: bool,
	/// Policy applied to duplicates found by the check.
	pub duplicate_keys: DuplicateKeyPolicy,
	/// Move reused nodes into their new position. With `false`, matched
	/// nodes are patched in place and never moved; only creations and
	/// removals touch the child order.
	pub allow_moves: bool,
}

impl Default for ReconcilerSettings {
	fn default() -> Self {
		Self {
			check_duplicate_keys: true,
			duplicate_keys: DuplicateKeyPolicy::Warn,
			allow_moves: true,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_defaults_from_empty_toml() {
		let settings: ReconcilerSettings = toml::from_str("").unwrap();
		assert_eq!(settings, ReconcilerSettings::default());
	}

	#[rstest]
	fn test_policy_is_lowercase_in_toml() {
		let settings: ReconcilerSettings = toml::from_str("duplicate_keys = \"reject\"\nallow_moves = false").unwrap();
		assert_eq!(settings.duplicate_keys, DuplicateKeyPolicy::Reject);
		assert!(!settings.allow_moves);
		assert!(settings.check_duplicate_keys);
	}
}
