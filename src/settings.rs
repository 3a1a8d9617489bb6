//! Aggregated runtime settings.
//!
//! ```toml
//! [reactive]
//! max_update_depth = 50
//!
//! [reconciler]
//! duplicate_keys = "reject"
//! allow_moves = true
//! ```
//!
//! Every table and every field is optional; missing values fall back to the
//! defaults of [`ReactiveSettings`] and [`ReconcilerSettings`].

use std::path::Path;

use grappelli_core::reactive::{ReactiveSettings, configure};
#[cfg(feature = "pages")]
use grappelli_pages::ReconcilerSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Settings errors
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SettingsError {
	/// The settings file could not be read.
	#[error("File error: {0}")]
	FileError(String),

	/// The document is not valid settings TOML.
	#[error("Parse error: {0}")]
	ParseError(String),
}

/// Settings of every Grappelli component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	/// Reactive runtime settings
	pub reactive: ReactiveSettings,
	/// Reconciler settings, passed to [`mount`](grappelli_pages::mount) or
	/// [`create_patch_function_with`](grappelli_pages::create_patch_function_with)
	#[cfg(feature = "pages")]
	pub reconciler: ReconcilerSettings,
}

impl Settings {
	/// Parse settings from a TOML document
	pub fn from_toml_str(contents: &str) -> Result<Self, SettingsError> {
		toml::from_str(contents).map_err(|e| SettingsError::ParseError(format!("TOML parse error: {}", e)))
	}

	/// Load settings from a TOML file
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
		let path = path.as_ref();
		let contents = std::fs::read_to_string(path)
			.map_err(|e| SettingsError::FileError(format!("Failed to read {}: {}", path.display(), e)))?;
		Self::from_toml_str(&contents)
	}

	/// Install the reactive settings for the current thread.
	///
	/// Reconciler settings are per patcher and are not installed globally.
	pub fn apply(&self) {
		configure(self.reactive.clone());
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use grappelli_core::reactive::with_runtime;
	use rstest::rstest;
	use serial_test::serial;

	#[rstest]
	fn test_empty_document_gives_defaults() {
		assert_eq!(Settings::from_toml_str("").unwrap(), Settings::default());
	}

	#[cfg(feature = "pages")]
	#[rstest]
	fn test_partial_tables_keep_other_defaults() {
		use grappelli_pages::DuplicateKeyPolicy;

		let settings = Settings::from_toml_str(
			r#"
			[reactive]
			max_update_depth = 7

			[reconciler]
			duplicate_keys = "reject"
			"#,
		)
		.unwrap();

		assert_eq!(settings.reactive.max_update_depth, 7);
		assert_eq!(settings.reconciler.duplicate_keys, DuplicateKeyPolicy::Reject);
		assert!(settings.reconciler.allow_moves);
	}

	#[rstest]
	fn test_malformed_document_is_a_parse_error() {
		let err = Settings::from_toml_str("[reactive\nmax_update_depth = 1").unwrap_err();
		assert!(matches!(err, SettingsError::ParseError(_)));
	}

	#[rstest]
	fn test_missing_file_is_a_file_error() {
		let err = Settings::from_file("/nonexistent/grappelli.toml").unwrap_err();
		assert!(matches!(err, SettingsError::FileError(_)));
	}

	#[rstest]
	#[serial]
	fn test_apply_installs_reactive_settings() {
		let settings = Settings::from_toml_str("[reactive]\nmax_update_depth = 3").unwrap();

		settings.apply();
		let installed = with_runtime(|rt| rt.settings().max_update_depth);
		configure(ReactiveSettings::default());

		assert_eq!(installed, 3);
	}
}
