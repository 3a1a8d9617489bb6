//! Error types for the reactive runtime.

use thiserror::Error;

use crate::runtime::NodeId;

/// Boxed error returned by fallible evaluators and callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by subscribers and reactive writes.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ReactiveError {
	/// A path expression contained something other than `.`-separated
	/// identifier segments.
	#[error("invalid path expression: {path:?}")]
	InvalidPath {
		/// The rejected path.
		path: String,
	},
	/// A fallible evaluator failed.
	#[error("subscriber {subscriber} failed to evaluate")]
	Evaluation {
		/// The failing subscriber.
		subscriber: NodeId,
		/// The evaluator's error.
		#[source]
		source: BoxError,
	},
	/// A change callback failed.
	#[error("change callback of subscriber {subscriber} failed")]
	Callback {
		/// The subscriber whose callback failed.
		subscriber: NodeId,
		/// The callback's error.
		#[source]
		source: BoxError,
	},
	/// A subscriber re-triggered itself more often than allowed.
	#[error("subscriber {subscriber} re-entered its own update more than {limit} times")]
	UpdateLoop {
		/// The looping subscriber.
		subscriber: NodeId,
		/// The configured limit.
		limit: usize,
	},
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_invalid_path_message_quotes_path() {
		let err = ReactiveError::InvalidPath {
			path: "a[0]".to_string(),
		};
		assert_eq!(err.to_string(), "invalid path expression: \"a[0]\"");
	}

	#[rstest]
	fn test_callback_error_exposes_source() {
		let err = ReactiveError::Callback {
			subscriber: NodeId::new(),
			source: "boom".into(),
		};
		let source = std::error::Error::source(&err).map(ToString::to_string);
		assert_eq!(source.as_deref(), Some("boom"));
	}
}
