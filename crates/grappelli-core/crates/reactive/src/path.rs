//! Dotted path expressions such as `user.address.city` or `items.0.title`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ReactiveError;
use crate::value::Value;

// Letters and digits of any script, plus `$` and `_`, in non-empty segments.
static PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"^[\p{L}\p{N}$_]+(?:\.[\p{L}\p{N}$_]+)*$").expect("Invalid path regex pattern")
});

/// A parsed dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
	source: String,
	segments: Vec<String>,
}

impl Path {
	/// Parse a dotted path.
	///
	/// # Errors
	///
	/// [`ReactiveError::InvalidPath`] when the string is not a `.`-separated
	/// list of non-empty identifier segments.
	///
	/// # Example
	///
	/// ```
	/// use grappelli_reactive::Path;
	///
	/// assert!(Path::parse("user.name").is_ok());
	/// assert!(Path::parse("user[0]").is_err());
	/// ```
	pub fn parse(path: &str) -> Result<Self, ReactiveError> {
		if !PATH_PATTERN.is_match(path) {
			return Err(ReactiveError::InvalidPath {
				path: path.to_string(),
			});
		}
		Ok(Self {
			source: path.to_string(),
			segments: path.split('.').map(str::to_string).collect(),
		})
	}

	/// The path as written
	pub fn as_str(&self) -> &str {
		&self.source
	}

	/// The segments of the path
	pub fn segments(&self) -> &[String] {
		&self.segments
	}

	/// Walk the path from `root`, reading through the tracked accessors.
	///
	/// Records are entered by field name, sequences by numeric index (or
	/// `length`). A missing link anywhere yields [`Value::Null`].
	pub fn resolve(&self, root: &Value) -> Value {
		let mut current = root.clone();
		for segment in &self.segments {
			current = match &current {
				Value::Record(record) => record.get(segment).unwrap_or_default(),
				Value::Sequence(sequence) if segment == "length" => Value::from(sequence.len() as f64),
				Value::Sequence(sequence) => segment
					.parse::<usize>()
					.ok()
					.and_then(|index| sequence.get(index))
					.unwrap_or_default(),
				_ => return Value::Null,
			};
		}
		current
	}
}

impl core::fmt::Display for Path {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.write_str(&self.source)
	}
}

/// Parse a dotted path; see [`Path::parse`].
pub fn parse_path(path: &str) -> Result<Path, ReactiveError> {
	Path::parse(path)
}
