//! Dynamic values held in observable state.

use core::cmp::Ordering;
use core::fmt;

use grappelli_types::VNode;

use crate::record::Record;
use crate::sequence::Sequence;

/// A value stored in observable state.
///
/// Records and sequences are shared handles: cloning a `Value` holding one
/// yields another handle to the same container. UI nodes can be stored but are
/// never made observable.
#[derive(Clone, Default)]
pub enum Value {
	/// Absence of a value.
	#[default]
	Null,
	/// Boolean.
	Bool(bool),
	/// Number.
	Number(f64),
	/// String.
	String(String),
	/// Named fields.
	Record(Record),
	/// Ordered list.
	Sequence(Sequence),
	/// A virtual UI node.
	Node(VNode),
}

impl Value {
	/// Whether writing `other` over `self` would be a no-op.
	///
	/// Primitives compare by value (NaN is the same as NaN); records, sequences
	/// and nodes compare by identity.
	pub fn same(&self, other: &Value) -> bool {
		match (self, other) {
			(Value::Null, Value::Null) => true,
			(Value::Bool(a), Value::Bool(b)) => a == b,
			(Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
			(Value::String(a), Value::String(b)) => a == b,
			(Value::Record(a), Value::Record(b)) => Record::ptr_eq(a, b),
			(Value::Sequence(a), Value::Sequence(b)) => Sequence::ptr_eq(a, b),
			(Value::Node(a), Value::Node(b)) => VNode::ptr_eq(a, b),
			_ => false,
		}
	}

	/// Returns true for [`Value::Null`].
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	/// The boolean, if this is one.
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(b) => Some(*b),
			_ => None,
		}
	}

	/// The number, if this is one.
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Value::Number(n) => Some(*n),
			_ => None,
		}
	}

	/// The string, if this is one.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(s) => Some(s),
			_ => None,
		}
	}

	/// The record, if this is one.
	pub fn as_record(&self) -> Option<&Record> {
		match self {
			Value::Record(r) => Some(r),
			_ => None,
		}
	}

	/// The sequence, if this is one.
	pub fn as_sequence(&self) -> Option<&Sequence> {
		match self {
			Value::Sequence(s) => Some(s),
			_ => None,
		}
	}

	/// The UI node, if this is one.
	pub fn as_node(&self) -> Option<&VNode> {
		match self {
			Value::Node(n) => Some(n),
			_ => None,
		}
	}

	fn rank(&self) -> u8 {
		match self {
			Value::Null => 0,
			Value::Bool(_) => 1,
			Value::Number(_) => 2,
			Value::String(_) => 3,
			Value::Record(_) => 4,
			Value::Sequence(_) => 5,
			Value::Node(_) => 6,
		}
	}

	/// Total order used by [`Sequence::sort`].
	///
	/// Values of different variants order by variant (null, bool, number,
	/// string, record, sequence, node). Numbers use IEEE total ordering.
	/// Containers and nodes of the same variant compare equal.
	pub fn total_cmp(&self, other: &Value) -> Ordering {
		match (self, other) {
			(Value::Bool(a), Value::Bool(b)) => a.cmp(b),
			(Value::Number(a), Value::Number(b)) => a.total_cmp(b),
			(Value::String(a), Value::String(b)) => a.cmp(b),
			_ => self.rank().cmp(&other.rank()),
		}
	}

	/// Build a value from JSON. Objects become records and arrays become
	/// sequences; neither is observed yet.
	pub fn from_json(json: serde_json::Value) -> Value {
		match json {
			serde_json::Value::Null => Value::Null,
			serde_json::Value::Bool(b) => Value::Bool(b),
			serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
			serde_json::Value::String(s) => Value::String(s),
			serde_json::Value::Array(items) => {
				Value::Sequence(Sequence::from_values(items.into_iter().map(Value::from_json)))
			}
			serde_json::Value::Object(fields) => Value::Record(Record::from_fields(
				fields.into_iter().map(|(k, v)| (k, Value::from_json(v))),
			)),
		}
	}

	/// Snapshot this value as JSON without registering any dependency.
	///
	/// Non-finite numbers and UI nodes become `null`.
	pub fn to_json(&self) -> serde_json::Value {
		match self {
			Value::Null | Value::Node(_) => serde_json::Value::Null,
			Value::Bool(b) => serde_json::Value::Bool(*b),
			Value::Number(n) => serde_json::Number::from_f64(*n)
				.map(serde_json::Value::Number)
				.unwrap_or(serde_json::Value::Null),
			Value::String(s) => serde_json::Value::String(s.clone()),
			Value::Record(r) => serde_json::Value::Object(
				r.entries_untracked()
					.into_iter()
					.map(|(k, v)| (k, v.to_json()))
					.collect(),
			),
			Value::Sequence(s) => {
				serde_json::Value::Array(s.to_vec_untracked().iter().map(Value::to_json).collect())
			}
		}
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		self.same(other)
	}
}

impl fmt::Debug for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => f.write_str("Null"),
			Value::Bool(b) => write!(f, "Bool({b})"),
			Value::Number(n) => write!(f, "Number({n})"),
			Value::String(s) => write!(f, "String({s:?})"),
			Value::Record(r) => fmt::Debug::fmt(r, f),
			Value::Sequence(s) => fmt::Debug::fmt(s, f),
			Value::Node(n) => fmt::Debug::fmt(n, f),
		}
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Value::Bool(value)
	}
}

impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Value::Number(value)
	}
}

impl From<i32> for Value {
	fn from(value: i32) -> Self {
		Value::Number(f64::from(value))
	}
}

impl From<u32> for Value {
	fn from(value: u32) -> Self {
		Value::Number(f64::from(value))
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Value::String(value.to_string())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Value::String(value)
	}
}

impl From<Record> for Value {
	fn from(value: Record) -> Self {
		Value::Record(value)
	}
}

impl From<Sequence> for Value {
	fn from(value: Sequence) -> Self {
		Value::Sequence(value)
	}
}

impl From<VNode> for Value {
	fn from(value: VNode) -> Self {
		Value::Node(value)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map(Into::into).unwrap_or(Value::Null)
	}
}
