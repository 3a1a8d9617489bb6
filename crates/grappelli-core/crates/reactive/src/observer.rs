//! Turning plain values into observable state.
//!
//! [`observe`] instruments a record or sequence in place: every configurable
//! field of a record gets its own [`Dep`], every sequence gets one node for the
//! whole list, and nested containers are instrumented recursively. Each
//! container is instrumented at most once; the resulting [`Observer`] is kept
//! in a private write-once cell on the container.

use std::rc::Rc;

use crate::dep::Dep;
use crate::record::Record;
use crate::value::Value;

/// What an [`Observer`] is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservedKind {
	/// A record.
	Record,
	/// A sequence.
	Sequence,
}

/// Marker attached to an observed container.
///
/// Its dependency node stands for the container as a whole: structural
/// changes (sequence mutations, record field insertion and removal) notify it.
#[derive(Debug, Clone)]
pub struct Observer {
	dep: Rc<Dep>,
	kind: ObservedKind,
}

impl Observer {
	pub(crate) fn new(kind: ObservedKind) -> Self {
		Self {
			dep: Rc::new(Dep::new()),
			kind,
		}
	}

	/// The container's own dependency node
	pub fn dep(&self) -> &Rc<Dep> {
		&self.dep
	}

	/// What kind of container this observer is attached to
	pub fn kind(&self) -> ObservedKind {
		self.kind
	}
}

/// Make `value` observable.
///
/// Returns `None` for primitives and UI nodes. A container that is already
/// observed returns its existing observer; otherwise it is instrumented first.
///
/// # Example
///
/// ```
/// use grappelli_reactive::{Record, Value, observe};
///
/// let state = Value::Record(Record::from_fields([("count", 0)]));
/// let first = observe(&state).unwrap();
/// let again = observe(&state).unwrap();
/// assert_eq!(first.dep().id(), again.dep().id());
/// assert!(observe(&Value::from(1)).is_none());
/// ```
pub fn observe(value: &Value) -> Option<Observer> {
	match value {
		Value::Record(record) => Some(observe_record(record)),
		Value::Sequence(sequence) => {
			if let Some(existing) = sequence.observer_cell().get() {
				return Some(existing.clone());
			}
			let observer = Observer::new(ObservedKind::Sequence);
			// Mark before walking so self-referencing structures terminate.
			let _ = sequence.observer_cell().set(observer.clone());
			for item in sequence.to_vec_untracked() {
				observe(&item);
			}
			tracing::trace!(dep = %observer.dep().id(), "sequence observed");
			Some(observer)
		}
		_ => None,
	}
}

fn observe_record(record: &Record) -> Observer {
	if let Some(existing) = record.observer_cell().get() {
		return existing.clone();
	}
	let observer = Observer::new(ObservedKind::Record);
	let _ = record.observer_cell().set(observer.clone());
	for name in record.keys_untracked() {
		define_reactive_field(record, &name, None);
	}
	tracing::trace!(dep = %observer.dep().id(), "record observed");
	observer
}

/// The observer of `value` if it has already been observed.
pub(crate) fn existing_observer(value: &Value) -> Option<Observer> {
	match value {
		Value::Record(record) => record.observer(),
		Value::Sequence(sequence) => sequence.observer(),
		_ => None,
	}
}

/// Instrument one field of `record`.
///
/// Gives the field its dependency node (keeping an existing one) and observes
/// its value if it is a container. When `initial` is given it replaces the
/// stored value first, without notifying.
///
/// Returns `false` and changes nothing when the field is missing or fixed.
pub fn define_reactive_field(record: &Record, name: &str, initial: Option<Value>) -> bool {
	let value = {
		let mut slots = record.slots().borrow_mut();
		let Some(slot) = slots.get_mut(name) else {
			return false;
		};
		if !slot.configurable {
			return false;
		}
		if let Some(initial) = initial {
			slot.value = initial;
		}
		if slot.dep.is_none() {
			slot.dep = Some(Rc::new(Dep::new()));
		}
		slot.value.clone()
	};

	observe(&value);
	true
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Sequence;
	use grappelli_types::VNode;
	use rstest::rstest;

	#[rstest]
	#[case::null(Value::Null)]
	#[case::number(Value::from(3))]
	#[case::string(Value::from("s"))]
	#[case::node(Value::Node(VNode::element("div")))]
	fn test_non_containers_are_not_observed(#[case] value: Value) {
		assert!(observe(&value).is_none());
	}

	#[rstest]
	fn test_observe_is_deep() {
		let inner = Record::from_fields([("leaf", 1)]);
		let list = Sequence::from_values([Value::from(Record::new())]);
		let outer = Record::from_fields([("inner", Value::from(inner.clone())), ("list", Value::from(list.clone()))]);

		let observer = observe(&Value::from(outer.clone())).unwrap();

		assert_eq!(observer.kind(), ObservedKind::Record);
		assert!(inner.is_observed());
		assert!(inner.field_dep("leaf").is_some());
		assert!(list.is_observed());
		assert!(list.get_untracked(0).and_then(|v| v.as_record().map(Record::is_observed)).unwrap());
	}

	#[rstest]
	fn test_define_reactive_field_skips_fixed_and_missing() {
		let record = Record::builder().fixed("frozen", 1).field("open", 2).build();

		assert!(!define_reactive_field(&record, "frozen", None));
		assert!(!define_reactive_field(&record, "missing", None));
		assert!(record.field_dep("frozen").is_none());

		assert!(define_reactive_field(&record, "open", Some(Value::from(5))));
		let first = record.field_dep("open").map(|d| d.id());
		assert!(define_reactive_field(&record, "open", None));
		assert_eq!(record.field_dep("open").map(|d| d.id()), first);
		assert_eq!(record.get_untracked("open"), Some(Value::from(5)));
	}

	#[rstest]
	fn test_self_referencing_record_terminates() {
		let record = Record::new();
		record.insert("me", record.clone()).unwrap();

		let observer = observe(&Value::from(record.clone()));

		assert!(observer.is_some());
		// Break the cycle so the test does not leak.
		record.remove("me").unwrap();
	}
}
