//! Records: shared maps of named fields.
//!
//! Reads and writes go through [`Record::get`] and [`Record::set`]. Once the
//! record has been passed to [`observe`](crate::observe), every configurable
//! field carries its own [`Dep`]: `get` registers the active subscriber on it
//! and a changing `set` notifies it.

use core::fmt;
use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use once_cell::unsync::OnceCell;

use crate::dep::Dep;
use crate::error::ReactiveError;
use crate::observer::{Observer, define_reactive_field, existing_observer, observe};
use crate::value::Value;

pub(crate) struct Slot {
	pub(crate) value: Value,
	pub(crate) dep: Option<Rc<Dep>>,
	pub(crate) configurable: bool,
}

impl Slot {
	fn new(value: Value, configurable: bool) -> Self {
		Self {
			value,
			dep: None,
			configurable,
		}
	}
}

struct RecordInner {
	slots: RefCell<IndexMap<String, Slot>>,
	observer: OnceCell<Observer>,
}

/// A shared, insertion-ordered map of named fields.
///
/// Cloning a `Record` yields another handle to the same fields.
#[derive(Clone)]
pub struct Record {
	inner: Rc<RecordInner>,
}

impl Record {
	/// Create an empty record
	pub fn new() -> Self {
		Self::from_slots(IndexMap::new())
	}

	/// Create a record from `(name, value)` pairs
	pub fn from_fields<K, V, I>(fields: I) -> Self
	where
		K: Into<String>,
		V: Into<Value>,
		I: IntoIterator<Item = (K, V)>,
	{
		let mut builder = Self::builder();
		for (name, value) in fields {
			builder = builder.field(name, value);
		}
		builder.build()
	}

	/// Start building a record
	pub fn builder() -> RecordBuilder {
		RecordBuilder::default()
	}

	fn from_slots(slots: IndexMap<String, Slot>) -> Self {
		Self {
			inner: Rc::new(RecordInner {
				slots: RefCell::new(slots),
				observer: OnceCell::new(),
			}),
		}
	}

	/// Read a field, registering the active subscriber on it.
	///
	/// Reading a missing field of an observed record registers on the record's
	/// own node instead, so a later [`insert`](Self::insert) is noticed.
	pub fn get(&self, name: &str) -> Option<Value> {
		let found = self
			.inner
			.slots
			.borrow()
			.get(name)
			.map(|slot| (slot.value.clone(), slot.dep.clone()));

		let Some((value, dep)) = found else {
			self.depend_on_shape();
			return None;
		};

		if let Some(dep) = dep {
			dep.depend();
			// Mutations of a nested container reach readers of this field too.
			if let Some(child) = existing_observer(&value) {
				child.dep().depend();
			}
		}
		Some(value)
	}

	/// Read a field without registering anything
	pub fn get_untracked(&self, name: &str) -> Option<Value> {
		self.inner.slots.borrow().get(name).map(|slot| slot.value.clone())
	}

	/// Write a field.
	///
	/// Writing a value that is the same as the current one does nothing.
	/// Otherwise the value is stored, observed if it is a container, and the
	/// field's subscribers are notified. Writing a missing field inserts it.
	pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), ReactiveError> {
		let value = value.into();
		if !self.contains_key_untracked(name) {
			return self.insert(name, value);
		}

		let dep = {
			let mut slots = self.inner.slots.borrow_mut();
			let Some(slot) = slots.get_mut(name) else {
				return Ok(());
			};
			match slot.dep.clone() {
				Some(dep) => {
					if slot.value.same(&value) {
						return Ok(());
					}
					slot.value = value.clone();
					dep
				}
				None => {
					slot.value = value;
					return Ok(());
				}
			}
		};

		observe(&value);
		dep.notify()
	}

	/// Add a field. On an observed record the field is instrumented and the
	/// record's own subscribers are notified. An existing field is
	/// [`set`](Self::set) instead.
	pub fn insert(&self, name: impl Into<String>, value: impl Into<Value>) -> Result<(), ReactiveError> {
		let name = name.into();
		let value = value.into();
		if self.contains_key_untracked(&name) {
			return self.set(&name, value);
		}

		self.inner.slots.borrow_mut().insert(name.clone(), Slot::new(value, true));

		let Some(observer) = self.inner.observer.get().cloned() else {
			return Ok(());
		};
		define_reactive_field(self, &name, None);
		observer.dep().notify()
	}

	/// Delete a field and notify the record's own subscribers.
	///
	/// Fixed fields (see [`RecordBuilder::fixed`]) cannot be removed; `None`
	/// is returned for them as for missing fields.
	pub fn remove(&self, name: &str) -> Result<Option<Value>, ReactiveError> {
		let removed = {
			let mut slots = self.inner.slots.borrow_mut();
			match slots.get(name) {
				Some(slot) if slot.configurable => slots.shift_remove(name),
				_ => None,
			}
		};

		let Some(slot) = removed else {
			return Ok(None);
		};
		if let Some(observer) = self.inner.observer.get().cloned() {
			observer.dep().notify()?;
		}
		Ok(Some(slot.value))
	}

	/// Field names in insertion order (tracked on the record's own node)
	pub fn keys(&self) -> Vec<String> {
		self.depend_on_shape();
		self.keys_untracked()
	}

	/// Field names in insertion order
	pub fn keys_untracked(&self) -> Vec<String> {
		self.inner.slots.borrow().keys().cloned().collect()
	}

	/// Number of fields (tracked on the record's own node)
	pub fn len(&self) -> usize {
		self.depend_on_shape();
		self.inner.slots.borrow().len()
	}

	/// Whether the record has no fields (tracked on the record's own node)
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Whether a field exists (tracked on the record's own node)
	pub fn contains_key(&self, name: &str) -> bool {
		self.depend_on_shape();
		self.contains_key_untracked(name)
	}

	fn contains_key_untracked(&self, name: &str) -> bool {
		self.inner.slots.borrow().contains_key(name)
	}

	/// Snapshot of all fields without registering anything
	pub fn entries_untracked(&self) -> Vec<(String, Value)> {
		self.inner
			.slots
			.borrow()
			.iter()
			.map(|(name, slot)| (name.clone(), slot.value.clone()))
			.collect()
	}

	/// The dependency node of a field, once it has been instrumented
	pub fn field_dep(&self, name: &str) -> Option<Rc<Dep>> {
		self.inner.slots.borrow().get(name).and_then(|slot| slot.dep.clone())
	}

	/// The observer attached by [`observe`](crate::observe), if any
	pub fn observer(&self) -> Option<Observer> {
		self.inner.observer.get().cloned()
	}

	/// Whether the record has been observed
	pub fn is_observed(&self) -> bool {
		self.inner.observer.get().is_some()
	}

	/// Returns true if both handles refer to the same record
	pub fn ptr_eq(a: &Record, b: &Record) -> bool {
		Rc::ptr_eq(&a.inner, &b.inner)
	}

	pub(crate) fn slots(&self) -> &RefCell<IndexMap<String, Slot>> {
		&self.inner.slots
	}

	pub(crate) fn observer_cell(&self) -> &OnceCell<Observer> {
		&self.inner.observer
	}

	fn depend_on_shape(&self) {
		if let Some(observer) = self.inner.observer.get() {
			observer.dep().depend();
		}
	}
}

impl Default for Record {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Record {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.inner.slots.try_borrow() {
			Ok(slots) => f
				.debug_map()
				.entries(slots.iter().map(|(name, slot)| (name, &slot.value)))
				.finish(),
			Err(_) => f.write_str("Record { <borrowed> }"),
		}
	}
}

/// Builder for [`Record`].
#[derive(Default)]
pub struct RecordBuilder {
	slots: IndexMap<String, Slot>,
}

impl RecordBuilder {
	/// Add an ordinary field
	pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.slots.insert(name.into(), Slot::new(value.into(), true));
		self
	}

	/// Add a fixed field: it is stored and readable but never instrumented,
	/// so writes to it do not notify anyone.
	pub fn fixed(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.slots.insert(name.into(), Slot::new(value.into(), false));
		self
	}

	/// Finish the record
	pub fn build(self) -> Record {
		Record::from_slots(self.slots)
	}
}
