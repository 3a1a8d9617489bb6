//! Sequences: shared ordered lists with intercepted mutations.
//!
//! Index writes cannot be seen by the runtime, so every change to an observed
//! sequence goes through one of its mutating methods: [`push`](Sequence::push),
//! [`pop`](Sequence::pop), [`shift`](Sequence::shift),
//! [`unshift`](Sequence::unshift), [`splice`](Sequence::splice),
//! [`sort`](Sequence::sort) / [`sort_by`](Sequence::sort_by),
//! [`reverse`](Sequence::reverse), and [`set`](Sequence::set) which is a
//! one-element splice. Each performs the list operation, observes any inserted
//! elements, notifies the sequence's own node and hands back the operation's
//! usual result.

use core::cmp::Ordering;
use core::fmt;
use std::cell::RefCell;
use std::rc::Rc;

use once_cell::unsync::OnceCell;

use crate::error::ReactiveError;
use crate::observer::{Observer, observe};
use crate::value::Value;

struct SequenceInner {
	items: RefCell<Vec<Value>>,
	observer: OnceCell<Observer>,
}

/// A shared ordered list of values.
#[derive(Clone)]
pub struct Sequence {
	inner: Rc<SequenceInner>,
}

impl Sequence {
	/// Create an empty sequence
	pub fn new() -> Self {
		Self::from_values(Vec::<Value>::new())
	}

	/// Create a sequence holding `values`
	pub fn from_values<V, I>(values: I) -> Self
	where
		V: Into<Value>,
		I: IntoIterator<Item = V>,
	{
		Self {
			inner: Rc::new(SequenceInner {
				items: RefCell::new(values.into_iter().map(Into::into).collect()),
				observer: OnceCell::new(),
			}),
		}
	}

	// Post-mutation bookkeeping shared by all mutators.
	fn changed(&self, inserted: &[Value]) -> Result<(), ReactiveError> {
		let Some(observer) = self.inner.observer.get().cloned() else {
			return Ok(());
		};
		for item in inserted {
			observe(item);
		}
		observer.dep().notify()
	}

	/// Append an element; returns the new length
	pub fn push(&self, value: impl Into<Value>) -> Result<usize, ReactiveError> {
		let value = value.into();
		let len = {
			let mut items = self.inner.items.borrow_mut();
			items.push(value.clone());
			items.len()
		};
		self.changed(&[value])?;
		Ok(len)
	}

	/// Remove the last element
	pub fn pop(&self) -> Result<Option<Value>, ReactiveError> {
		let popped = self.inner.items.borrow_mut().pop();
		self.changed(&[])?;
		Ok(popped)
	}

	/// Remove the first element
	pub fn shift(&self) -> Result<Option<Value>, ReactiveError> {
		let shifted = {
			let mut items = self.inner.items.borrow_mut();
			if items.is_empty() { None } else { Some(items.remove(0)) }
		};
		self.changed(&[])?;
		Ok(shifted)
	}

	/// Insert an element at the front; returns the new length
	pub fn unshift(&self, value: impl Into<Value>) -> Result<usize, ReactiveError> {
		let value = value.into();
		let len = {
			let mut items = self.inner.items.borrow_mut();
			items.insert(0, value.clone());
			items.len()
		};
		self.changed(&[value])?;
		Ok(len)
	}

	/// Remove `delete_count` elements starting at `start` and insert `items`
	/// in their place; returns the removed elements.
	///
	/// `start` and `delete_count` are clamped to the sequence bounds.
	pub fn splice<V, I>(&self, start: usize, delete_count: usize, items: I) -> Result<Vec<Value>, ReactiveError>
	where
		V: Into<Value>,
		I: IntoIterator<Item = V>,
	{
		let inserted: Vec<Value> = items.into_iter().map(Into::into).collect();
		let removed = {
			let mut current = self.inner.items.borrow_mut();
			let start = start.min(current.len());
			let end = start.saturating_add(delete_count).min(current.len());
			current.splice(start..end, inserted.iter().cloned()).collect::<Vec<_>>()
		};
		self.changed(&inserted)?;
		Ok(removed)
	}

	/// Sort with [`Value::total_cmp`]
	pub fn sort(&self) -> Result<(), ReactiveError> {
		self.sort_by(Value::total_cmp)
	}

	/// Sort with a comparator (stable)
	pub fn sort_by<F>(&self, compare: F) -> Result<(), ReactiveError>
	where
		F: FnMut(&Value, &Value) -> Ordering,
	{
		// The comparator is user code: sort a copy outside the borrow, so it
		// sees the current elements and an unwinding comparator changes nothing.
		let mut items = self.inner.items.borrow().clone();
		items.sort_by(compare);
		*self.inner.items.borrow_mut() = items;
		self.changed(&[])
	}

	/// Reverse in place
	pub fn reverse(&self) -> Result<(), ReactiveError> {
		self.inner.items.borrow_mut().reverse();
		self.changed(&[])
	}

	/// Replace the element at `index`; returns the previous element.
	///
	/// Writing past the end pads the sequence with nulls first.
	pub fn set(&self, index: usize, value: impl Into<Value>) -> Result<Option<Value>, ReactiveError> {
		{
			let mut items = self.inner.items.borrow_mut();
			if index > items.len() {
				items.resize(index, Value::Null);
			}
		}
		Ok(self.splice(index, 1, [value.into()])?.into_iter().next())
	}

	/// Read the element at `index`, registering the active subscriber on the
	/// sequence
	pub fn get(&self, index: usize) -> Option<Value> {
		self.depend();
		self.get_untracked(index)
	}

	/// Read the element at `index` without registering anything
	pub fn get_untracked(&self, index: usize) -> Option<Value> {
		self.inner.items.borrow().get(index).cloned()
	}

	/// Number of elements (tracked)
	pub fn len(&self) -> usize {
		self.depend();
		self.inner.items.borrow().len()
	}

	/// Whether the sequence is empty (tracked)
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Snapshot of all elements (tracked)
	pub fn to_vec(&self) -> Vec<Value> {
		self.depend();
		self.to_vec_untracked()
	}

	/// Snapshot of all elements without registering anything
	pub fn to_vec_untracked(&self) -> Vec<Value> {
		self.inner.items.borrow().clone()
	}

	/// The observer attached by [`observe`](crate::observe), if any
	pub fn observer(&self) -> Option<Observer> {
		self.inner.observer.get().cloned()
	}

	/// Whether the sequence has been observed
	pub fn is_observed(&self) -> bool {
		self.inner.observer.get().is_some()
	}

	/// Returns true if both handles refer to the same sequence
	pub fn ptr_eq(a: &Sequence, b: &Sequence) -> bool {
		Rc::ptr_eq(&a.inner, &b.inner)
	}

	pub(crate) fn observer_cell(&self) -> &OnceCell<Observer> {
		&self.inner.observer
	}

	fn depend(&self) {
		if let Some(observer) = self.inner.observer.get() {
			observer.dep().depend();
		}
	}
}

impl Default for Sequence {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Sequence {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.inner.items.try_borrow() {
			Ok(items) => f.debug_list().entries(items.iter()).finish(),
			Err(_) => f.write_str("Sequence [<borrowed>]"),
		}
	}
}

impl<V: Into<Value>> FromIterator<V> for Sequence {
	fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
		Self::from_values(iter)
	}
}
