//! Virtual node types.
//!
//! This module provides [`VNode`], the immutable-per-render description of one
//! node of a UI tree.
//!
//! ## Overview
//!
//! A `VNode` is a cheap, reference-counted handle. Cloning it yields the *same*
//! node (identity is preserved and can be checked with [`VNode::ptr_eq`]),
//! which lets the reconciler skip subtrees that were reused between two
//! renders. The only field written after construction is the back-reference to
//! the real node ([`VNode::elm`]), which the reconciler fills in.
//!
//! Nodes are classified purely by shape:
//!
//! - a tag is present: element
//! - the comment flag is set: comment
//! - otherwise: text
//!
//! ## Example
//!
//! ```
//! use grappelli_types::{VNode, VNodeKind};
//!
//! let list = VNode::element("ul")
//!     .attr("class", "todo")
//!     .child(VNode::element("li").with_key("a").with_text("first"))
//!     .child(VNode::element("li").with_key("b").with_text("second"));
//!
//! assert_eq!(list.kind(), VNodeKind::Element);
//! assert_eq!(list.child_nodes().map(|c| c.len()), Some(2));
//! ```

use core::cell::Cell;
use core::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::handle::NodeHandle;

/// Stable identity hint used to match nodes across renders.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
	/// String key.
	Str(String),
	/// Integer key.
	Int(i64),
}

impl fmt::Display for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Key::Str(s) => write!(f, "{s:?}"),
			Key::Int(n) => write!(f, "{n}"),
		}
	}
}

impl From<&str> for Key {
	fn from(value: &str) -> Self {
		Key::Str(value.to_string())
	}
}

impl From<String> for Key {
	fn from(value: String) -> Self {
		Key::Str(value)
	}
}

impl From<i64> for Key {
	fn from(value: i64) -> Self {
		Key::Int(value)
	}
}

impl From<i32> for Key {
	fn from(value: i32) -> Self {
		Key::Int(i64::from(value))
	}
}

impl From<u32> for Key {
	fn from(value: u32) -> Self {
		Key::Int(i64::from(value))
	}
}

/// Data attached to an element: key and attributes.
///
/// Whether a node carries data at all is significant: two nodes are only
/// considered the same logical node when both or neither have data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VNodeData {
	/// Optional stable key.
	pub key: Option<Key>,
	/// Attributes in declaration order.
	pub attrs: IndexMap<String, String>,
}

impl VNodeData {
	/// Returns the value of an attribute.
	pub fn attr(&self, name: &str) -> Option<&str> {
		self.attrs.get(name).map(String::as_str)
	}
}

/// Shape classification of a [`VNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VNodeKind {
	/// Element with a tag.
	Element,
	/// Comment node.
	Comment,
	/// Text run.
	Text,
}

#[derive(Clone)]
struct VNodeInner {
	tag: Option<String>,
	data: Option<VNodeData>,
	children: Option<Rc<[VNode]>>,
	text: Option<String>,
	key: Option<Key>,
	elm: Cell<Option<NodeHandle>>,
	is_static: bool,
	is_comment: bool,
	is_cloned: bool,
	is_once: bool,
}

impl VNodeInner {
	fn blank() -> Self {
		Self {
			tag: None,
			data: None,
			children: None,
			text: None,
			key: None,
			elm: Cell::new(None),
			is_static: false,
			is_comment: false,
			is_cloned: false,
			is_once: false,
		}
	}
}

/// A node of a virtual UI tree.
///
/// See the [module documentation](self) for the identity rules.
#[derive(Clone)]
pub struct VNode {
	inner: Rc<VNodeInner>,
}

impl VNode {
	/// Creates an element node with an empty child list.
	pub fn element(tag: impl Into<String>) -> Self {
		let mut inner = VNodeInner::blank();
		inner.tag = Some(tag.into());
		inner.children = Some(Rc::from(Vec::new()));
		Self::from_inner(inner)
	}

	/// Creates a text node.
	pub fn text(value: impl Into<String>) -> Self {
		let mut inner = VNodeInner::blank();
		inner.text = Some(value.into());
		Self::from_inner(inner)
	}

	/// Creates a comment node.
	pub fn comment(text: impl Into<String>) -> Self {
		let mut inner = VNodeInner::blank();
		inner.text = Some(text.into());
		inner.is_comment = true;
		Self::from_inner(inner)
	}

	/// Creates an empty placeholder (a comment with no text).
	pub fn empty() -> Self {
		Self::comment("")
	}

	/// Shallow-clones this node.
	///
	/// The copy gets its own child list (holding the same child nodes), keeps
	/// the real-node back-reference, key, static and comment flags, and is
	/// marked as cloned. The once flag is not carried over.
	pub fn cloned(&self) -> Self {
		let source = &self.inner;
		Self::from_inner(VNodeInner {
			tag: source.tag.clone(),
			data: source.data.clone(),
			children: source.children.as_deref().map(Rc::from),
			text: source.text.clone(),
			key: source.key.clone(),
			elm: Cell::new(source.elm.get()),
			is_static: source.is_static,
			is_comment: source.is_comment,
			is_cloned: true,
			is_once: false,
		})
	}

	fn from_inner(inner: VNodeInner) -> Self {
		Self {
			inner: Rc::new(inner),
		}
	}

	// Copy-on-write: editing a node that is already shared produces a new node.
	fn edit(self, f: impl FnOnce(&mut VNodeInner)) -> Self {
		let mut inner = Rc::try_unwrap(self.inner).unwrap_or_else(|shared| (*shared).clone());
		f(&mut inner);
		Self::from_inner(inner)
	}

	/// Sets the stable key (creating node data if absent).
	pub fn with_key(self, key: impl Into<Key>) -> Self {
		let key = key.into();
		self.edit(|inner| {
			inner.data.get_or_insert_with(VNodeData::default).key = Some(key.clone());
			inner.key = Some(key);
		})
	}

	/// Replaces the node data; the key is taken from it.
	pub fn with_data(self, data: VNodeData) -> Self {
		self.edit(|inner| {
			inner.key = data.key.clone();
			inner.data = Some(data);
		})
	}

	/// Sets an attribute (creating node data if absent).
	pub fn attr(self, name: impl Into<String>, value: impl Into<String>) -> Self {
		let (name, value) = (name.into(), value.into());
		self.edit(|inner| {
			inner
				.data
				.get_or_insert_with(VNodeData::default)
				.attrs
				.insert(name, value);
		})
	}

	/// Appends a child, dropping any text payload.
	pub fn child(self, child: VNode) -> Self {
		self.edit(|inner| {
			let mut children: Vec<VNode> = inner.children.as_deref().map(<[VNode]>::to_vec).unwrap_or_default();
			children.push(child);
			inner.children = Some(Rc::from(children));
			inner.text = None;
		})
	}

	/// Replaces the child list, dropping any text payload.
	pub fn children(self, children: impl IntoIterator<Item = VNode>) -> Self {
		let children: Vec<VNode> = children.into_iter().collect();
		self.edit(|inner| {
			inner.children = Some(Rc::from(children));
			inner.text = None;
		})
	}

	/// Sets the text payload, dropping any child list.
	pub fn with_text(self, text: impl Into<String>) -> Self {
		let text = text.into();
		self.edit(|inner| {
			inner.text = Some(text);
			inner.children = None;
		})
	}

	/// Marks the node as static (free of variable content).
	pub fn mark_static(self) -> Self {
		self.edit(|inner| inner.is_static = true)
	}

	/// Marks the node as rendered once.
	pub fn mark_once(self) -> Self {
		self.edit(|inner| inner.is_once = true)
	}

	/// Returns the tag of an element node.
	pub fn tag_name(&self) -> Option<&str> {
		self.inner.tag.as_deref()
	}

	/// Returns the node data.
	pub fn data(&self) -> Option<&VNodeData> {
		self.inner.data.as_ref()
	}

	/// Returns the child list, if the node has one.
	pub fn child_nodes(&self) -> Option<&[VNode]> {
		self.inner.children.as_deref()
	}

	/// Returns the text payload.
	pub fn text_content(&self) -> Option<&str> {
		self.inner.text.as_deref()
	}

	/// Returns the stable key.
	pub fn key(&self) -> Option<&Key> {
		self.inner.key.as_ref()
	}

	/// Returns the real node this virtual node last produced or patched.
	pub fn elm(&self) -> Option<NodeHandle> {
		self.inner.elm.get()
	}

	/// Records the real node backing this virtual node.
	pub fn set_elm(&self, elm: Option<NodeHandle>) {
		self.inner.elm.set(elm);
	}

	/// Whether the node is static.
	pub fn is_static(&self) -> bool {
		self.inner.is_static
	}

	/// Whether the node is a comment.
	pub fn is_comment(&self) -> bool {
		self.inner.is_comment
	}

	/// Whether the node was produced by [`VNode::cloned`].
	pub fn is_cloned(&self) -> bool {
		self.inner.is_cloned
	}

	/// Whether the node is rendered once.
	pub fn is_once(&self) -> bool {
		self.inner.is_once
	}

	/// Classifies the node by shape.
	pub fn kind(&self) -> VNodeKind {
		if self.inner.tag.is_some() {
			VNodeKind::Element
		} else if self.inner.is_comment {
			VNodeKind::Comment
		} else {
			VNodeKind::Text
		}
	}

	/// Returns true if both handles refer to the same node.
	pub fn ptr_eq(a: &VNode, b: &VNode) -> bool {
		Rc::ptr_eq(&a.inner, &b.inner)
	}

	/// Returns true if both nodes hold the very same child list.
	pub fn shares_children_with(&self, other: &VNode) -> bool {
		match (&self.inner.children, &other.inner.children) {
			(Some(a), Some(b)) => Rc::ptr_eq(a, b),
			_ => false,
		}
	}
}

impl fmt::Debug for VNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut debug = f.debug_struct("VNode");
		debug.field("kind", &self.kind());
		if let Some(tag) = self.tag_name() {
			debug.field("tag", &tag);
		}
		if let Some(key) = self.key() {
			debug.field("key", key);
		}
		if let Some(text) = self.text_content() {
			debug.field("text", &text);
		}
		if let Some(children) = self.child_nodes() {
			debug.field("children", &children);
		}
		debug.field("elm", &self.elm()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case::element(VNode::element("div"), VNodeKind::Element)]
	#[case::text(VNode::text("hello"), VNodeKind::Text)]
	#[case::comment(VNode::comment("note"), VNodeKind::Comment)]
	#[case::empty(VNode::empty(), VNodeKind::Comment)]
	fn test_kind_follows_shape(#[case] node: VNode, #[case] expected: VNodeKind) {
		assert_eq!(node.kind(), expected);
	}

	#[rstest]
	fn test_text_and_children_are_exclusive() {
		let node = VNode::element("p").with_text("hi");
		assert_eq!(node.text_content(), Some("hi"));
		assert!(node.child_nodes().is_none());

		let node = node.child(VNode::element("span"));
		assert!(node.text_content().is_none());
		assert_eq!(node.child_nodes().map(<[VNode]>::len), Some(1));
	}

	#[rstest]
	fn test_key_creates_data() {
		let node = VNode::element("li").with_key("a");
		assert_eq!(node.key(), Some(&Key::from("a")));
		assert_eq!(node.data().and_then(|d| d.key.clone()), Some(Key::from("a")));
	}

	#[rstest]
	fn test_clone_shares_identity() {
		let node = VNode::element("div");
		let same = node.clone();
		assert!(VNode::ptr_eq(&node, &same));
	}

	#[rstest]
	fn test_cloned_copies_children_list_and_flags() {
		let child = VNode::text("x");
		let original = VNode::element("div")
			.with_key(1)
			.child(child.clone())
			.mark_static()
			.mark_once();
		original.set_elm(Some(NodeHandle::new(3)));

		let copy = original.cloned();

		assert!(!VNode::ptr_eq(&original, &copy));
		assert!(copy.is_cloned());
		assert!(copy.is_static());
		assert!(!copy.is_once());
		assert_eq!(copy.key(), Some(&Key::Int(1)));
		assert_eq!(copy.elm(), Some(NodeHandle::new(3)));
		assert!(!copy.shares_children_with(&original));
		let copied_children = copy.child_nodes().unwrap_or_default();
		assert!(VNode::ptr_eq(&copied_children[0], &child));
	}

	#[rstest]
	fn test_editing_shared_node_copies() {
		let node = VNode::element("div");
		let alias = node.clone();
		let edited = node.attr("id", "main");

		assert!(!VNode::ptr_eq(&edited, &alias));
		assert!(alias.data().is_none());
		assert_eq!(edited.data().and_then(|d| d.attr("id")), Some("main"));
	}
}
