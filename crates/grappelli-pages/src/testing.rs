//! In-memory rendering backend for tests and examples.
//!
//! [`MemoryBackend`] keeps a small node arena and records every operation the
//! reconciler issues, so tests can assert both the final tree and the exact
//! operations that produced it.

use grappelli_types::{NodeHandle, VNode};
use thiserror::Error;

use crate::vdom::NodeOps;

/// One recorded backend operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendOp {
	/// An element was created.
	CreateElement {
		/// The new node.
		node: NodeHandle,
		/// Its tag.
		tag: String,
	},
	/// A text node was created.
	CreateText {
		/// The new node.
		node: NodeHandle,
		/// Its text.
		text: String,
	},
	/// A comment was created.
	CreateComment {
		/// The new node.
		node: NodeHandle,
		/// Its text.
		text: String,
	},
	/// Text content was replaced.
	SetTextContent {
		/// The node.
		node: NodeHandle,
		/// The new text.
		text: String,
	},
	/// A node was inserted before a sibling.
	InsertBefore {
		/// The parent.
		parent: NodeHandle,
		/// The inserted node.
		node: NodeHandle,
		/// The sibling it now precedes.
		reference: NodeHandle,
		/// Whether the node was attached before (a move).
		moved: bool,
	},
	/// A node was appended.
	AppendChild {
		/// The parent.
		parent: NodeHandle,
		/// The appended node.
		node: NodeHandle,
		/// Whether the node was attached before (a move).
		moved: bool,
	},
	/// A node was detached.
	RemoveChild {
		/// The former parent.
		parent: NodeHandle,
		/// The removed node.
		node: NodeHandle,
	},
}

impl BackendOp {
	/// Whether this operation moved an attached node.
	pub fn is_move(&self) -> bool {
		matches!(
			self,
			BackendOp::InsertBefore { moved: true, .. } | BackendOp::AppendChild { moved: true, .. }
		)
	}

	/// Whether this operation created a node.
	pub fn is_create(&self) -> bool {
		matches!(
			self,
			BackendOp::CreateElement { .. } | BackendOp::CreateText { .. } | BackendOp::CreateComment { .. }
		)
	}
}

/// Errors of [`MemoryBackend`].
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryBackendError {
	/// The handle does not belong to this backend.
	#[error("unknown node {0}")]
	UnknownNode(NodeHandle),
	/// The node is not a child of the given parent.
	#[error("{node} is not a child of {parent}")]
	NotAChild {
		/// The expected parent.
		parent: NodeHandle,
		/// The node.
		node: NodeHandle,
	},
	/// Only elements can have children.
	#[error("{0} cannot have children")]
	NotAnElement(NodeHandle),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Content {
	Element(String),
	Text(String),
	Comment(String),
}

#[derive(Debug, Clone)]
struct MemoryNode {
	content: Content,
	parent: Option<NodeHandle>,
	children: Vec<NodeHandle>,
}

/// An in-memory tree implementing [`NodeOps`].
#[derive(Debug, Default)]
pub struct MemoryBackend {
	nodes: Vec<MemoryNode>,
	ops: Vec<BackendOp>,
}

impl MemoryBackend {
	/// Create an empty backend
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a detached element to mount into. Not recorded as an operation.
	pub fn create_root(&mut self, tag: &str) -> NodeHandle {
		self.alloc(Content::Element(tag.to_string()))
	}

	/// Operations recorded so far
	pub fn ops(&self) -> &[BackendOp] {
		&self.ops
	}

	/// Forget the recorded operations
	pub fn clear_ops(&mut self) {
		self.ops.clear();
	}

	/// Number of recorded moves
	pub fn moves(&self) -> usize {
		self.ops.iter().filter(|op| op.is_move()).count()
	}

	/// Number of recorded creations
	pub fn creates(&self) -> usize {
		self.ops.iter().filter(|op| op.is_create()).count()
	}

	/// Number of recorded removals
	pub fn removes(&self) -> usize {
		self.ops
			.iter()
			.filter(|op| matches!(op, BackendOp::RemoveChild { .. }))
			.count()
	}

	/// Children of `node`, in order
	pub fn children(&self, node: NodeHandle) -> Vec<NodeHandle> {
		self.node(node).map(|n| n.children.clone()).unwrap_or_default()
	}

	/// Tag of an element node
	pub fn tag(&self, node: NodeHandle) -> Option<&str> {
		match &self.node(node)?.content {
			Content::Element(tag) => Some(tag),
			_ => None,
		}
	}

	/// Render `node` and its subtree as markup, for assertions.
	///
	/// Elements print as `<tag>...</tag>`, comments as `<!--text-->` and text
	/// as is.
	pub fn describe(&self, node: NodeHandle) -> String {
		let mut out = String::new();
		self.describe_into(node, &mut out);
		out
	}

	fn describe_into(&self, node: NodeHandle, out: &mut String) {
		let Some(entry) = self.node(node) else {
			return;
		};
		match &entry.content {
			Content::Element(tag) => {
				out.push('<');
				out.push_str(tag);
				out.push('>');
				for &child in &entry.children {
					self.describe_into(child, out);
				}
				out.push_str("</");
				out.push_str(tag);
				out.push('>');
			}
			Content::Text(text) => out.push_str(text),
			Content::Comment(text) => {
				out.push_str("<!--");
				out.push_str(text);
				out.push_str("-->");
			}
		}
	}

	fn alloc(&mut self, content: Content) -> NodeHandle {
		let handle = NodeHandle::new(self.nodes.len() as u64);
		self.nodes.push(MemoryNode {
			content,
			parent: None,
			children: Vec::new(),
		});
		handle
	}

	fn node(&self, handle: NodeHandle) -> Option<&MemoryNode> {
		usize::try_from(handle.raw()).ok().and_then(|index| self.nodes.get(index))
	}

	fn node_mut(&mut self, handle: NodeHandle) -> Result<&mut MemoryNode, MemoryBackendError> {
		usize::try_from(handle.raw())
			.ok()
			.and_then(|index| self.nodes.get_mut(index))
			.ok_or(MemoryBackendError::UnknownNode(handle))
	}

	fn element_mut(&mut self, handle: NodeHandle) -> Result<&mut MemoryNode, MemoryBackendError> {
		let node = self.node_mut(handle)?;
		match node.content {
			Content::Element(_) => Ok(node),
			_ => Err(MemoryBackendError::NotAnElement(handle)),
		}
	}

	// Returns whether the node was attached.
	fn detach(&mut self, node: NodeHandle) -> Result<bool, MemoryBackendError> {
		let Some(parent) = self.node_mut(node)?.parent.take() else {
			return Ok(false);
		};
		self.node_mut(parent)?.children.retain(|&child| child != node);
		Ok(true)
	}
}

impl NodeOps for MemoryBackend {
	type Error = MemoryBackendError;

	fn create_element(&mut self, tag: &str, _vnode: &VNode) -> Result<NodeHandle, Self::Error> {
		let node = self.alloc(Content::Element(tag.to_string()));
		self.ops.push(BackendOp::CreateElement {
			node,
			tag: tag.to_string(),
		});
		Ok(node)
	}

	fn create_text_node(&mut self, text: &str) -> Result<NodeHandle, Self::Error> {
		let node = self.alloc(Content::Text(text.to_string()));
		self.ops.push(BackendOp::CreateText {
			node,
			text: text.to_string(),
		});
		Ok(node)
	}

	fn create_comment(&mut self, text: &str) -> Result<NodeHandle, Self::Error> {
		let node = self.alloc(Content::Comment(text.to_string()));
		self.ops.push(BackendOp::CreateComment {
			node,
			text: text.to_string(),
		});
		Ok(node)
	}

	fn set_text_content(&mut self, node: NodeHandle, text: &str) -> Result<(), Self::Error> {
		let is_element = match &mut self.node_mut(node)?.content {
			Content::Element(_) => true,
			Content::Text(current) | Content::Comment(current) => {
				*current = text.to_string();
				false
			}
		};

		if is_element {
			for child in std::mem::take(&mut self.node_mut(node)?.children) {
				self.node_mut(child)?.parent = None;
			}
			if !text.is_empty() {
				let text_node = self.alloc(Content::Text(text.to_string()));
				self.node_mut(text_node)?.parent = Some(node);
				self.node_mut(node)?.children.push(text_node);
			}
		}

		self.ops.push(BackendOp::SetTextContent {
			node,
			text: text.to_string(),
		});
		Ok(())
	}

	fn insert_before(&mut self, parent: NodeHandle, node: NodeHandle, reference: NodeHandle) -> Result<(), Self::Error> {
		self.element_mut(parent)?;
		if self.node(reference).and_then(|r| r.parent) != Some(parent) {
			return Err(MemoryBackendError::NotAChild {
				parent,
				node: reference,
			});
		}

		let moved = self.detach(node)?;
		let parent_node = self.element_mut(parent)?;
		let position = parent_node
			.children
			.iter()
			.position(|&child| child == reference)
			.unwrap_or(parent_node.children.len());
		parent_node.children.insert(position, node);
		self.node_mut(node)?.parent = Some(parent);

		self.ops.push(BackendOp::InsertBefore {
			parent,
			node,
			reference,
			moved,
		});
		Ok(())
	}

	fn append_child(&mut self, parent: NodeHandle, node: NodeHandle) -> Result<(), Self::Error> {
		self.element_mut(parent)?;
		let moved = self.detach(node)?;
		self.element_mut(parent)?.children.push(node);
		self.node_mut(node)?.parent = Some(parent);

		self.ops.push(BackendOp::AppendChild { parent, node, moved });
		Ok(())
	}

	fn remove_child(&mut self, parent: NodeHandle, node: NodeHandle) -> Result<(), Self::Error> {
		if self.node(node).and_then(|n| n.parent) != Some(parent) {
			return Err(MemoryBackendError::NotAChild { parent, node });
		}
		self.detach(node)?;

		self.ops.push(BackendOp::RemoveChild { parent, node });
		Ok(())
	}

	fn parent_node(&self, node: NodeHandle) -> Option<NodeHandle> {
		self.node(node)?.parent
	}

	fn next_sibling(&self, node: NodeHandle) -> Option<NodeHandle> {
		let parent = self.node(node)?.parent?;
		let siblings = &self.node(parent)?.children;
		let position = siblings.iter().position(|&child| child == node)?;
		siblings.get(position + 1).copied()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	#[fixture]
	fn tree() -> (MemoryBackend, NodeHandle, Vec<NodeHandle>) {
		let mut backend = MemoryBackend::new();
		let root = backend.create_root("ul");
		let items: Vec<NodeHandle> = ["a", "b", "c"]
			.into_iter()
			.map(|text| {
				let node = backend.create_text_node(text).unwrap();
				backend.append_child(root, node).unwrap();
				node
			})
			.collect();
		backend.clear_ops();
		(backend, root, items)
	}

	#[rstest]
	fn test_insert_before_attached_node_is_a_move(tree: (MemoryBackend, NodeHandle, Vec<NodeHandle>)) {
		let (mut backend, root, items) = tree;

		backend.insert_before(root, items[2], items[0]).unwrap();

		assert_eq!(backend.describe(root), "<ul>cab</ul>");
		assert_eq!(backend.moves(), 1);
	}

	#[rstest]
	fn test_siblings_and_parents(tree: (MemoryBackend, NodeHandle, Vec<NodeHandle>)) {
		let (backend, root, items) = tree;

		assert_eq!(backend.next_sibling(items[0]), Some(items[1]));
		assert_eq!(backend.next_sibling(items[2]), None);
		assert_eq!(backend.parent_node(items[1]), Some(root));
		assert_eq!(backend.parent_node(root), None);
	}

	#[rstest]
	fn test_set_text_content_on_element_replaces_children(tree: (MemoryBackend, NodeHandle, Vec<NodeHandle>)) {
		let (mut backend, root, items) = tree;

		backend.set_text_content(root, "plain").unwrap();

		assert_eq!(backend.describe(root), "<ul>plain</ul>");
		assert_eq!(backend.parent_node(items[0]), None);
	}

	#[rstest]
	fn test_remove_child_of_wrong_parent_fails(tree: (MemoryBackend, NodeHandle, Vec<NodeHandle>)) {
		let (mut backend, _root, items) = tree;
		let other = backend.create_root("ol");

		let err = backend.remove_child(other, items[0]).unwrap_err();

		assert_eq!(
			err,
			MemoryBackendError::NotAChild {
				parent: other,
				node: items[0]
			}
		);
	}
}
