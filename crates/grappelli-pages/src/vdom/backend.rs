//! The primitive operations a rendering surface provides to the reconciler.

use grappelli_types::{NodeHandle, VNode};

/// Node operations of a rendering backend.
///
/// Everything the reconciler does to a real tree is expressed through this
/// set. Implementations own the real nodes and identify them with
/// [`NodeHandle`]s.
///
/// `insert_before` and `append_child` are also used to *move* nodes that are
/// already attached somewhere; implementations must detach the node from its
/// current position first, as DOM `insertBefore` does.
pub trait NodeOps {
	/// Error raised by failing operations; the reconciler passes it through
	/// unchanged.
	type Error: std::error::Error + Send + Sync + 'static;

	/// Create a detached element. `vnode` is the node being rendered, for
	/// backends that want more than the tag.
	fn create_element(&mut self, tag: &str, vnode: &VNode) -> Result<NodeHandle, Self::Error>;

	/// Create a detached text node.
	fn create_text_node(&mut self, text: &str) -> Result<NodeHandle, Self::Error>;

	/// Create a detached comment node.
	fn create_comment(&mut self, text: &str) -> Result<NodeHandle, Self::Error>;

	/// Replace the text content of `node`. On an element this replaces all of
	/// its children.
	fn set_text_content(&mut self, node: NodeHandle, text: &str) -> Result<(), Self::Error>;

	/// Insert `node` into `parent` right before `reference`.
	fn insert_before(&mut self, parent: NodeHandle, node: NodeHandle, reference: NodeHandle) -> Result<(), Self::Error>;

	/// Append `node` as the last child of `parent`.
	fn append_child(&mut self, parent: NodeHandle, node: NodeHandle) -> Result<(), Self::Error>;

	/// Detach `node` from `parent`.
	fn remove_child(&mut self, parent: NodeHandle, node: NodeHandle) -> Result<(), Self::Error>;

	/// The parent of `node`, if attached.
	fn parent_node(&self, node: NodeHandle) -> Option<NodeHandle>;

	/// The sibling following `node`, if any.
	fn next_sibling(&self, node: NodeHandle) -> Option<NodeHandle>;
}
