//! Patching real trees from virtual node trees.
//!
//! A [`Patcher`] owns a [`NodeOps`] backend and turns the difference between
//! two [`VNode`] trees into backend operations.
//!
//! ## Node-level patch
//!
//! [`Patcher::patch_vnode`] reuses the old node's real node for the new one
//! and then, in order:
//!
//! 1. returns if both are the very same node;
//! 2. returns if both are static with the same key and the new one is cloned
//!    or rendered once;
//! 3. without new text: reconciles child lists, creates new children (clearing
//!    old text first), removes old children, or clears old text;
//! 4. with new text: replaces the text content when it differs.
//!
//! ## Child lists
//!
//! [`Patcher::update_children`] walks both lists from both ends, trying the
//! pairs (old start, new start), (old end, new end), (old start, new end) and
//! (old end, new start) in that order. The last two are moves. When none
//! matches, the new start node is looked up among the remaining old nodes (by
//! key, or by a linear scan for unkeyed nodes) and either reused and moved or
//! created. Whatever remains when one side runs out is created or removed in
//! bulk.

use std::collections::HashMap;

use grappelli_types::{Key, NodeHandle, VNode};

use super::backend::NodeOps;
use super::error::PatchError;
use super::keys::{Diagnostic, find_duplicate_keys, same_vnode};
use super::settings::{DuplicateKeyPolicy, ReconcilerSettings};

type PatchResult<T, B> = Result<T, PatchError<<B as NodeOps>::Error>>;

/// Applies virtual tree differences to a backend.
pub struct Patcher<B: NodeOps> {
	backend: B,
	settings: ReconcilerSettings,
	diagnostics: Vec<Diagnostic>,
}

/// Create a [`Patcher`] with default settings.
///
/// # Example
///
/// ```
/// use grappelli_pages::testing::MemoryBackend;
/// use grappelli_pages::vdom::create_patch_function;
/// use grappelli_types::VNode;
///
/// let mut backend = MemoryBackend::new();
/// let root = backend.create_root("body");
/// let mut patcher = create_patch_function(backend);
///
/// let old = VNode::element("p").with_text("hello");
/// patcher.mount(&old, root, None).unwrap();
///
/// let new = VNode::element("p").with_text("bye");
/// patcher.patch(&old, &new).unwrap();
///
/// assert_eq!(patcher.backend().describe(root), "<body><p>bye</p></body>");
/// ```
pub fn create_patch_function<B: NodeOps>(backend: B) -> Patcher<B> {
	create_patch_function_with(backend, ReconcilerSettings::default())
}

/// Create a [`Patcher`] with explicit settings.
pub fn create_patch_function_with<B: NodeOps>(backend: B, settings: ReconcilerSettings) -> Patcher<B> {
	Patcher {
		backend,
		settings,
		diagnostics: Vec::new(),
	}
}

fn describe_tag(vnode: &VNode) -> String {
	match vnode.tag_name() {
		Some(tag) => tag.to_string(),
		None if vnode.is_comment() => "#comment".to_string(),
		None => "#text".to_string(),
	}
}

fn slot_in_range(slots: &[Option<VNode>], index: usize, start: isize, end: isize) -> Option<VNode> {
	let position = index as isize;
	if position < start || position > end {
		return None;
	}
	slots.get(index).cloned().flatten()
}

impl<B: NodeOps> Patcher<B> {
	/// The backend
	pub fn backend(&self) -> &B {
		&self.backend
	}

	/// The backend, mutably
	pub fn backend_mut(&mut self) -> &mut B {
		&mut self.backend
	}

	/// Give the backend back
	pub fn into_backend(self) -> B {
		self.backend
	}

	/// The settings in use
	pub fn settings(&self) -> &ReconcilerSettings {
		&self.settings
	}

	/// Diagnostics recorded so far
	pub fn diagnostics(&self) -> &[Diagnostic] {
		&self.diagnostics
	}

	/// Drain the recorded diagnostics
	pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
		std::mem::take(&mut self.diagnostics)
	}

	/// Build the real tree for `vnode` and insert it into `parent` before
	/// `reference` (or at the end). Returns the new real node.
	pub fn mount(&mut self, vnode: &VNode, parent: NodeHandle, reference: Option<NodeHandle>) -> PatchResult<NodeHandle, B> {
		self.reject_duplicates_in_tree(vnode)?;
		tracing::trace!(tag = %describe_tag(vnode), %parent, "mount");
		self.create_elm(vnode, Some(parent), reference)
	}

	/// Bring the real tree of `old` in line with `new`.
	///
	/// If `new` is not the same logical node as `old`, it is built fresh next
	/// to `old`'s real node and `old` is removed.
	pub fn patch(&mut self, old: &VNode, new: &VNode) -> PatchResult<(), B> {
		self.reject_duplicates_in_tree(new)?;

		if same_vnode(old, new) {
			return self.patch_vnode(old, new);
		}

		let old_elm = self.elm_of(old)?;
		let parent = self.backend.parent_node(old_elm);
		let next = self.backend.next_sibling(old_elm);
		tracing::trace!(old = %describe_tag(old), new = %describe_tag(new), "replace");
		self.create_elm(new, parent, next)?;
		self.remove_node(old_elm)
	}

	/// Remove the real node of `vnode` from its parent.
	pub fn unmount(&mut self, vnode: &VNode) -> PatchResult<(), B> {
		match vnode.elm() {
			Some(elm) => self.remove_node(elm),
			None => Ok(()),
		}
	}

	/// Patch `new` onto the real node of `old`; see the
	/// [module documentation](self).
	pub fn patch_vnode(&mut self, old: &VNode, new: &VNode) -> PatchResult<(), B> {
		if VNode::ptr_eq(old, new) {
			return Ok(());
		}

		let elm = self.elm_of(old)?;
		new.set_elm(Some(elm));

		if new.is_static() && old.is_static() && new.key() == old.key() && (new.is_cloned() || new.is_once()) {
			return Ok(());
		}

		match new.text_content() {
			None => match (old.child_nodes(), new.child_nodes()) {
				(Some(old_children), Some(new_children)) => {
					if !new.shares_children_with(old) {
						self.update_children(elm, old_children, new_children)?;
					}
				}
				(None, Some(new_children)) => {
					if old.text_content().is_some() {
						self.backend.set_text_content(elm, "").map_err(PatchError::Backend)?;
					}
					self.check_duplicate_keys(new_children)?;
					self.add_vnodes(elm, None, new_children, 0, new_children.len() as isize - 1)?;
				}
				(Some(old_children), None) => {
					self.remove_vnodes(old_children, 0, old_children.len() as isize - 1)?;
				}
				(None, None) => {
					if old.text_content().is_some() {
						self.backend.set_text_content(elm, "").map_err(PatchError::Backend)?;
					}
				}
			},
			Some(text) => {
				if old.text_content() != Some(text) {
					self.backend.set_text_content(elm, text).map_err(PatchError::Backend)?;
				}
			}
		}
		Ok(())
	}

	/// Reconcile the children of `parent` from `old_children` to
	/// `new_children`.
	pub fn update_children(&mut self, parent: NodeHandle, old_children: &[VNode], new_children: &[VNode]) -> PatchResult<(), B> {
		self.check_duplicate_keys(new_children)?;

		let allow_moves = self.settings.allow_moves;
		// Spent slots become `None` and are skipped by the pointers.
		let mut old: Vec<Option<VNode>> = old_children.iter().cloned().map(Some).collect();
		let mut old_start: isize = 0;
		let mut old_end: isize = old.len() as isize - 1;
		let mut new_start: isize = 0;
		let mut new_end: isize = new_children.len() as isize - 1;
		let mut key_to_old: Option<HashMap<Key, usize>> = None;

		while old_start <= old_end && new_start <= new_end {
			let Some(old_start_vnode) = old[old_start as usize].clone() else {
				old_start += 1;
				continue;
			};
			let Some(old_end_vnode) = old[old_end as usize].clone() else {
				old_end -= 1;
				continue;
			};
			let new_start_vnode = &new_children[new_start as usize];
			let new_end_vnode = &new_children[new_end as usize];

			if same_vnode(&old_start_vnode, new_start_vnode) {
				self.patch_vnode(&old_start_vnode, new_start_vnode)?;
				old_start += 1;
				new_start += 1;
			} else if same_vnode(&old_end_vnode, new_end_vnode) {
				self.patch_vnode(&old_end_vnode, new_end_vnode)?;
				old_end -= 1;
				new_end -= 1;
			} else if same_vnode(&old_start_vnode, new_end_vnode) {
				// Moved right: after everything still unprocessed.
				self.patch_vnode(&old_start_vnode, new_end_vnode)?;
				if allow_moves {
					let node = self.elm_of(&old_start_vnode)?;
					let reference = self.backend.next_sibling(self.elm_of(&old_end_vnode)?);
					self.move_node(parent, node, reference)?;
				}
				old_start += 1;
				new_end -= 1;
			} else if same_vnode(&old_end_vnode, new_start_vnode) {
				// Moved left: before everything still unprocessed.
				self.patch_vnode(&old_end_vnode, new_start_vnode)?;
				if allow_moves {
					let node = self.elm_of(&old_end_vnode)?;
					let reference = self.elm_of(&old_start_vnode)?;
					self.move_node(parent, node, Some(reference))?;
				}
				old_end -= 1;
				new_start += 1;
			} else {
				let index_in_old = match new_start_vnode.key() {
					Some(key) => key_to_old
						.get_or_insert_with(|| key_to_old_index(&old, old_start, old_end))
						.get(key)
						.copied(),
					None => find_in_old(new_start_vnode, &old, old_start, old_end),
				};
				let candidate = index_in_old.and_then(|index| slot_in_range(&old, index, old_start, old_end).map(|vnode| (index, vnode)));
				let reference = old_start_vnode.elm();

				match candidate {
					Some((index, to_move)) if same_vnode(&to_move, new_start_vnode) => {
						self.patch_vnode(&to_move, new_start_vnode)?;
						old[index] = None;
						if allow_moves {
							let node = self.elm_of(&to_move)?;
							self.move_node(parent, node, reference)?;
						}
					}
					// Unknown, or a key reused by a different kind of node.
					_ => {
						self.create_elm(new_start_vnode, Some(parent), reference)?;
					}
				}
				new_start += 1;
			}
		}

		if old_start > old_end {
			let reference = new_children.get((new_end + 1) as usize).and_then(VNode::elm);
			self.add_vnodes(parent, reference, new_children, new_start, new_end)?;
		} else if new_start > new_end {
			let remaining = old[old_start as usize..=old_end as usize].iter().flatten();
			self.remove_all(remaining)?;
		}
		Ok(())
	}

	/// Create the real node for `vnode` (and its subtree) and insert it into
	/// `parent` before `reference`. Without a parent the node stays detached.
	pub fn create_elm(&mut self, vnode: &VNode, parent: Option<NodeHandle>, reference: Option<NodeHandle>) -> PatchResult<NodeHandle, B> {
		let elm = if let Some(tag) = vnode.tag_name() {
			let elm = self.backend.create_element(tag, vnode).map_err(PatchError::Backend)?;
			vnode.set_elm(Some(elm));
			self.create_children(vnode, elm)?;
			elm
		} else if vnode.is_comment() {
			let elm = self
				.backend
				.create_comment(vnode.text_content().unwrap_or_default())
				.map_err(PatchError::Backend)?;
			vnode.set_elm(Some(elm));
			elm
		} else {
			let elm = self
				.backend
				.create_text_node(vnode.text_content().unwrap_or_default())
				.map_err(PatchError::Backend)?;
			vnode.set_elm(Some(elm));
			elm
		};

		if let Some(parent) = parent {
			self.insert(parent, elm, reference)?;
		}
		Ok(elm)
	}

	/// Create and insert `vnodes[start..=end]` into `parent` before
	/// `reference`.
	pub fn add_vnodes(
		&mut self,
		parent: NodeHandle,
		reference: Option<NodeHandle>,
		vnodes: &[VNode],
		start: isize,
		end: isize,
	) -> PatchResult<(), B> {
		let mut index = start.max(0);
		while index <= end {
			if let Some(vnode) = vnodes.get(index as usize) {
				self.create_elm(vnode, Some(parent), reference)?;
			}
			index += 1;
		}
		Ok(())
	}

	/// Remove the real nodes of `vnodes[start..=end]`.
	///
	/// Nodes that were never created or are no longer attached are skipped.
	pub fn remove_vnodes(&mut self, vnodes: &[VNode], start: isize, end: isize) -> PatchResult<(), B> {
		if end < start || vnodes.is_empty() {
			return Ok(());
		}
		let start = start.max(0) as usize;
		let end = (end as usize).min(vnodes.len() - 1);
		if start > end {
			return Ok(());
		}
		self.remove_all(vnodes[start..=end].iter())
	}

	fn remove_all<'a>(&mut self, vnodes: impl Iterator<Item = &'a VNode>) -> PatchResult<(), B> {
		for vnode in vnodes {
			if let Some(elm) = vnode.elm() {
				self.remove_node(elm)?;
			}
		}
		Ok(())
	}

	fn remove_node(&mut self, elm: NodeHandle) -> PatchResult<(), B> {
		match self.backend.parent_node(elm) {
			Some(parent) => self.backend.remove_child(parent, elm).map_err(PatchError::Backend),
			None => Ok(()),
		}
	}

	fn create_children(&mut self, vnode: &VNode, elm: NodeHandle) -> PatchResult<(), B> {
		match vnode.child_nodes() {
			Some(children) => {
				self.check_duplicate_keys(children)?;
				for child in children {
					self.create_elm(child, Some(elm), None)?;
				}
			}
			None => {
				if let Some(text) = vnode.text_content() {
					let text_node = self.backend.create_text_node(text).map_err(PatchError::Backend)?;
					self.backend.append_child(elm, text_node).map_err(PatchError::Backend)?;
				}
			}
		}
		Ok(())
	}

	fn insert(&mut self, parent: NodeHandle, elm: NodeHandle, reference: Option<NodeHandle>) -> PatchResult<(), B> {
		match reference {
			Some(reference) if self.backend.parent_node(reference) == Some(parent) => {
				self.backend.insert_before(parent, elm, reference).map_err(PatchError::Backend)
			}
			Some(reference) => {
				tracing::debug!(%parent, %reference, "reference is not a child of parent; appending");
				self.backend.append_child(parent, elm).map_err(PatchError::Backend)
			}
			None => self.backend.append_child(parent, elm).map_err(PatchError::Backend),
		}
	}

	fn move_node(&mut self, parent: NodeHandle, node: NodeHandle, reference: Option<NodeHandle>) -> PatchResult<(), B> {
		tracing::trace!(%parent, %node, ?reference, "move");
		match reference {
			Some(reference) => self.backend.insert_before(parent, node, reference),
			None => self.backend.append_child(parent, node),
		}
		.map_err(PatchError::Backend)
	}

	fn elm_of(&self, vnode: &VNode) -> PatchResult<NodeHandle, B> {
		vnode.elm().ok_or_else(|| PatchError::Unmounted {
			tag: describe_tag(vnode),
		})
	}

	fn check_duplicate_keys(&mut self, children: &[VNode]) -> PatchResult<(), B> {
		if !self.settings.check_duplicate_keys {
			return Ok(());
		}
		for diagnostic in find_duplicate_keys(children) {
			let Diagnostic::DuplicateKey {
				key,
				first_index,
				duplicate_index,
				tag,
			} = &diagnostic;
			tracing::warn!(%key, first_index, duplicate_index, tag = ?tag, "duplicate keys detected among siblings");
			if self.settings.duplicate_keys == DuplicateKeyPolicy::Reject {
				return Err(PatchError::DuplicateKey {
					key: key.clone(),
					first_index: *first_index,
					duplicate_index: *duplicate_index,
				});
			}
			self.diagnostics.push(diagnostic);
		}
		Ok(())
	}

	// Under `Reject`, refuse the whole tree before any backend operation.
	fn reject_duplicates_in_tree(&mut self, root: &VNode) -> PatchResult<(), B> {
		if !self.settings.check_duplicate_keys || self.settings.duplicate_keys != DuplicateKeyPolicy::Reject {
			return Ok(());
		}
		let mut stack = vec![root];
		while let Some(vnode) = stack.pop() {
			if let Some(children) = vnode.child_nodes() {
				self.check_duplicate_keys(children)?;
				stack.extend(children.iter());
			}
		}
		Ok(())
	}
}

fn key_to_old_index(old: &[Option<VNode>], start: isize, end: isize) -> HashMap<Key, usize> {
	let mut map = HashMap::new();
	let mut index = start;
	while index <= end {
		if let Some(key) = old[index as usize].as_ref().and_then(VNode::key) {
			// Later siblings overwrite earlier ones with the same key.
			map.insert(key.clone(), index as usize);
		}
		index += 1;
	}
	map
}

fn find_in_old(vnode: &VNode, old: &[Option<VNode>], start: isize, end: isize) -> Option<usize> {
	let mut index = start;
	while index <= end {
		if let Some(candidate) = &old[index as usize] {
			if same_vnode(candidate, vnode) {
				return Some(index as usize);
			}
		}
		index += 1;
	}
	None
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{BackendOp, MemoryBackend};
	use rstest::{fixture, rstest};

	struct Mounted {
		patcher: Patcher<MemoryBackend>,
		root: NodeHandle,
	}

	#[fixture]
	fn mounted() -> Mounted {
		let mut backend = MemoryBackend::new();
		let root = backend.create_root("body");
		Mounted {
			patcher: create_patch_function(backend),
			root,
		}
	}

	#[rstest]
	fn test_create_elm_dispatches_on_shape(mut mounted: Mounted) {
		let tree = VNode::element("div").children([
			VNode::text("a"),
			VNode::comment("c"),
			VNode::element("b").with_text("bold"),
		]);

		mounted.patcher.mount(&tree, mounted.root, None).unwrap();

		assert_eq!(
			mounted.patcher.backend().describe(mounted.root),
			"<body><div>a<!--c--><b>bold</b></div></body>"
		);
		assert!(tree.child_nodes().unwrap().iter().all(|c| c.elm().is_some()));
	}

	#[rstest]
	fn test_patch_vnode_requires_mounted_old(mut mounted: Mounted) {
		let old = VNode::element("p");
		let new = VNode::element("p").with_text("x");

		let err = mounted.patcher.patch_vnode(&old, &new).unwrap_err();

		assert!(matches!(err, PatchError::Unmounted { ref tag } if tag == "p"));
	}

	#[rstest]
	fn test_patch_replaces_different_node_in_place(mut mounted: Mounted) {
		let old = VNode::element("p").with_text("old");
		let sibling = VNode::element("footer");
		mounted.patcher.mount(&old, mounted.root, None).unwrap();
		mounted.patcher.mount(&sibling, mounted.root, None).unwrap();

		let new = VNode::element("h1").with_text("new");
		mounted.patcher.patch(&old, &new).unwrap();

		assert_eq!(
			mounted.patcher.backend().describe(mounted.root),
			"<body><h1>new</h1><footer></footer></body>"
		);
	}

	#[rstest]
	fn test_unmount_detaches(mut mounted: Mounted) {
		let tree = VNode::element("p");
		mounted.patcher.mount(&tree, mounted.root, None).unwrap();
		mounted.patcher.backend_mut().clear_ops();

		mounted.patcher.unmount(&tree).unwrap();

		assert_eq!(mounted.patcher.backend().describe(mounted.root), "<body></body>");
		assert!(matches!(mounted.patcher.backend().ops(), [BackendOp::RemoveChild { .. }]));
	}

	#[rstest]
	fn test_remove_vnodes_skips_detached(mut mounted: Mounted) {
		let attached = VNode::element("i");
		let never_mounted = VNode::element("u");
		mounted.patcher.mount(&attached, mounted.root, None).unwrap();

		mounted
			.patcher
			.remove_vnodes(&[never_mounted, attached.clone(), attached], 0, 2)
			.unwrap();

		assert_eq!(mounted.patcher.backend().removes(), 1);
	}

	#[rstest]
	fn test_stale_reference_falls_back_to_append(mut mounted: Mounted) {
		let elsewhere = mounted.patcher.backend_mut().create_root("aside");

		mounted.patcher.mount(&VNode::element("p"), mounted.root, Some(elsewhere)).unwrap();

		assert_eq!(mounted.patcher.backend().describe(mounted.root), "<body><p></p></body>");
	}
}
