//! Integration tests for the reconciler
//!
//! These tests verify:
//! 1. Keyed reorders move existing nodes instead of recreating them
//! 2. Node-level patches issue operations in a fixed order
//! 3. Unchanged and static subtrees issue no operations at all
//! 4. Duplicate keys and backend failures are reported as configured
//! 5. Mounted trees follow the state they were rendered from

use grappelli_pages::testing::{BackendOp, MemoryBackend, MemoryBackendError};
use grappelli_pages::vdom::{
	Diagnostic, DuplicateKeyPolicy, NodeOps, PatchError, Patcher, ReconcilerSettings, create_patch_function,
	create_patch_function_with,
};
use grappelli_pages::{MountError, mount};
use grappelli_reactive::{Record, Sequence, Value, observe};
use grappelli_types::{Key, NodeHandle, VNode};
use proptest::prelude::*;
use rstest::*;
use serial_test::serial;
use std::cell::Cell;
use std::rc::Rc;

// ============================================================================
// Fixtures
// ============================================================================

struct Mounted {
	patcher: Patcher<MemoryBackend>,
	root: NodeHandle,
}

impl Mounted {
	fn html(&self) -> String {
		self.patcher.backend().describe(self.root)
	}

	fn ops(&self) -> &[BackendOp] {
		self.patcher.backend().ops()
	}

	/// Mount `tree` and forget the operations it took
	fn mount(&mut self, tree: &VNode) {
		self.patcher.mount(tree, self.root, None).unwrap();
		self.patcher.backend_mut().clear_ops();
	}
}

fn mounted_with(settings: ReconcilerSettings) -> Mounted {
	let mut backend = MemoryBackend::new();
	let root = backend.create_root("body");
	Mounted {
		patcher: create_patch_function_with(backend, settings),
		root,
	}
}

#[fixture]
fn mounted() -> Mounted {
	mounted_with(ReconcilerSettings::default())
}

fn keyed_list(keys: &[&str]) -> VNode {
	VNode::element("ul").children(keys.iter().map(|key| VNode::element("li").with_key(*key).with_text(*key)))
}

/// A backend that fails every mutating operation after the first `budget`.
struct FailingBackend {
	inner: MemoryBackend,
	budget: Rc<Cell<usize>>,
}

#[derive(Debug, thiserror::Error)]
enum FailingError {
	#[error("operation budget exhausted")]
	Exhausted,
	#[error(transparent)]
	Memory(#[from] MemoryBackendError),
}

impl FailingBackend {
	fn spend(&self) -> Result<(), FailingError> {
		match self.budget.get() {
			0 => Err(FailingError::Exhausted),
			left => {
				self.budget.set(left - 1);
				Ok(())
			}
		}
	}
}

impl NodeOps for FailingBackend {
	type Error = FailingError;

	fn create_element(&mut self, tag: &str, vnode: &VNode) -> Result<NodeHandle, Self::Error> {
		self.spend()?;
		Ok(self.inner.create_element(tag, vnode)?)
	}

	fn create_text_node(&mut self, text: &str) -> Result<NodeHandle, Self::Error> {
		self.spend()?;
		Ok(self.inner.create_text_node(text)?)
	}

	fn create_comment(&mut self, text: &str) -> Result<NodeHandle, Self::Error> {
		self.spend()?;
		Ok(self.inner.create_comment(text)?)
	}

	fn set_text_content(&mut self, node: NodeHandle, text: &str) -> Result<(), Self::Error> {
		self.spend()?;
		Ok(self.inner.set_text_content(node, text)?)
	}

	fn insert_before(&mut self, parent: NodeHandle, node: NodeHandle, reference: NodeHandle) -> Result<(), Self::Error> {
		self.spend()?;
		Ok(self.inner.insert_before(parent, node, reference)?)
	}

	fn append_child(&mut self, parent: NodeHandle, node: NodeHandle) -> Result<(), Self::Error> {
		self.spend()?;
		Ok(self.inner.append_child(parent, node)?)
	}

	fn remove_child(&mut self, parent: NodeHandle, node: NodeHandle) -> Result<(), Self::Error> {
		self.spend()?;
		Ok(self.inner.remove_child(parent, node)?)
	}

	fn parent_node(&self, node: NodeHandle) -> Option<NodeHandle> {
		self.inner.parent_node(node)
	}

	fn next_sibling(&self, node: NodeHandle) -> Option<NodeHandle> {
		self.inner.next_sibling(node)
	}
}

// ============================================================================
// Child list reconciliation
// ============================================================================

#[rstest]
fn test_keyed_rotation_is_a_single_move(mut mounted: Mounted) {
	let old = keyed_list(&["a", "b", "c"]);
	mounted.mount(&old);

	let new = keyed_list(&["c", "a", "b"]);
	mounted.patcher.patch(&old, &new).unwrap();

	assert_eq!(mounted.patcher.backend().moves(), 1);
	assert_eq!(mounted.patcher.backend().creates(), 0);
	assert_eq!(mounted.patcher.backend().removes(), 0);
	assert_eq!(mounted.html(), "<body><ul><li>c</li><li>a</li><li>b</li></ul></body>");
}

#[rstest]
fn test_reused_children_keep_their_real_nodes(mut mounted: Mounted) {
	let old = keyed_list(&["a", "b", "c"]);
	mounted.mount(&old);
	let handle_of = |tree: &VNode, key: &str| {
		tree.child_nodes()
			.unwrap()
			.iter()
			.find(|child| child.key() == Some(&Key::from(key)))
			.and_then(VNode::elm)
	};

	let new = keyed_list(&["b", "c", "a"]);
	mounted.patcher.patch(&old, &new).unwrap();

	for key in ["a", "b", "c"] {
		assert_eq!(handle_of(&old, key), handle_of(&new, key));
	}
}

#[rstest]
#[case::append(&["a", "b"], &["a", "b", "c"], 1, 0, 0)]
#[case::prepend(&["b", "c"], &["a", "b", "c"], 1, 0, 0)]
#[case::remove_middle(&["a", "b", "c"], &["a", "c"], 0, 1, 0)]
#[case::swap_ends(&["a", "b", "c"], &["c", "b", "a"], 0, 0, 2)]
#[case::replace_all(&["a", "b"], &["x", "y"], 2, 2, 0)]
#[case::clear(&["a", "b"], &[], 0, 2, 0)]
fn test_keyed_edits(
	mut mounted: Mounted,
	#[case] before: &[&str],
	#[case] after: &[&str],
	#[case] element_creates: usize,
	#[case] removes: usize,
	#[case] moves: usize,
) {
	let old = keyed_list(before);
	mounted.mount(&old);

	let new = keyed_list(after);
	mounted.patcher.patch(&old, &new).unwrap();

	let created_elements = mounted
		.ops()
		.iter()
		.filter(|op| matches!(op, BackendOp::CreateElement { .. }))
		.count();
	assert_eq!(created_elements, element_creates);
	assert_eq!(mounted.patcher.backend().removes(), removes);
	assert_eq!(mounted.patcher.backend().moves(), moves);

	let expected: String = after.iter().map(|key| format!("<li>{key}</li>")).collect();
	assert_eq!(mounted.html(), format!("<body><ul>{expected}</ul></body>"));
}

#[rstest]
fn test_reused_key_with_other_tag_is_recreated(mut mounted: Mounted) {
	let old = VNode::element("div").child(VNode::element("li").with_key(1).with_text("old"));
	mounted.mount(&old);

	let new = VNode::element("div").child(VNode::element("p").with_key(1).with_text("new"));
	mounted.patcher.patch(&old, &new).unwrap();

	assert_eq!(mounted.patcher.backend().removes(), 1);
	assert_eq!(mounted.patcher.backend().moves(), 0);
	assert!(mounted.ops().iter().any(|op| matches!(op, BackendOp::CreateElement { tag, .. } if tag == "p")));
	assert_eq!(mounted.html(), "<body><div><p>new</p></div></body>");
}

#[rstest]
fn test_unkeyed_children_are_found_by_scan(mut mounted: Mounted) {
	let old = VNode::element("div").children([VNode::element("div"), VNode::element("span"), VNode::element("p")]);
	mounted.mount(&old);
	let span = old.child_nodes().unwrap()[1].elm();

	let new = VNode::element("div").children([VNode::element("span"), VNode::element("i")]);
	mounted.patcher.patch(&old, &new).unwrap();

	assert_eq!(new.child_nodes().unwrap()[0].elm(), span);
	assert_eq!(mounted.patcher.backend().moves(), 1);
	assert_eq!(mounted.patcher.backend().creates(), 1);
	assert_eq!(mounted.patcher.backend().removes(), 2);
	assert_eq!(mounted.html(), "<body><div><span></span><i></i></div></body>");
}

#[rstest]
fn test_moves_disabled_patches_in_place() {
	let mut mounted = mounted_with(ReconcilerSettings {
		allow_moves: false,
		..ReconcilerSettings::default()
	});
	let old = keyed_list(&["a", "b", "c"]);
	mounted.mount(&old);

	let new = keyed_list(&["c", "a", "b"]);
	mounted.patcher.patch(&old, &new).unwrap();

	assert_eq!(mounted.patcher.backend().moves(), 0);
	assert_eq!(mounted.patcher.backend().creates(), 0);
	assert_eq!(mounted.patcher.backend().removes(), 0);
	assert_eq!(mounted.html(), "<body><ul><li>a</li><li>b</li><li>c</li></ul></body>");
}

// ============================================================================
// Node-level patch
// ============================================================================

#[rstest]
fn test_text_to_children_clears_text_first(mut mounted: Mounted) {
	let old = VNode::element("div").with_text("hello");
	mounted.mount(&old);
	let div = old.elm().unwrap();

	let new = VNode::element("div").child(VNode::element("span"));
	mounted.patcher.patch(&old, &new).unwrap();

	match mounted.ops() {
		[
			BackendOp::SetTextContent { node, text },
			BackendOp::CreateElement { node: span, tag },
			BackendOp::AppendChild {
				parent,
				node: appended,
				moved: false,
			},
		] => {
			assert_eq!(*node, div);
			assert!(text.is_empty());
			assert_eq!(tag, "span");
			assert_eq!(*parent, div);
			assert_eq!(appended, span);
		}
		ops => panic!("unexpected operations: {ops:?}"),
	}
	assert_eq!(mounted.html(), "<body><div><span></span></div></body>");
}

#[rstest]
fn test_children_to_nothing_removes_them(mut mounted: Mounted) {
	let old = VNode::element("div").children([VNode::text("a"), VNode::element("b")]);
	mounted.mount(&old);

	// An element always carries a (possibly empty) child list.
	let new = VNode::element("div");
	mounted.patcher.patch(&old, &new).unwrap();

	assert_eq!(mounted.patcher.backend().removes(), 2);
	assert_eq!(mounted.html(), "<body><div></div></body>");
}

#[rstest]
fn test_changed_text_is_replaced(mut mounted: Mounted) {
	let old = VNode::element("p").with_text("before");
	mounted.mount(&old);

	let new = VNode::element("p").with_text("after");
	mounted.patcher.patch(&old, &new).unwrap();

	assert!(matches!(mounted.ops(), [BackendOp::SetTextContent { text, .. }] if text == "after"));
	assert_eq!(new.elm(), old.elm());
}

#[rstest]
fn test_patching_a_node_with_itself_is_a_no_op(mut mounted: Mounted) {
	let tree = keyed_list(&["a", "b"]);
	mounted.mount(&tree);

	mounted.patcher.patch(&tree, &tree).unwrap();

	assert!(mounted.ops().is_empty());
}

#[rstest]
fn test_identical_children_issue_no_operations(mut mounted: Mounted) {
	let old = keyed_list(&["a", "b", "c"]);
	mounted.mount(&old);

	let new = keyed_list(&["a", "b", "c"]);
	mounted.patcher.patch(&old, &new).unwrap();

	assert!(mounted.ops().is_empty());
}

#[rstest]
fn test_static_clone_is_skipped(mut mounted: Mounted) {
	let old = VNode::element("p").with_key("hero").with_text("static").mark_static();
	mounted.mount(&old);

	// Even with different content, a cloned static node is left alone.
	let new = VNode::element("p").with_key("hero").with_text("changed").mark_static().cloned();
	mounted.patcher.patch(&old, &new).unwrap();

	assert!(mounted.ops().is_empty());
	assert_eq!(new.elm(), old.elm());
	assert_eq!(mounted.html(), "<body><p>static</p></body>");
}

// ============================================================================
// Duplicate keys
// ============================================================================

#[rstest]
fn test_duplicate_keys_warn_and_continue(mut mounted: Mounted) {
	let tree = keyed_list(&["a", "b", "a"]);

	mounted.patcher.mount(&tree, mounted.root, None).unwrap();

	assert_eq!(
		mounted.patcher.diagnostics(),
		[Diagnostic::DuplicateKey {
			key: Key::from("a"),
			first_index: 0,
			duplicate_index: 2,
			tag: Some("li".to_string()),
		}]
	);
	assert_eq!(mounted.html(), "<body><ul><li>a</li><li>b</li><li>a</li></ul></body>");
}

#[rstest]
fn test_duplicate_keys_rejected_before_any_operation() {
	let mut mounted = mounted_with(ReconcilerSettings {
		duplicate_keys: DuplicateKeyPolicy::Reject,
		..ReconcilerSettings::default()
	});
	let tree = VNode::element("div").child(keyed_list(&["a", "b", "a"]));

	let err = mounted.patcher.mount(&tree, mounted.root, None).unwrap_err();

	assert!(matches!(
		err,
		PatchError::DuplicateKey {
			first_index: 0,
			duplicate_index: 2,
			..
		}
	));
	assert!(mounted.ops().is_empty());
}

#[rstest]
fn test_duplicate_check_can_be_disabled() {
	let mut mounted = mounted_with(ReconcilerSettings {
		check_duplicate_keys: false,
		duplicate_keys: DuplicateKeyPolicy::Reject,
		..ReconcilerSettings::default()
	});

	mounted.patcher.mount(&keyed_list(&["a", "a"]), mounted.root, None).unwrap();

	assert!(mounted.patcher.diagnostics().is_empty());
}

// ============================================================================
// Backend failures
// ============================================================================

#[rstest]
fn test_backend_failure_stops_the_patch() {
	let budget = Rc::new(Cell::new(usize::MAX));
	let mut inner = MemoryBackend::new();
	let root = inner.create_root("body");
	let mut patcher = create_patch_function(FailingBackend {
		inner,
		budget: budget.clone(),
	});
	let old = keyed_list(&["a"]);
	patcher.mount(&old, root, None).unwrap();
	patcher.backend_mut().inner.clear_ops();

	// Room for the first new item only: create, its text, and the insert.
	budget.set(4);
	let new = keyed_list(&["a", "b", "c"]);
	let err = patcher.patch(&old, &new).unwrap_err();

	assert!(matches!(err.backend(), Some(FailingError::Exhausted)));
	// Nothing is rolled back.
	assert_eq!(patcher.backend().inner.describe(root), "<body><ul><li>a</li><li>b</li></ul></body>");
}

// ============================================================================
// Mounting
// ============================================================================

fn render_items(owner: &Value) -> VNode {
	let items = owner
		.as_record()
		.and_then(|state| state.get("items"))
		.and_then(|items| items.as_sequence().map(Sequence::to_vec))
		.unwrap_or_default();
	VNode::element("ul").children(items.iter().filter_map(Value::as_str).map(|item| {
		VNode::element("li").with_key(item).with_text(item)
	}))
}

fn item_state(items: &[&str]) -> Record {
	let state = Record::from_fields([("items", Sequence::from_values(items.iter().copied()))]);
	observe(&Value::from(state.clone()));
	state
}

#[rstest]
#[serial]
fn test_mount_follows_state() {
	let state = item_state(&["a", "b"]);
	let mut backend = MemoryBackend::new();
	let root = backend.create_root("body");
	let view = mount(backend, ReconcilerSettings::default(), root, state.clone(), render_items).unwrap();
	let items = state.get_untracked("items").unwrap();
	let items = items.as_sequence().unwrap();

	assert_eq!(view.backend().describe(root), "<body><ul><li>a</li><li>b</li></ul></body>");

	view.with_backend_mut(MemoryBackend::clear_ops);
	items.push("c").unwrap();
	assert_eq!(view.backend().describe(root), "<body><ul><li>a</li><li>b</li><li>c</li></ul></body>");

	view.with_backend_mut(MemoryBackend::clear_ops);
	items.reverse().unwrap();
	assert_eq!(view.backend().describe(root), "<body><ul><li>c</li><li>b</li><li>a</li></ul></body>");
	assert_eq!(view.backend().creates(), 0);

	view.unmount().unwrap();
}

#[rstest]
#[serial]
fn test_dropped_mount_stops_following() {
	let state = item_state(&["a"]);
	let mut backend = MemoryBackend::new();
	let root = backend.create_root("body");
	let view = mount(backend, ReconcilerSettings::default(), root, state.clone(), render_items).unwrap();
	let subscriber = view.subscriber().clone();

	drop(view);
	state.set("items", Sequence::from_values(["x"])).unwrap();

	assert!(!subscriber.is_active());
}

#[rstest]
#[serial]
fn test_unmount_removes_the_tree() {
	let state = item_state(&["a"]);
	let mut backend = MemoryBackend::new();
	let root = backend.create_root("body");
	let view = mount(backend, ReconcilerSettings::default(), root, state.clone(), render_items).unwrap();
	assert!(view.root().is_some());

	let subscriber = view.subscriber().clone();
	view.unmount().unwrap();

	assert!(!subscriber.is_active());
}

#[rstest]
#[serial]
fn test_patch_failure_surfaces_from_the_write() {
	let state = item_state(&["a"]);
	let budget = Rc::new(Cell::new(usize::MAX));
	let mut inner = MemoryBackend::new();
	let root = inner.create_root("body");
	let backend = FailingBackend {
		inner,
		budget: budget.clone(),
	};
	let _view = mount(backend, ReconcilerSettings::default(), root, state.clone(), render_items).unwrap();

	budget.set(0);
	let err = state.set("items", Sequence::from_values(["b"])).unwrap_err();

	match MountError::<FailingError>::from(err) {
		MountError::Patch(patch) => assert!(matches!(patch.backend(), Some(FailingError::Exhausted))),
		other => panic!("expected a patch error, got {other:?}"),
	}
}

#[rstest]
#[serial]
fn test_mount_diagnostics_cover_the_latest_render() {
	let state = Record::from_fields([("count", 0)]);
	observe(&Value::from(state.clone()));
	let mut backend = MemoryBackend::new();
	let root = backend.create_root("body");
	let view = mount(backend, ReconcilerSettings::default(), root, state.clone(), |owner| {
		let count = owner.as_record().and_then(|s| s.get("count")).and_then(|c| c.as_f64());
		let label = count.unwrap_or_default().to_string();
		VNode::element("ul").children(["a", "b", "a"].map(|key| VNode::element("li").with_key(key).with_text(&label)))
	})
	.unwrap();

	for count in 1..=50 {
		state.set("count", count).unwrap();
	}

	assert_eq!(view.diagnostics().len(), 1);
	assert_eq!(view.take_diagnostics().len(), 1);
	assert!(view.diagnostics().is_empty());
}

#[rstest]
#[serial]
fn test_write_while_backend_is_borrowed_reports_it() {
	let state = item_state(&["a"]);
	let mut backend = MemoryBackend::new();
	let root = backend.create_root("body");
	let view = mount(backend, ReconcilerSettings::default(), root, state.clone(), render_items).unwrap();

	let borrowed = view.backend();
	let err = state.set("items", Sequence::from_values(["b"])).unwrap_err();
	assert!(matches!(
		MountError::<MemoryBackendError>::from(err),
		MountError::BackendBorrowed
	));
	assert_eq!(borrowed.describe(root), "<body><ul><li>a</li></ul></body>");
	drop(borrowed);

	state.set("items", Sequence::from_values(["c"])).unwrap();
	assert_eq!(view.backend().describe(root), "<body><ul><li>c</li></ul></body>");
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
	#[test]
	fn prop_keyed_permutation_only_moves(order in Just((0..8).collect::<Vec<usize>>()).prop_shuffle()) {
		let mut mounted = mounted_with(ReconcilerSettings::default());
		let keys: Vec<String> = (0..8).map(|i| format!("k{i}")).collect();
		let before: Vec<&str> = keys.iter().map(String::as_str).collect();
		let after: Vec<&str> = order.iter().map(|&i| keys[i].as_str()).collect();

		let old = keyed_list(&before);
		mounted.mount(&old);
		let new = keyed_list(&after);
		mounted.patcher.patch(&old, &new).unwrap();

		prop_assert_eq!(mounted.patcher.backend().creates(), 0);
		prop_assert_eq!(mounted.patcher.backend().removes(), 0);
		let ul = new.elm().unwrap();
		let tags: Vec<String> = mounted
			.patcher
			.backend()
			.children(ul)
			.into_iter()
			.map(|li| mounted.patcher.backend().describe(li))
			.collect();
		let expected: Vec<String> = after.iter().map(|key| format!("<li>{key}</li>")).collect();
		prop_assert_eq!(tags, expected);
	}
}
