//! Node identity and sibling key checks.

use std::collections::HashMap;

use grappelli_types::{Key, VNode};

/// Problems found in input trees that do not stop a patch.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
	/// Two siblings share a key.
	DuplicateKey {
		/// The shared key.
		key: Key,
		/// Position of the first sibling with the key.
		first_index: usize,
		/// Position of the colliding sibling.
		duplicate_index: usize,
		/// Tag of the colliding sibling.
		tag: Option<String>,
	},
}

const TEXT_INPUT_TYPES: [&str; 7] = ["text", "number", "password", "search", "email", "tel", "url"];

fn input_type(vnode: &VNode) -> Option<&str> {
	vnode.data().and_then(|data| data.attr("type"))
}

fn is_text_input(kind: Option<&str>) -> bool {
	kind.is_some_and(|kind| TEXT_INPUT_TYPES.contains(&kind))
}

fn same_input_type(a: &VNode, b: &VNode) -> bool {
	if a.tag_name() != Some("input") {
		return true;
	}
	let (type_a, type_b) = (input_type(a), input_type(b));
	type_a == type_b || (is_text_input(type_a) && is_text_input(type_b))
}

/// Whether `b` can be patched onto the real node of `a`.
///
/// Keys, tags and the comment flag must match, both or neither must carry
/// node data, and `<input>` types must be compatible (equal, or both
/// text-like).
pub fn same_vnode(a: &VNode, b: &VNode) -> bool {
	a.key() == b.key()
		&& a.tag_name() == b.tag_name()
		&& a.is_comment() == b.is_comment()
		&& a.data().is_some() == b.data().is_some()
		&& same_input_type(a, b)
}

/// Every repeated key among `children`, in order of discovery.
pub fn find_duplicate_keys(children: &[VNode]) -> Vec<Diagnostic> {
	let mut seen: HashMap<&Key, usize> = HashMap::new();
	let mut found = Vec::new();
	for (index, child) in children.iter().enumerate() {
		let Some(key) = child.key() else {
			continue;
		};
		match seen.get(key) {
			Some(&first_index) => found.push(Diagnostic::DuplicateKey {
				key: key.clone(),
				first_index,
				duplicate_index: index,
				tag: child.tag_name().map(str::to_string),
			}),
			None => {
				seen.insert(key, index);
			}
		}
	}
	found
}
