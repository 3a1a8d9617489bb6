//! Reactive render mounting.
//!
//! [`mount`] connects the two halves of the runtime: a subscriber renders a
//! [`VNode`] tree from the owner state, and every time the state it read
//! changes, the previous tree is patched into the new one.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use grappelli_reactive::{BoxError, Expression, ReactiveError, Subscriber, Value};
use grappelli_types::{NodeHandle, VNode};
use thiserror::Error;

use crate::vdom::{Diagnostic, NodeOps, PatchError, Patcher, ReconcilerSettings, create_patch_function_with};

/// Failure to mount or re-render.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum MountError<E> {
	/// The render subscriber failed.
	#[error(transparent)]
	Reactive(ReactiveError),
	/// Patching the real tree failed.
	#[error(transparent)]
	Patch(PatchError<E>),
	/// The render function did not produce a node.
	#[error("render function did not produce a node")]
	NotANode,
	/// A re-render found the backend still borrowed through
	/// [`Mount::backend`]; the real tree was left as it was.
	#[error("backend is borrowed; re-render skipped")]
	BackendBorrowed,
}

impl<E> From<PatchError<E>> for MountError<E> {
	fn from(err: PatchError<E>) -> Self {
		MountError::Patch(err)
	}
}

impl<E> From<ReactiveError> for MountError<E>
where
	E: std::error::Error + Send + Sync + 'static,
{
	/// Unwraps failures raised from the render callback, so a write that
	/// triggered a failing re-render reports the patch or mount error itself.
	fn from(err: ReactiveError) -> Self {
		match err {
			ReactiveError::Callback { subscriber, source } => match source.downcast::<PatchError<E>>() {
				Ok(patch) => MountError::Patch(*patch),
				Err(source) => match source.downcast::<MountError<E>>() {
					Ok(mount) => *mount,
					Err(source) => MountError::Reactive(ReactiveError::Callback { subscriber, source }),
				},
			},
			other => MountError::Reactive(other),
		}
	}
}

/// A tree kept in sync with the state it was rendered from.
///
/// Dropping the mount stops the updates but leaves the real tree in place;
/// use [`Mount::unmount`] to remove it.
pub struct Mount<B: NodeOps> {
	subscriber: Subscriber,
	patcher: Rc<RefCell<Patcher<B>>>,
	/// The tree the real nodes currently reflect
	rendered: Rc<RefCell<Option<VNode>>>,
}

/// Render `owner` with `render`, mount the result into `parent`, and
/// re-render on every change of the state the render read.
///
/// # Example
///
/// ```
/// use grappelli_pages::mount::mount;
/// use grappelli_pages::testing::MemoryBackend;
/// use grappelli_pages::vdom::ReconcilerSettings;
/// use grappelli_reactive::{Record, Value, observe};
/// use grappelli_types::VNode;
///
/// let state = Record::from_fields([("greeting", "hello")]);
/// observe(&Value::from(state.clone()));
///
/// let mut backend = MemoryBackend::new();
/// let root = backend.create_root("body");
/// let view = mount(backend, ReconcilerSettings::default(), root, state.clone(), |owner| {
///     let text = owner.as_record().and_then(|r| r.get("greeting")).unwrap_or_default();
///     VNode::element("p").with_text(text.as_str().unwrap_or_default())
/// })
/// .unwrap();
///
/// state.set("greeting", "bye").unwrap();
/// assert_eq!(view.backend().describe(root), "<body><p>bye</p></body>");
/// ```
pub fn mount<B, F>(
	backend: B,
	settings: ReconcilerSettings,
	parent: NodeHandle,
	owner: impl Into<Value>,
	render: F,
) -> Result<Mount<B>, MountError<B::Error>>
where
	B: NodeOps + 'static,
	F: Fn(&Value) -> VNode + 'static,
{
	let patcher = Rc::new(RefCell::new(create_patch_function_with(backend, settings)));

	let rendered: Rc<RefCell<Option<VNode>>> = Rc::new(RefCell::new(None));

	let rerender = patcher.clone();
	let current = rendered.clone();
	let subscriber = Subscriber::try_new(
		owner,
		Expression::getter(move |owner| Value::Node(render(owner))),
		move |new, _| -> Result<(), BoxError> {
			// The getter always yields a node.
			let Some(new) = new.as_node() else {
				return Ok(());
			};
			// Patch from what is on screen, which lags the subscriber's value
			// after a skipped re-render.
			let Some(old) = current.borrow().clone() else {
				return Ok(());
			};
			let Ok(mut patcher) = rerender.try_borrow_mut() else {
				tracing::warn!("backend borrowed during re-render");
				return Err(Box::new(MountError::<B::Error>::BackendBorrowed));
			};
			// Diagnostics describe the latest render only.
			patcher.take_diagnostics();
			patcher.patch(&old, new)?;
			*current.borrow_mut() = Some(new.clone());
			Ok(())
		},
	)
	.map_err(MountError::from)?;

	let tree = subscriber.value();
	let tree = tree.as_node().ok_or(MountError::NotANode)?;
	patcher.borrow_mut().mount(tree, parent, None)?;
	*rendered.borrow_mut() = Some(tree.clone());
	tracing::debug!(subscriber = %subscriber.id(), %parent, "tree mounted");

	Ok(Mount {
		subscriber,
		patcher,
		rendered,
	})
}

impl<B: NodeOps> Mount<B> {
	/// The tree the real nodes currently reflect
	pub fn tree(&self) -> Option<VNode> {
		self.rendered.borrow().clone()
	}

	/// Real node at the root of the rendered tree
	pub fn root(&self) -> Option<NodeHandle> {
		self.tree().and_then(|tree| tree.elm())
	}

	/// The backend
	///
	/// Release the returned borrow before writing to the state: a re-render
	/// that finds it still held fails with [`MountError::BackendBorrowed`].
	pub fn backend(&self) -> Ref<'_, B> {
		Ref::map(self.patcher.borrow(), |patcher| patcher.backend())
	}

	/// Run `f` with mutable access to the backend
	pub fn with_backend_mut<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
		f(self.patcher.borrow_mut().backend_mut())
	}

	/// Diagnostics recorded by the latest render
	pub fn diagnostics(&self) -> Vec<Diagnostic> {
		self.patcher.borrow().diagnostics().to_vec()
	}

	/// Drain the diagnostics recorded by the latest render
	pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
		self.patcher.borrow_mut().take_diagnostics()
	}

	/// The render subscriber
	pub fn subscriber(&self) -> &Subscriber {
		&self.subscriber
	}

	/// Stop re-rendering and remove the tree
	pub fn unmount(self) -> Result<(), PatchError<B::Error>> {
		self.subscriber.teardown();
		match self.tree() {
			Some(tree) => self.patcher.borrow_mut().unmount(&tree),
			None => Ok(()),
		}
	}
}

impl<B: NodeOps> Drop for Mount<B> {
	fn drop(&mut self) {
		self.subscriber.teardown();
	}
}
