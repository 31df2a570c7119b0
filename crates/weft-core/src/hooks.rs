//! The hook runtime.
//!
//! Hooks are addressed positionally: each function component keeps a ledger
//! of slots, and every render must call the same hooks in the same order.
//! On mount each call appends a slot; on update each call consumes the next
//! slot from the previous render. Calling a different number of hooks, or a
//! different kind at some position, is a render error, not something the
//! runtime tries to paper over.
//!
//! Components receive a [`Scope`] as their first argument and read or write
//! state only through it, so "hook outside a component" is a shape the API
//! mostly cannot express.

use std::any::Any;
use std::cell::RefCell;
use std::hash::Hash;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::element::Element;
use crate::error::RenderError;
use crate::flags::EffectFlags;
use crate::hash::hash_key;
use crate::lanes::Lane;
use crate::node::{NodeId, NodeKind, NodeProps, NodeState};
use crate::queue::{SharedQueue, UpdateAction};
use crate::root::RootInner;
use crate::work_loop::RenderSession;

/// A teardown closure returned by an effect, run before the effect re-runs
/// and when its component unmounts.
pub type CleanupFn = Box<dyn FnOnce()>;

pub(crate) type EffectCreate = Box<dyn FnOnce() -> Option<CleanupFn>>;

/// Conversion for effect return values: effects may return nothing, a
/// cleanup closure, or an explicit `Option<CleanupFn>`.
pub trait IntoCleanup {
    fn into_cleanup(self) -> Option<CleanupFn>;
}

impl IntoCleanup for () {
    fn into_cleanup(self) -> Option<CleanupFn> {
        None
    }
}

impl<F: FnOnce() + 'static> IntoCleanup for F {
    fn into_cleanup(self) -> Option<CleanupFn> {
        Some(Box::new(self))
    }
}

impl IntoCleanup for Option<CleanupFn> {
    fn into_cleanup(self) -> Option<CleanupFn> {
        self
    }
}

/// Dependency snapshot for [`Scope::use_effect`].
///
/// Dependencies are captured as per-entry hashes and compared pairwise
/// against the previous render, short-circuiting on the first difference.
/// [`Deps::always`] (no snapshot at all) forces a re-run every render;
/// an empty list runs the effect once at mount.
pub struct Deps {
    entries: Option<SmallVec<[u64; 4]>>,
}

impl Deps {
    /// Re-run the effect after every committed render.
    pub fn always() -> Deps {
        Deps { entries: None }
    }

    /// Run the effect once when the component mounts.
    pub fn once() -> Deps {
        Deps {
            entries: Some(SmallVec::new()),
        }
    }

    /// Re-run the effect whenever any entry of `list` changes between
    /// renders.
    pub fn of(list: impl DepList) -> Deps {
        Deps {
            entries: Some(list.dep_hashes()),
        }
    }
}

/// Tuples of hashable values usable as effect dependencies.
pub trait DepList {
    fn dep_hashes(&self) -> SmallVec<[u64; 4]>;
}

macro_rules! impl_dep_list {
    ($($name:ident : $idx:tt),*) => {
        impl<$($name: Hash),*> DepList for ($($name,)*) {
            fn dep_hashes(&self) -> SmallVec<[u64; 4]> {
                let mut hashes = SmallVec::new();
                $(hashes.push(hash_key(&self.$idx));)*
                hashes
            }
        }
    };
}

impl_dep_list!();
impl_dep_list!(A: 0);
impl_dep_list!(A: 0, B: 1);
impl_dep_list!(A: 0, B: 1, C: 2);
impl_dep_list!(A: 0, B: 1, C: 2, D: 3);
impl_dep_list!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_dep_list!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

fn deps_changed(prev: &Option<SmallVec<[u64; 4]>>, next: &Option<SmallVec<[u64; 4]>>) -> bool {
    match (prev, next) {
        (Some(a), Some(b)) => a.len() != b.len() || a.iter().zip(b.iter()).any(|(x, y)| x != y),
        _ => true,
    }
}

/// One entry in a component's hook ledger.
#[derive(Clone)]
pub(crate) enum HookSlot {
    State(StateSlot),
    Effect(EffectSlot),
}

#[derive(Clone)]
pub(crate) struct StateSlot {
    /// The value as of the last completed render, type-erased.
    pub(crate) memoized: Rc<dyn Any>,
    /// The erased [`SharedQueue<T>`], shared with every setter handed out
    /// for this slot.
    pub(crate) queue: Rc<dyn Any>,
}

#[derive(Clone)]
pub(crate) struct EffectSlot {
    /// Set when this render scheduled the effect to run at commit.
    pub(crate) needs_run: bool,
    /// The pending create closure; taken by the commit phase.
    pub(crate) create: Rc<RefCell<Option<EffectCreate>>>,
    /// The live cleanup, carried forward across renders by reference so a
    /// later run (or unmount) tears down exactly what the last run set up.
    pub(crate) cleanup: Rc<RefCell<Option<CleanupFn>>>,
    pub(crate) deps: Option<SmallVec<[u64; 4]>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum HookMode {
    Mount,
    Update,
}

/// Raises a hook protocol violation out of the component's render. The work
/// loop catches the unwind and reports the original [`RenderError`].
fn fail_render(error: RenderError) -> ! {
    std::panic::panic_any(error)
}

/// The render context passed to every function component.
pub struct Scope {
    root: Weak<RootInner>,
    node: NodeId,
    lane: Lane,
    mode: HookMode,
    prev: Vec<HookSlot>,
    next: Vec<HookSlot>,
    cursor: usize,
    write_backs: Vec<Box<dyn FnOnce()>>,
    passive: bool,
}

impl Scope {
    /// Declares a state cell. Returns the current value and a setter that
    /// can be stored, cloned and invoked from anywhere, including event
    /// handlers and effects.
    ///
    /// `init` runs only on mount. On update, the value reflects every
    /// pending update whose lane matches the render in flight; updates on
    /// other lanes stay queued.
    pub fn use_state<T, F>(&mut self, init: F) -> (T, StateSetter<T>)
    where
        T: Clone + 'static,
        F: FnOnce() -> T,
    {
        let index = self.cursor;
        self.cursor += 1;
        match self.mode {
            HookMode::Mount => {
                let value = init();
                let queue = SharedQueue::new();
                self.next.push(HookSlot::State(StateSlot {
                    memoized: Rc::new(value.clone()),
                    queue: Rc::new(queue.clone()),
                }));
                let setter = StateSetter {
                    root: self.root.clone(),
                    node: self.node,
                    queue,
                };
                (value, setter)
            }
            HookMode::Update => {
                let (erased_queue, erased_value) = match self.prev.get(index) {
                    Some(HookSlot::State(slot)) => {
                        (Rc::clone(&slot.queue), Rc::clone(&slot.memoized))
                    }
                    Some(HookSlot::Effect(_)) => {
                        fail_render(RenderError::HookKindMismatch { index })
                    }
                    None => fail_render(RenderError::HookCountMismatch {
                        previous: self.prev.len(),
                        current: index + 1,
                    }),
                };
                let queue = match erased_queue.downcast_ref::<SharedQueue<T>>() {
                    Some(queue) => queue.clone(),
                    None => fail_render(RenderError::HookKindMismatch { index }),
                };
                let base = match erased_value.downcast_ref::<T>() {
                    Some(value) => value.clone(),
                    None => fail_render(RenderError::HookKindMismatch { index }),
                };
                let value = if queue.is_empty() {
                    base
                } else {
                    let (value, write_back) = queue.reduce(base, self.lane);
                    self.write_backs.push(write_back.into_task());
                    value
                };
                self.next.push(HookSlot::State(StateSlot {
                    memoized: Rc::new(value.clone()),
                    queue: erased_queue,
                }));
                let setter = StateSetter {
                    root: self.root.clone(),
                    node: self.node,
                    queue,
                };
                (value, setter)
            }
        }
    }

    /// Declares a passive effect. `create` runs after commit, off the
    /// critical path, whenever `deps` changed since the previous render
    /// (always on mount). Its return value converts into an optional
    /// cleanup, which runs before the next create and at unmount.
    pub fn use_effect<C, R>(&mut self, deps: Deps, create: C)
    where
        C: FnOnce() -> R + 'static,
        R: IntoCleanup,
    {
        let index = self.cursor;
        self.cursor += 1;
        let create: EffectCreate = Box::new(move || create().into_cleanup());
        match self.mode {
            HookMode::Mount => {
                self.passive = true;
                self.next.push(HookSlot::Effect(EffectSlot {
                    needs_run: true,
                    create: Rc::new(RefCell::new(Some(create))),
                    cleanup: Rc::new(RefCell::new(None)),
                    deps: deps.entries,
                }));
            }
            HookMode::Update => {
                let (prev_cleanup, prev_deps) = match self.prev.get(index) {
                    Some(HookSlot::Effect(slot)) => (Rc::clone(&slot.cleanup), slot.deps.clone()),
                    Some(HookSlot::State(_)) => {
                        fail_render(RenderError::HookKindMismatch { index })
                    }
                    None => fail_render(RenderError::HookCountMismatch {
                        previous: self.prev.len(),
                        current: index + 1,
                    }),
                };
                let changed = deps_changed(&prev_deps, &deps.entries);
                if changed {
                    self.passive = true;
                }
                self.next.push(HookSlot::Effect(EffectSlot {
                    needs_run: changed,
                    create: Rc::new(RefCell::new(changed.then_some(create))),
                    cleanup: prev_cleanup,
                    deps: deps.entries,
                }));
            }
        }
    }
}

/// Writable handle to one state cell. Cloneable and independent of the
/// render that produced it; dispatching after the owning component
/// unmounted logs a warning and drops the update.
pub struct StateSetter<T> {
    root: Weak<RootInner>,
    node: NodeId,
    queue: SharedQueue<T>,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        StateSetter {
            root: self.root.clone(),
            node: self.node,
            queue: self.queue.clone(),
        }
    }
}

impl<T: Clone + 'static> StateSetter<T> {
    /// Replace the value outright.
    pub fn set(&self, value: T) {
        self.dispatch(UpdateAction::Replace(value));
    }

    /// Derive the next value from the one before it in the queue order.
    /// The closure may run more than once if its render is thrown away and
    /// retried, so it must not have side effects.
    pub fn update<F: Fn(&T) -> T + 'static>(&self, f: F) {
        self.dispatch(UpdateAction::Compute(Rc::new(f)));
    }

    fn dispatch(&self, action: UpdateAction<T>) {
        let Some(root) = self.root.upgrade() else {
            log::warn!("state update dropped: root has been dropped");
            return;
        };
        root.dispatch_update(self.node, &self.queue, action);
    }
}

/// Runs a component's render function against a fresh hook ledger and
/// installs the result on the node. Panics inside the component (including
/// hook protocol violations) are caught and surfaced as [`RenderError`]s,
/// leaving the committed tree untouched.
pub(crate) fn render_with_hooks(
    root: &Rc<RootInner>,
    session: &mut RenderSession,
    wip: NodeId,
) -> Result<Element, RenderError> {
    let (render, props, prev, mode) = {
        let tree = root.tree.borrow();
        let node = &tree[wip];
        let NodeKind::Component { render, .. } = &node.kind else {
            panic!("render_with_hooks on a non-component node");
        };
        let NodeProps::Component(props) = &node.pending_props else {
            panic!("component node without component props");
        };
        let (prev, mode) = match node.alternate {
            Some(alt) => match &tree[alt].state {
                NodeState::Hooks(slots) => (slots.clone(), HookMode::Update),
                _ => (Vec::new(), HookMode::Mount),
            },
            None => (Vec::new(), HookMode::Mount),
        };
        (Rc::clone(render), Rc::clone(props), prev, mode)
    };

    let prev_len = prev.len();
    let mut scope = Scope {
        root: Rc::downgrade(root),
        node: wip,
        lane: session.lane,
        mode,
        prev,
        next: Vec::with_capacity(prev_len),
        cursor: 0,
        write_backs: Vec::new(),
        passive: false,
    };
    let outcome = catch_unwind(AssertUnwindSafe(|| render(&mut scope, props.as_ref())));
    let element = match outcome {
        Ok(element) => element,
        Err(payload) => return Err(panic_to_error(payload)),
    };
    if mode == HookMode::Update && scope.cursor != prev_len {
        return Err(RenderError::HookCountMismatch {
            previous: prev_len,
            current: scope.cursor,
        });
    }

    {
        let mut tree = root.tree.borrow_mut();
        let node = &mut tree[wip];
        node.state = NodeState::Hooks(std::mem::take(&mut scope.next));
        if scope.passive {
            node.flags |= EffectFlags::PASSIVE;
        }
    }
    session.write_backs.append(&mut scope.write_backs);
    Ok(element)
}

fn panic_to_error(payload: Box<dyn Any + Send>) -> RenderError {
    match payload.downcast::<RenderError>() {
        Ok(error) => *error,
        Err(payload) => {
            let message = if let Some(message) = payload.downcast_ref::<&str>() {
                (*message).to_string()
            } else if let Some(message) = payload.downcast_ref::<String>() {
                message.clone()
            } else {
                "opaque panic payload".to_string()
            };
            RenderError::ComponentPanicked { message }
        }
    }
}
