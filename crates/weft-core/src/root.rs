//! The root container: entry point and scheduling glue.
//!
//! A [`Root`] owns the work tree for one host container and brokers between
//! three parties: callers dispatching updates (at whatever priority the
//! scheduler reports), the [`TaskScheduler`] that lends us the thread, and
//! the render/commit machinery. Sync-lane work is queued and flushed behind
//! a microtask so multiple dispatches in one event handler coalesce into a
//! single render; all other lanes share one outstanding scheduler callback
//! that is re-targeted whenever a higher-priority lane shows up.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use crate::element::Element;
use crate::error::RenderError;
use crate::host::{HostId, SharedHost};
use crate::lanes::{Lane, Lanes};
use crate::node::{NodeId, NodeKind, NodeProps, NodeState, WorkNode, WorkTag, WorkTree};
use crate::queue::{SharedQueue, Update, UpdateAction};
use crate::scheduler::{RenderOutcome, TaskScheduler};
use crate::work_loop::{perform_render, RenderSession};

/// An update dispatched while a render session existed. The queue append is
/// held back until no session can observe it; the lane is re-merged at that
/// point because the commit in between may have cleared it.
pub(crate) struct BufferedDispatch {
    pub(crate) lane: Lane,
    pub(crate) apply: Box<dyn FnOnce()>,
}

pub(crate) type EffectTask = Box<dyn FnOnce()>;

type SyncTask = Box<dyn FnOnce() -> Result<RenderOutcome, RenderError>>;

pub(crate) struct RootInner {
    pub(crate) tree: RefCell<WorkTree>,
    pub(crate) host: SharedHost,
    pub(crate) scheduler: Rc<dyn TaskScheduler>,
    /// Host node the rendered tree hangs under. Owned by the embedder.
    pub(crate) container: HostId,
    /// Root node of the committed tree; swaps to the finished work-in-
    /// progress root at every commit.
    pub(crate) current: Cell<NodeId>,
    pub(crate) finished: Cell<Option<NodeId>>,
    pub(crate) pending_lanes: Cell<Lanes>,
    /// True only while the work loop is actively stepping units.
    pub(crate) rendering: Cell<bool>,
    pub(crate) rendering_lane: Cell<Lane>,
    /// A render parked between units, waiting to resume or be discarded.
    pub(crate) session: RefCell<Option<RenderSession>>,
    pub(crate) buffered: RefCell<Vec<BufferedDispatch>>,
    pub(crate) pending_destroys: RefCell<Vec<EffectTask>>,
    pub(crate) pending_creates: RefCell<Vec<EffectTask>>,
    passive_scheduled: Cell<bool>,
    sync_tasks: RefCell<VecDeque<SyncTask>>,
    flushing_sync: Cell<bool>,
    /// Staleness guard: bumping this turns every previously scheduled
    /// render callback into a no-op.
    callback_epoch: Cell<u64>,
    scheduled_lane: Cell<Lane>,
}

/// Owning handle to a mounted runtime instance.
pub struct Root {
    inner: Rc<RootInner>,
}

impl Root {
    /// Creates a root rendering into `container`, a host node owned and
    /// provided by the embedder.
    pub fn new(host: SharedHost, scheduler: Rc<dyn TaskScheduler>, container: HostId) -> Root {
        let mut tree = WorkTree::new();
        let mut node = WorkNode::new(WorkTag::HostRoot, None, NodeKind::Root, NodeProps::None);
        node.state = NodeState::RenderedElement(None);
        node.queue = Some(SharedQueue::new());
        let current = tree.alloc(node);
        Root {
            inner: Rc::new(RootInner {
                tree: RefCell::new(tree),
                host,
                scheduler,
                container,
                current: Cell::new(current),
                finished: Cell::new(None),
                pending_lanes: Cell::new(Lanes::NONE),
                rendering: Cell::new(false),
                rendering_lane: Cell::new(Lane::NONE),
                session: RefCell::new(None),
                buffered: RefCell::new(Vec::new()),
                pending_destroys: RefCell::new(Vec::new()),
                pending_creates: RefCell::new(Vec::new()),
                passive_scheduled: Cell::new(false),
                sync_tasks: RefCell::new(VecDeque::new()),
                flushing_sync: Cell::new(false),
                callback_epoch: Cell::new(0),
                scheduled_lane: Cell::new(Lane::NONE),
            }),
        }
    }

    /// Schedules `element` to be rendered into the container at the
    /// scheduler's current priority.
    pub fn render(&self, element: Element) {
        self.inner.render_element(Some(element));
    }

    /// Schedules the container to be emptied and the tree unmounted.
    pub fn unmount(&self) {
        self.inner.render_element(None);
    }

    /// Drains every queued sync render, then any passive effects those
    /// commits produced, repeating until quiescent. Returns the first
    /// render error, leaving later queued work in place. For embedders
    /// (and tests) that have no microtask source of their own.
    pub fn flush_sync(&self) -> Result<(), RenderError> {
        self.inner.flush_sync()
    }

    /// A weak handle for wiring into host callbacks.
    pub fn handle(&self) -> RootHandle {
        RootHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub(crate) fn inner(&self) -> &Rc<RootInner> {
        &self.inner
    }
}

/// Weak, cloneable handle to a [`Root`]. Every operation on a handle whose
/// root has been dropped is a no-op.
#[derive(Clone)]
pub struct RootHandle {
    inner: Weak<RootInner>,
}

impl RootHandle {
    /// Schedules a render. Returns `false` if the root is gone.
    pub fn render(&self, element: Element) -> bool {
        match self.inner.upgrade() {
            Some(inner) => {
                inner.render_element(Some(element));
                true
            }
            None => false,
        }
    }

    pub fn flush_sync(&self) -> Result<(), RenderError> {
        match self.inner.upgrade() {
            Some(inner) => inner.flush_sync(),
            None => Ok(()),
        }
    }

    pub fn is_live(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl RootInner {
    fn render_element(self: &Rc<Self>, element: Option<Element>) {
        let queue = {
            let tree = self.tree.borrow();
            let Some(queue) = tree[self.current.get()].queue.clone() else {
                panic!("host root without an update queue");
            };
            queue
        };
        let lane = self.scheduler.current_lane();
        let update = Update {
            lane,
            action: UpdateAction::Replace(element),
        };
        if self.session_in_flight() {
            self.buffered.borrow_mut().push(BufferedDispatch {
                lane,
                apply: Box::new(move || queue.enqueue(update)),
            });
        } else {
            queue.enqueue(update);
        }
        self.mark_updated(lane);
        self.ensure_scheduled();
    }

    /// Queues a hook update. While any render session exists, active or
    /// parked, the append is buffered so the session never observes a
    /// queue changing underneath its snapshot; the lane still becomes
    /// pending immediately so preemption checks see the update.
    pub(crate) fn dispatch_update<T: Clone + 'static>(
        self: &Rc<Self>,
        node: NodeId,
        queue: &SharedQueue<T>,
        action: UpdateAction<T>,
    ) {
        if !self.tree.borrow().is_live(node) {
            log::warn!("state update dropped: work node {node} is unmounted");
            return;
        }
        let lane = self.scheduler.current_lane();
        let update = Update { lane, action };
        if self.session_in_flight() {
            let queue = queue.clone();
            self.buffered.borrow_mut().push(BufferedDispatch {
                lane,
                apply: Box::new(move || queue.enqueue(update)),
            });
        } else {
            queue.enqueue(update);
        }
        self.mark_updated(lane);
        self.ensure_scheduled();
    }

    pub(crate) fn session_in_flight(&self) -> bool {
        self.rendering.get() || self.session.borrow().is_some()
    }

    pub(crate) fn mark_updated(&self, lane: Lane) {
        self.pending_lanes.set(self.pending_lanes.get().merge(lane));
    }

    pub(crate) fn splice_buffered_dispatches(&self) {
        let buffered = std::mem::take(&mut *self.buffered.borrow_mut());
        for dispatch in buffered {
            (dispatch.apply)();
            self.mark_updated(dispatch.lane);
        }
    }

    /// Makes sure work will run for the highest-priority pending lane.
    /// Sync work is queued behind a microtask so dispatches within one
    /// event handler coalesce; other lanes keep a single outstanding
    /// callback, re-targeted when a higher-priority lane arrives.
    pub(crate) fn ensure_scheduled(self: &Rc<Self>) {
        let next = self.pending_lanes.get().highest();
        if next.is_none() {
            self.scheduled_lane.set(Lane::NONE);
            return;
        }
        if next == Lane::SYNC {
            let weak = Rc::downgrade(self);
            self.sync_tasks
                .borrow_mut()
                .push_back(Box::new(move || match weak.upgrade() {
                    Some(root) => perform_render(&root, Lane::SYNC),
                    None => Ok(RenderOutcome::Idle),
                }));
            let weak = Rc::downgrade(self);
            self.scheduler.schedule_microtask(Box::new(move || {
                if let Some(root) = weak.upgrade() {
                    if let Err(error) = root.flush_sync_queue() {
                        log::warn!("sync render failed: {error}");
                    }
                }
            }));
            return;
        }
        if self.scheduled_lane.get() == next {
            return;
        }
        self.schedule_render_callback(next);
    }

    /// Schedules (or re-targets) the outstanding render callback. The lane
    /// is re-read when the callback finally runs, so it always renders the
    /// most urgent work pending at that moment.
    pub(crate) fn schedule_render_callback(self: &Rc<Self>, lane: Lane) {
        let epoch = self.callback_epoch.get() + 1;
        self.callback_epoch.set(epoch);
        self.scheduled_lane.set(lane);
        let weak = Rc::downgrade(self);
        self.scheduler.schedule_callback(
            lane,
            Box::new(move || {
                let Some(root) = weak.upgrade() else {
                    return Ok(RenderOutcome::Idle);
                };
                if root.callback_epoch.get() != epoch {
                    return Ok(RenderOutcome::Idle);
                }
                root.scheduled_lane.set(Lane::NONE);
                let lane = root.pending_lanes.get().highest();
                perform_render(&root, lane)
            }),
        );
    }

    /// Runs queued sync renders until the queue drains or one fails.
    pub(crate) fn flush_sync_queue(&self) -> Result<(), RenderError> {
        if self.flushing_sync.get() {
            return Ok(());
        }
        self.flushing_sync.set(true);
        let mut result = Ok(());
        loop {
            let task = self.sync_tasks.borrow_mut().pop_front();
            let Some(task) = task else {
                break;
            };
            if let Err(error) = task() {
                result = Err(error);
                break;
            }
        }
        self.flushing_sync.set(false);
        result
    }

    fn flush_sync(self: &Rc<Self>) -> Result<(), RenderError> {
        loop {
            self.flush_sync_queue()?;
            if !self.flush_passive_effects() {
                return Ok(());
            }
        }
    }

    pub(crate) fn schedule_passive_flush(self: &Rc<Self>) {
        if self.passive_scheduled.get() {
            return;
        }
        if self.pending_destroys.borrow().is_empty() && self.pending_creates.borrow().is_empty() {
            return;
        }
        self.passive_scheduled.set(true);
        let weak = Rc::downgrade(self);
        self.scheduler.schedule_microtask(Box::new(move || {
            if let Some(root) = weak.upgrade() {
                root.flush_passive_effects();
            }
        }));
    }

    /// Runs pending passive work: every queued destroy first, then every
    /// queued create. Returns whether anything ran.
    pub(crate) fn flush_passive_effects(self: &Rc<Self>) -> bool {
        self.passive_scheduled.set(false);
        let destroys = std::mem::take(&mut *self.pending_destroys.borrow_mut());
        let creates = std::mem::take(&mut *self.pending_creates.borrow_mut());
        if destroys.is_empty() && creates.is_empty() {
            return false;
        }
        log::debug!(
            "flushing passive effects: {} destroys, {} creates",
            destroys.len(),
            creates.len()
        );
        for destroy in destroys {
            destroy();
        }
        for create in creates {
            create();
        }
        true
    }
}
