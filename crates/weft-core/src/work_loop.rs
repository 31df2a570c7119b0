//! The render phase.
//!
//! A render is a depth-first traversal of the work-in-progress tree: each
//! unit begins a node (running its component or reducing its queue, then
//! reconciling its children) and, once a node has no more children to
//! descend into, completes it bottom-up (creating detached host instances
//! and bubbling effect flags). The traversal owns a [`RenderSession`] that
//! can be parked between units, either because the scheduler asked for
//! the thread back or because a higher-priority lane arrived, and later
//! resumed or thrown away without the committed tree ever observing a
//! half-finished render.

use std::rc::Rc;

use crate::element::Element;
use crate::error::RenderError;
use crate::flags::EffectFlags;
use crate::hooks::render_with_hooks;
use crate::host::HostId;
use crate::lanes::Lane;
use crate::node::{NodeId, NodeProps, NodeState, WorkTag};
use crate::reconcile::reconcile_children;
use crate::root::RootInner;
use crate::scheduler::RenderOutcome;

/// State of one in-flight render: the traversal cursor plus everything
/// needed to clean up if the render never finishes.
pub(crate) struct RenderSession {
    pub(crate) lane: Lane,
    pub(crate) wip_root: NodeId,
    /// Next unit of work; `None` once the traversal has returned to the top.
    pub(crate) next: Option<NodeId>,
    /// Nodes allocated by this render, freed again if it is abandoned.
    pub(crate) fresh: Vec<NodeId>,
    /// Deferred queue consumptions, applied only when the render finishes.
    pub(crate) write_backs: Vec<Box<dyn FnOnce()>>,
}

/// Renders the highest-priority pending work at `lane` and commits it if
/// the traversal runs to completion.
///
/// A parked session for the same lane is resumed in place; a parked
/// session for any other lane has been superseded and is discarded before
/// starting over. Render errors abandon the work-in-progress tree, leave
/// every update queue as it was, and clear the lane so the runtime does
/// not hot-loop on a deterministic failure; the caller decides whether to
/// retry.
pub(crate) fn perform_render(
    root: &Rc<RootInner>,
    lane: Lane,
) -> Result<RenderOutcome, RenderError> {
    if lane.is_none() || !root.pending_lanes.get().contains(lane) {
        return Ok(RenderOutcome::Idle);
    }

    let parked = root.session.borrow_mut().take();
    let mut session = match parked {
        Some(session) if session.lane == lane => session,
        other => {
            if let Some(stale) = other {
                log::debug!("discarding parked render for {:?}", stale.lane);
                discard_session(root, stale);
                root.splice_buffered_dispatches();
            }
            prepare_fresh_stack(root, lane)
        }
    };

    root.rendering.set(true);
    root.rendering_lane.set(lane);
    let sync = lane == Lane::SYNC;

    let result = loop {
        let Some(unit) = session.next else {
            break Ok(());
        };
        if !sync {
            if root.pending_lanes.get().highest().outranks(lane) {
                // Higher-priority work arrived mid-render. Park without a
                // continuation: the callback for that lane throws this
                // session away and the work restarts afterwards.
                park_session(root, session);
                return Ok(RenderOutcome::Yielded);
            }
            if root.scheduler.should_yield() {
                park_session(root, session);
                root.schedule_render_callback(lane);
                return Ok(RenderOutcome::Yielded);
            }
        }
        match perform_unit(root, &mut session, unit) {
            Ok(next) => session.next = next,
            Err(error) => break Err(error),
        }
    };

    root.rendering.set(false);
    root.rendering_lane.set(Lane::NONE);

    match result {
        Ok(()) => {
            for write_back in session.write_backs.drain(..) {
                write_back();
            }
            root.finished.set(Some(session.wip_root));
            crate::commit::commit_root(root, lane);
            root.splice_buffered_dispatches();
            root.ensure_scheduled();
            Ok(RenderOutcome::Committed)
        }
        Err(error) => {
            log::warn!("render at {:?} abandoned: {}", lane, error);
            discard_session(root, session);
            root.pending_lanes.set(root.pending_lanes.get().remove(lane));
            root.splice_buffered_dispatches();
            root.ensure_scheduled();
            Err(error)
        }
    }
}

fn park_session(root: &Rc<RootInner>, session: RenderSession) {
    root.rendering.set(false);
    root.rendering_lane.set(Lane::NONE);
    *root.session.borrow_mut() = Some(session);
}

fn prepare_fresh_stack(root: &Rc<RootInner>, lane: Lane) -> RenderSession {
    log::debug!("render start at {:?}", lane);
    let mut tree = root.tree.borrow_mut();
    let current = root.current.get();
    let (wip, created) = tree.clone_for_work(current, NodeProps::None);
    let node = &mut tree[wip];
    node.parent = None;
    node.sibling = None;
    node.index = 0;
    drop(tree);

    let mut fresh = Vec::new();
    if created {
        fresh.push(wip);
    }
    RenderSession {
        lane,
        wip_root: wip,
        next: Some(wip),
        fresh,
        write_backs: Vec::new(),
    }
}

/// Frees every node the session allocated and unlinks them from their
/// alternates. Staged write-backs drop without running, which is exactly
/// the all-or-nothing contract: an abandoned render consumes nothing.
fn discard_session(root: &Rc<RootInner>, session: RenderSession) {
    let mut tree = root.tree.borrow_mut();
    for id in session.fresh {
        if !tree.is_live(id) {
            continue;
        }
        if let Some(back) = tree[id].alternate {
            if tree.is_live(back) {
                tree[back].alternate = None;
            }
        }
        tree.free(id);
    }
}

fn perform_unit(
    root: &Rc<RootInner>,
    session: &mut RenderSession,
    unit: NodeId,
) -> Result<Option<NodeId>, RenderError> {
    let next = begin_work(root, session, unit)?;
    {
        let mut tree = root.tree.borrow_mut();
        let node = &mut tree[unit];
        node.memoized_props = Some(node.pending_props.clone());
    }
    match next {
        Some(child) => Ok(Some(child)),
        None => Ok(complete_unit(root, unit)),
    }
}

fn begin_work(
    root: &Rc<RootInner>,
    session: &mut RenderSession,
    wip: NodeId,
) -> Result<Option<NodeId>, RenderError> {
    let (tag, alternate) = {
        let tree = root.tree.borrow();
        (tree[wip].tag, tree[wip].alternate)
    };
    // Children of a node with no committed counterpart are mounting for the
    // first time; nothing old exists to diff against or delete.
    let track = alternate.is_some();

    match tag {
        WorkTag::HostRoot => {
            let (queue, base, old_first) = {
                let tree = root.tree.borrow();
                let node = &tree[wip];
                let Some(queue) = node.queue.clone() else {
                    panic!("host root without an update queue");
                };
                let base = match &node.state {
                    NodeState::RenderedElement(element) => element.clone(),
                    _ => None,
                };
                let old_first = alternate.and_then(|alt| tree[alt].child);
                (queue, base, old_first)
            };
            let element = if queue.is_empty() {
                base
            } else {
                let (element, write_back) = queue.reduce(base, session.lane);
                session.write_backs.push(write_back.into_task());
                element
            };
            {
                let mut tree = root.tree.borrow_mut();
                tree[wip].state = NodeState::RenderedElement(element.clone());
            }
            let children: Vec<Element> = element.into_iter().collect();
            let mut tree = root.tree.borrow_mut();
            Ok(reconcile_children(
                &mut tree,
                &mut session.fresh,
                wip,
                old_first,
                &children,
                track,
            ))
        }
        WorkTag::FunctionComponent => {
            let element = render_with_hooks(root, session, wip)?;
            let old_first = {
                let tree = root.tree.borrow();
                alternate.and_then(|alt| tree[alt].child)
            };
            let mut tree = root.tree.borrow_mut();
            Ok(reconcile_children(
                &mut tree,
                &mut session.fresh,
                wip,
                old_first,
                std::slice::from_ref(&element),
                track,
            ))
        }
        WorkTag::HostElement => {
            let (children, old_first) = {
                let tree = root.tree.borrow();
                let node = &tree[wip];
                let NodeProps::Element(el) = &node.pending_props else {
                    panic!("host element without element props");
                };
                (
                    el.children.clone(),
                    alternate.and_then(|alt| tree[alt].child),
                )
            };
            let mut tree = root.tree.borrow_mut();
            Ok(reconcile_children(
                &mut tree,
                &mut session.fresh,
                wip,
                old_first,
                &children,
                track,
            ))
        }
        WorkTag::HostText => Ok(None),
    }
}

/// Completes `unit` and walks toward the next piece of work: a sibling if
/// one exists, otherwise completing ancestors until one has a sibling or
/// the root is done.
fn complete_unit(root: &Rc<RootInner>, unit: NodeId) -> Option<NodeId> {
    let mut node = unit;
    loop {
        complete_work(root, node);
        let (sibling, parent) = {
            let tree = root.tree.borrow();
            (tree[node].sibling, tree[node].parent)
        };
        if sibling.is_some() {
            return sibling;
        }
        match parent {
            Some(parent) => node = parent,
            None => return None,
        }
    }
}

fn complete_work(root: &Rc<RootInner>, wip: NodeId) {
    let (tag, alternate, mounted_host) = {
        let tree = root.tree.borrow();
        let node = &tree[wip];
        (node.tag, node.alternate, node.host)
    };

    match tag {
        WorkTag::HostElement => match mounted_host {
            Some(_) => {
                let changed = {
                    let tree = root.tree.borrow();
                    let old = alternate.and_then(|alt| tree[alt].memoized_props.clone());
                    props_changed(&old, &tree[wip].pending_props)
                };
                if changed {
                    root.tree.borrow_mut()[wip].flags |= EffectFlags::UPDATE;
                }
            }
            None => {
                let host_id = {
                    let tree = root.tree.borrow();
                    let NodeProps::Element(el) = &tree[wip].pending_props else {
                        panic!("host element without element props");
                    };
                    root.host.borrow_mut().create_element(&el.tag, &el.props)
                };
                append_all_children(root, wip, host_id);
                root.tree.borrow_mut()[wip].host = Some(host_id);
            }
        },
        WorkTag::HostText => match mounted_host {
            Some(_) => {
                let changed = {
                    let tree = root.tree.borrow();
                    let old = alternate.and_then(|alt| tree[alt].memoized_props.clone());
                    props_changed(&old, &tree[wip].pending_props)
                };
                if changed {
                    root.tree.borrow_mut()[wip].flags |= EffectFlags::UPDATE;
                }
            }
            None => {
                let host_id = {
                    let tree = root.tree.borrow();
                    let NodeProps::Text(content) = &tree[wip].pending_props else {
                        panic!("host text without text props");
                    };
                    root.host.borrow_mut().create_text(content)
                };
                root.tree.borrow_mut()[wip].host = Some(host_id);
            }
        },
        WorkTag::HostRoot | WorkTag::FunctionComponent => {}
    }

    // Bubble child effects so commit can prune clean subtrees.
    let mut tree = root.tree.borrow_mut();
    let mut bubbled = tree[wip].subtree_flags;
    let mut child = tree[wip].child;
    while let Some(c) = child {
        bubbled |= tree[c].flags | tree[c].subtree_flags;
        child = tree[c].sibling;
    }
    tree[wip].subtree_flags = bubbled;
}

fn props_changed(old: &Option<NodeProps>, new: &NodeProps) -> bool {
    match (old, new) {
        (Some(NodeProps::Element(a)), NodeProps::Element(b)) => a.props != b.props,
        (Some(NodeProps::Text(a)), NodeProps::Text(b)) => a != b,
        _ => true,
    }
}

/// During a mount, children completed before this node already own host
/// instances; gather the topmost ones (looking through components) into
/// the freshly created, still detached parent. The eventual placement of
/// this node then attaches the whole subtree with one host call.
fn append_all_children(root: &Rc<RootInner>, wip: NodeId, parent_host: HostId) {
    let tree = root.tree.borrow();
    let mut host = root.host.borrow_mut();
    let mut node = tree[wip].child;
    while let Some(id) = node {
        let n = &tree[id];
        if n.is_host() {
            if let Some(child_host) = n.host {
                host.append_child(parent_host, child_host);
            }
        } else if let Some(child) = n.child {
            node = Some(child);
            continue;
        }
        // Advance: next sibling, else climb until back at `wip`.
        let mut cursor = id;
        loop {
            if let Some(sibling) = tree[cursor].sibling {
                node = Some(sibling);
                break;
            }
            match tree[cursor].parent {
                Some(parent) if parent != wip => cursor = parent,
                _ => {
                    node = None;
                    break;
                }
            }
        }
    }
}
