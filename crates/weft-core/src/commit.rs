//! The commit phase.
//!
//! Once a render finishes, the work-in-progress tree is walked once more,
//! pruned to subtrees that actually carry mutation flags, and every flagged
//! node's effects are applied through the host adapter in a fixed order:
//! placement, then queued deletions, then in-place content updates. The
//! walk also gathers passive effect work, which runs later in a microtask
//! rather than inside the commit. Afterwards the buffers swap: the
//! just-committed tree becomes current.

use std::rc::Rc;

use crate::flags::EffectFlags;
use crate::hooks::HookSlot;
use crate::host::HostId;
use crate::lanes::Lane;
use crate::node::{NodeId, NodeProps, NodeState, WorkTag, WorkTree};
use crate::root::RootInner;

pub(crate) fn commit_root(root: &Rc<RootInner>, lane: Lane) {
    let Some(finished) = root.finished.take() else {
        return;
    };
    root.pending_lanes.set(root.pending_lanes.get().remove(lane));

    let has_mutations = {
        let tree = root.tree.borrow();
        let node = &tree[finished];
        (node.flags | node.subtree_flags).intersects(EffectFlags::MUTATION)
    };
    if has_mutations {
        commit_mutation_effects(root, finished);
    }

    root.current.set(finished);
    log::debug!("committed render at {:?}", lane);
    root.schedule_passive_flush();
}

/// Depth-first walk of the finished tree, skipping any subtree whose
/// bubbled flags carry no mutation work. Nodes are visited bottom-up:
/// children's effects apply before their parent's.
fn commit_mutation_effects(root: &Rc<RootInner>, finished: NodeId) {
    let mut next = Some(finished);
    while let Some(id) = next {
        let (child, descend) = {
            let tree = root.tree.borrow();
            let node = &tree[id];
            (
                node.child,
                node.subtree_flags.intersects(EffectFlags::MUTATION),
            )
        };
        if descend && child.is_some() {
            next = child;
            continue;
        }
        next = None;
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            commit_effects_on_node(root, current);
            let (sibling, parent) = {
                let tree = root.tree.borrow();
                (tree[current].sibling, tree[current].parent)
            };
            if sibling.is_some() {
                next = sibling;
                break;
            }
            cursor = parent;
        }
    }
}

fn commit_effects_on_node(root: &Rc<RootInner>, id: NodeId) {
    let flags = root.tree.borrow()[id].flags;

    if flags.contains(EffectFlags::PLACEMENT) {
        commit_placement(root, id);
        root.tree.borrow_mut()[id]
            .flags
            .remove(EffectFlags::PLACEMENT);
    }
    if flags.contains(EffectFlags::CHILD_DELETION) {
        let deletions = {
            let mut tree = root.tree.borrow_mut();
            std::mem::take(&mut tree[id].deletions)
        };
        for deleted in deletions {
            commit_deletion(root, deleted);
        }
        root.tree.borrow_mut()[id]
            .flags
            .remove(EffectFlags::CHILD_DELETION);
    }
    if flags.contains(EffectFlags::UPDATE) {
        commit_update(root, id);
        root.tree.borrow_mut()[id].flags.remove(EffectFlags::UPDATE);
    }
    if flags.contains(EffectFlags::PASSIVE) {
        collect_passive_effects(root, id);
        root.tree.borrow_mut()[id]
            .flags
            .remove(EffectFlags::PASSIVE);
    }
}

/// Attaches `id`'s host subtree under its nearest host parent, before the
/// nearest stable host sibling if one exists. A missing host parent is
/// logged and skipped rather than crashing the commit.
fn commit_placement(root: &Rc<RootInner>, id: NodeId) {
    let Some(parent_host) = host_parent_of(root, id) else {
        log::warn!("placement skipped: work node {id} has no host parent");
        return;
    };
    let anchor = host_sibling_of(root, id);
    insert_or_append(root, id, parent_host, anchor);
}

fn host_parent_of(root: &Rc<RootInner>, id: NodeId) -> Option<HostId> {
    let tree = root.tree.borrow();
    let mut cursor = tree[id].parent;
    while let Some(p) = cursor {
        let node = &tree[p];
        match node.tag {
            WorkTag::HostElement => return node.host,
            WorkTag::HostRoot => return Some(root.container),
            _ => cursor = node.parent,
        }
    }
    None
}

/// Finds the host node to insert before: the first host descendant of a
/// following sibling that is not itself being placed in this commit.
/// Returns `None` when the placed node belongs at the end of its parent.
fn host_sibling_of(root: &Rc<RootInner>, id: NodeId) -> Option<HostId> {
    let tree = root.tree.borrow();
    let mut node = id;
    'siblings: loop {
        let mut cursor = node;
        let sibling = loop {
            match tree[cursor].sibling {
                Some(s) => break s,
                None => {
                    let parent = tree[cursor].parent?;
                    if matches!(tree[parent].tag, WorkTag::HostElement | WorkTag::HostRoot) {
                        return None;
                    }
                    cursor = parent;
                }
            }
        };
        node = sibling;
        while !tree[node].is_host() {
            // A sibling that is itself moving is no anchor, and neither is
            // an empty component.
            if tree[node].flags.contains(EffectFlags::PLACEMENT) {
                continue 'siblings;
            }
            match tree[node].child {
                Some(child) => node = child,
                None => continue 'siblings,
            }
        }
        if !tree[node].flags.contains(EffectFlags::PLACEMENT) {
            return tree[node].host;
        }
    }
}

/// Inserts `id`'s topmost host nodes under `parent`. Components fan out to
/// their children so a placed component subtree attaches every host node
/// it owns at the same position.
fn insert_or_append(root: &Rc<RootInner>, id: NodeId, parent: HostId, anchor: Option<HostId>) {
    let (is_host, host, first_child) = {
        let tree = root.tree.borrow();
        let node = &tree[id];
        (node.is_host(), node.host, node.child)
    };
    if is_host {
        if let Some(host_id) = host {
            let mut adapter = root.host.borrow_mut();
            match anchor {
                Some(anchor) => adapter.insert_before(parent, host_id, anchor),
                None => adapter.append_child(parent, host_id),
            }
        }
        return;
    }
    let mut cursor = first_child;
    while let Some(child) = cursor {
        insert_or_append(root, child, parent, anchor);
        cursor = root.tree.borrow()[child].sibling;
    }
}

/// Unmounts a deleted subtree: queues the cleanup of every effect in it,
/// removes only its topmost host nodes from the host tree (descendants go
/// with them), and frees both buffer slots of every node so stale setters
/// see a dead target.
fn commit_deletion(root: &Rc<RootInner>, deleted: NodeId) {
    let mut top_hosts: Vec<NodeId> = Vec::new();
    let mut unmounted: Vec<NodeId> = Vec::new();
    {
        let tree = root.tree.borrow();
        let mut destroys = root.pending_destroys.borrow_mut();
        let mut node = deleted;
        'walk: loop {
            unmounted.push(node);
            match tree[node].tag {
                WorkTag::HostElement | WorkTag::HostText => {
                    record_top_host(&tree, &mut top_hosts, node);
                }
                WorkTag::FunctionComponent => {
                    if let NodeState::Hooks(slots) = &tree[node].state {
                        for slot in slots {
                            if let HookSlot::Effect(effect) = slot {
                                let cleanup = Rc::clone(&effect.cleanup);
                                destroys.push(Box::new(move || {
                                    if let Some(f) = cleanup.borrow_mut().take() {
                                        f();
                                    }
                                }));
                            }
                        }
                    }
                }
                WorkTag::HostRoot => {}
            }
            if let Some(child) = tree[node].child {
                node = child;
                continue 'walk;
            }
            if node == deleted {
                break 'walk;
            }
            loop {
                if let Some(sibling) = tree[node].sibling {
                    node = sibling;
                    continue 'walk;
                }
                match tree[node].parent {
                    Some(parent) if parent != deleted => node = parent,
                    _ => break 'walk,
                }
            }
        }
    }

    if let Some(parent_host) = host_parent_of(root, deleted) {
        let tree = root.tree.borrow();
        let mut adapter = root.host.borrow_mut();
        for id in &top_hosts {
            if let Some(host_id) = tree[*id].host {
                adapter.remove_child(parent_host, host_id);
            }
        }
    } else if !top_hosts.is_empty() {
        log::warn!("deletion skipped host removal: no host parent found");
    }

    let mut tree = root.tree.borrow_mut();
    for id in unmounted {
        if let Some(alt) = tree.try_get(id).and_then(|node| node.alternate) {
            tree.free(alt);
        }
        tree.free(id);
    }
}

/// Records `node` only if it sits at the top level of the deleted subtree:
/// the walk is depth-first, so a host node is top-level exactly when it is
/// a sibling of the last recorded one (or the first found). Descendants of
/// a recorded host are skipped; removing the top node removes them.
fn record_top_host(tree: &WorkTree, recorded: &mut Vec<NodeId>, node: NodeId) {
    let Some(&last) = recorded.last() else {
        recorded.push(node);
        return;
    };
    let mut cursor = tree[last].sibling;
    while let Some(id) = cursor {
        if id == node {
            recorded.push(node);
            return;
        }
        cursor = tree[id].sibling;
    }
}

fn commit_update(root: &Rc<RootInner>, id: NodeId) {
    let tree = root.tree.borrow();
    let node = &tree[id];
    let Some(host_id) = node.host else {
        return;
    };
    match &node.pending_props {
        NodeProps::Element(el) => root.host.borrow_mut().update_element(host_id, &el.props),
        NodeProps::Text(content) => root.host.borrow_mut().update_text(host_id, content),
        _ => {}
    }
}

/// Queues this node's scheduled effects: a destroy running whatever
/// cleanup the previous run left behind, then a create storing the new
/// cleanup. The flush runs every queued destroy before any create.
fn collect_passive_effects(root: &Rc<RootInner>, id: NodeId) {
    let tree = root.tree.borrow();
    let NodeState::Hooks(slots) = &tree[id].state else {
        return;
    };
    let mut destroys = root.pending_destroys.borrow_mut();
    let mut creates = root.pending_creates.borrow_mut();
    for slot in slots {
        let HookSlot::Effect(effect) = slot else {
            continue;
        };
        if !effect.needs_run {
            continue;
        }
        let cleanup = Rc::clone(&effect.cleanup);
        destroys.push(Box::new(move || {
            if let Some(f) = cleanup.borrow_mut().take() {
                f();
            }
        }));
        let create = Rc::clone(&effect.create);
        let cleanup = Rc::clone(&effect.cleanup);
        creates.push(Box::new(move || {
            if let Some(f) = create.borrow_mut().take() {
                *cleanup.borrow_mut() = f();
            }
        }));
    }
}
