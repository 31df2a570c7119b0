//! Child reconciliation.
//!
//! Matches a node's previous children (a sibling chain in the committed
//! tree) against the new element descriptions and produces the
//! work-in-progress chain, reusing nodes where key and kind line up,
//! flagging placements for everything new or moved, and recording
//! deletions on the parent for everything that disappeared.
//!
//! Side effects are only tracked when the parent has a committed
//! counterpart (`track`); during a fresh mount the subtree is attached
//! wholesale by its topmost placement, so flagging every descendant
//! would be wasted work.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::element::{Element, Key};
use crate::flags::EffectFlags;
use crate::node::{NodeId, NodeKind, NodeProps, WorkNode, WorkTag, WorkTree};

/// Reconciles `new_children` against the chain starting at `current_first`,
/// links the resulting children under `wip` and returns the first one.
///
/// `fresh` collects every node allocated here so an abandoned render can
/// free them again.
pub(crate) fn reconcile_children(
    tree: &mut WorkTree,
    fresh: &mut Vec<NodeId>,
    wip: NodeId,
    current_first: Option<NodeId>,
    new_children: &[Element],
    track: bool,
) -> Option<NodeId> {
    let first = match new_children {
        [] => {
            delete_remaining(tree, wip, current_first, track);
            None
        }
        [Element::Text(content)] => Some(reconcile_single_text(
            tree,
            fresh,
            wip,
            current_first,
            content,
            track,
        )),
        [element] => Some(reconcile_single_element(
            tree,
            fresh,
            wip,
            current_first,
            element,
            track,
        )),
        _ => reconcile_array(tree, fresh, wip, current_first, new_children, track),
    };
    tree[wip].child = first;
    first
}

/// A single new child replaces the whole old sibling list. Scans the old
/// chain for a key match: a key+kind match is reused (everything else is
/// deleted), a key match with the wrong kind ends the scan since no other
/// sibling can carry the same key, and a key miss deletes that sibling and
/// keeps scanning.
fn reconcile_single_element(
    tree: &mut WorkTree,
    fresh: &mut Vec<NodeId>,
    wip: NodeId,
    current_first: Option<NodeId>,
    element: &Element,
    track: bool,
) -> NodeId {
    let key = element.key();
    let mut cursor = current_first;
    while let Some(old) = cursor {
        let (old_key, old_sibling) = (tree[old].key, tree[old].sibling);
        if old_key == key {
            if element_matches(&tree[old], element) {
                delete_remaining(tree, wip, old_sibling, track);
                let reused = reuse_node(tree, fresh, old, pending_props(element));
                tree[reused].parent = Some(wip);
                return reused;
            }
            delete_remaining(tree, wip, Some(old), track);
            break;
        }
        delete_child(tree, wip, old, track);
        cursor = old_sibling;
    }
    place_new_child(tree, fresh, wip, element, track)
}

/// Text has no key, so only the first old child is a reuse candidate.
fn reconcile_single_text(
    tree: &mut WorkTree,
    fresh: &mut Vec<NodeId>,
    wip: NodeId,
    current_first: Option<NodeId>,
    content: &Rc<str>,
    track: bool,
) -> NodeId {
    if let Some(old) = current_first {
        if tree[old].tag == WorkTag::HostText {
            let old_sibling = tree[old].sibling;
            delete_remaining(tree, wip, old_sibling, track);
            let reused = reuse_node(tree, fresh, old, NodeProps::Text(Rc::clone(content)));
            tree[reused].parent = Some(wip);
            return reused;
        }
        delete_remaining(tree, wip, Some(old), track);
    }
    place_new_child(tree, fresh, wip, &Element::Text(Rc::clone(content)), track)
}

/// Key-indexed single-pass diff for child arrays.
///
/// Old children are indexed by key (positional index when unkeyed). New
/// children walk once, reusing map hits with matching kind. Move detection
/// is greedy: a reused child whose old position is left of the rightmost
/// reused position so far must move, everything else stays as the stable
/// spine. Old children never matched are deleted.
fn reconcile_array(
    tree: &mut WorkTree,
    fresh: &mut Vec<NodeId>,
    wip: NodeId,
    current_first: Option<NodeId>,
    new_children: &[Element],
    track: bool,
) -> Option<NodeId> {
    let mut existing: FxHashMap<MapKey, NodeId> = FxHashMap::default();
    let mut cursor = current_first;
    while let Some(old) = cursor {
        let node = &tree[old];
        let slot = match node.key {
            Some(key) => MapKey::Keyed(key),
            None => MapKey::Index(node.index),
        };
        existing.insert(slot, old);
        cursor = node.sibling;
    }

    let mut first: Option<NodeId> = None;
    let mut previous: Option<NodeId> = None;
    let mut last_placed_index = 0usize;

    for (new_index, element) in new_children.iter().enumerate() {
        let slot = match element.key() {
            Some(key) => MapKey::Keyed(key),
            None => MapKey::Index(new_index),
        };
        let matched = existing
            .get(&slot)
            .copied()
            .filter(|&old| element_matches(&tree[old], element));
        let child = match matched {
            Some(old) => {
                existing.remove(&slot);
                reuse_node(tree, fresh, old, pending_props(element))
            }
            None => create_from_element(tree, fresh, element),
        };

        {
            let node = &mut tree[child];
            node.index = new_index;
            node.parent = Some(wip);
        }
        if track {
            match tree[child].alternate {
                Some(alt) => {
                    let old_index = tree[alt].index;
                    if old_index < last_placed_index {
                        tree[child].flags |= EffectFlags::PLACEMENT;
                    } else {
                        last_placed_index = old_index;
                    }
                }
                None => tree[child].flags |= EffectFlags::PLACEMENT,
            }
        }

        match previous {
            Some(prev) => tree[prev].sibling = Some(child),
            None => first = Some(child),
        }
        previous = Some(child);
    }

    let unmatched: Vec<NodeId> = existing.into_values().collect();
    for old in unmatched {
        delete_child(tree, wip, old, track);
    }

    first
}

#[derive(Hash, PartialEq, Eq)]
enum MapKey {
    Keyed(Key),
    Index(usize),
}

fn element_matches(node: &WorkNode, element: &Element) -> bool {
    match (&node.kind, element) {
        (NodeKind::Element { tag }, Element::Host(el)) => *tag == el.tag,
        (NodeKind::Component { identity, .. }, Element::Component(el)) => {
            *identity == el.identity
        }
        (NodeKind::Text, Element::Text(_)) => true,
        _ => false,
    }
}

fn pending_props(element: &Element) -> NodeProps {
    match element {
        Element::Host(el) => NodeProps::Element(Rc::clone(el)),
        Element::Component(el) => NodeProps::Component(Rc::clone(&el.props)),
        Element::Text(content) => NodeProps::Text(Rc::clone(content)),
    }
}

fn create_from_element(tree: &mut WorkTree, fresh: &mut Vec<NodeId>, element: &Element) -> NodeId {
    let node = match element {
        Element::Host(el) => WorkNode::new(
            WorkTag::HostElement,
            el.key,
            NodeKind::Element {
                tag: Rc::clone(&el.tag),
            },
            NodeProps::Element(Rc::clone(el)),
        ),
        Element::Component(el) => WorkNode::new(
            WorkTag::FunctionComponent,
            el.key,
            NodeKind::Component {
                identity: el.identity,
                render: Rc::clone(&el.render),
            },
            NodeProps::Component(Rc::clone(&el.props)),
        ),
        Element::Text(content) => WorkNode::new(
            WorkTag::HostText,
            None,
            NodeKind::Text,
            NodeProps::Text(Rc::clone(content)),
        ),
    };
    let id = tree.alloc(node);
    fresh.push(id);
    id
}

/// Clones `old` into its alternate for this render. Stale structural links
/// from the clone's previous life are cleared; the caller re-attaches
/// parent, sibling and index.
fn reuse_node(
    tree: &mut WorkTree,
    fresh: &mut Vec<NodeId>,
    old: NodeId,
    pending: NodeProps,
) -> NodeId {
    let (id, created) = tree.clone_for_work(old, pending);
    if created {
        fresh.push(id);
    }
    let node = &mut tree[id];
    node.sibling = None;
    node.index = 0;
    node.parent = None;
    id
}

fn place_new_child(
    tree: &mut WorkTree,
    fresh: &mut Vec<NodeId>,
    wip: NodeId,
    element: &Element,
    track: bool,
) -> NodeId {
    let created = create_from_element(tree, fresh, element);
    tree[created].parent = Some(wip);
    if track {
        tree[created].flags |= EffectFlags::PLACEMENT;
    }
    created
}

fn delete_child(tree: &mut WorkTree, wip: NodeId, child: NodeId, track: bool) {
    if !track {
        return;
    }
    let node = &mut tree[wip];
    node.deletions.push(child);
    node.flags |= EffectFlags::CHILD_DELETION;
}

fn delete_remaining(tree: &mut WorkTree, wip: NodeId, first: Option<NodeId>, track: bool) {
    if !track {
        return;
    }
    let mut cursor = first;
    while let Some(id) = cursor {
        let sibling = tree[id].sibling;
        delete_child(tree, wip, id, track);
        cursor = sibling;
    }
}
