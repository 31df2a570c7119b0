//! The double-buffered work tree.
//!
//! Every mounted element is backed by a [`WorkNode`] stored in a [`WorkTree`]
//! arena. Nodes link to parent, first child and next sibling by [`NodeId`],
//! and each node keeps an `alternate` link to its counterpart in the other
//! buffer: the committed tree is read while a work-in-progress tree is built
//! against it, and a successful commit swaps which buffer is current.

use std::any::Any;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::element::{Element, HostElement, Key, RenderFn};
use crate::flags::EffectFlags;
use crate::hooks::HookSlot;
use crate::host::HostId;
use crate::queue::SharedQueue;

/// Index of a node in the [`WorkTree`] arena.
pub(crate) type NodeId = usize;

/// Update queue hanging off the host root: each entry replaces the element
/// rendered into the container (`None` clears it).
pub(crate) type RootQueue = SharedQueue<Option<Element>>;

/// Discriminates what kind of work a node represents.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum WorkTag {
    HostRoot,
    FunctionComponent,
    HostElement,
    HostText,
}

/// Identity half of a node: what it *is*, independent of the props it was
/// last given. Reuse across renders compares this against the incoming
/// element description.
#[derive(Clone)]
pub(crate) enum NodeKind {
    Root,
    Component { identity: usize, render: RenderFn },
    Element { tag: Rc<str> },
    Text,
}

/// Input half of a node: the description it should render from next
/// (`pending`) or last rendered from (`memoized`).
#[derive(Clone)]
pub(crate) enum NodeProps {
    None,
    Component(Rc<dyn Any>),
    Element(Rc<HostElement>),
    Text(Rc<str>),
}

/// Retained local state, by tag: the root remembers the element it last
/// rendered, function components keep their hook ledger.
#[derive(Clone)]
pub(crate) enum NodeState {
    None,
    RenderedElement(Option<Element>),
    Hooks(Vec<HookSlot>),
}

pub(crate) struct WorkNode {
    pub(crate) tag: WorkTag,
    pub(crate) key: Option<Key>,
    pub(crate) kind: NodeKind,
    pub(crate) pending_props: NodeProps,
    pub(crate) memoized_props: Option<NodeProps>,
    pub(crate) state: NodeState,
    /// Only the host root carries an update queue; hook queues live inside
    /// [`NodeState::Hooks`] slots.
    pub(crate) queue: Option<RootQueue>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) child: Option<NodeId>,
    pub(crate) sibling: Option<NodeId>,
    /// Position among siblings at the time this node was last reconciled.
    pub(crate) index: usize,
    pub(crate) flags: EffectFlags,
    pub(crate) subtree_flags: EffectFlags,
    /// Old children scheduled for unmount, recorded on the parent.
    pub(crate) deletions: SmallVec<[NodeId; 4]>,
    pub(crate) host: Option<HostId>,
    pub(crate) alternate: Option<NodeId>,
}

impl WorkNode {
    pub(crate) fn new(tag: WorkTag, key: Option<Key>, kind: NodeKind, pending: NodeProps) -> Self {
        WorkNode {
            tag,
            key,
            kind,
            pending_props: pending,
            memoized_props: None,
            state: NodeState::None,
            queue: None,
            parent: None,
            child: None,
            sibling: None,
            index: 0,
            flags: EffectFlags::empty(),
            subtree_flags: EffectFlags::empty(),
            deletions: SmallVec::new(),
            host: None,
            alternate: None,
        }
    }

    /// Whether this node is a host-level node (element or text) that owns a
    /// host instance once mounted.
    pub(crate) fn is_host(&self) -> bool {
        matches!(self.tag, WorkTag::HostElement | WorkTag::HostText)
    }
}

/// Arena of work nodes. Slots are tombstoned on free so stale [`NodeId`]s
/// held by state setters can be detected instead of resolving to an
/// unrelated node.
pub(crate) struct WorkTree {
    nodes: Vec<Option<WorkNode>>,
}

impl WorkTree {
    pub(crate) fn new() -> Self {
        WorkTree { nodes: Vec::new() }
    }

    pub(crate) fn alloc(&mut self, node: WorkNode) -> NodeId {
        self.nodes.push(Some(node));
        self.nodes.len() - 1
    }

    /// Tombstones a slot. The id stays reserved; later lookups through
    /// [`WorkTree::try_get`] report it as dead.
    pub(crate) fn free(&mut self, id: NodeId) {
        if let Some(slot) = self.nodes.get_mut(id) {
            *slot = None;
        }
    }

    pub(crate) fn is_live(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id), Some(Some(_)))
    }

    pub(crate) fn try_get(&self, id: NodeId) -> Option<&WorkNode> {
        self.nodes.get(id).and_then(|slot| slot.as_ref())
    }

    pub(crate) fn live_count(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    /// Clones `current` into its work-in-progress alternate, allocating the
    /// alternate on first use and reusing it afterwards. The reuse path
    /// resets per-render bookkeeping (flags, subtree flags, deletions) and
    /// re-copies everything semantic from `current`, so alternates left over
    /// from an abandoned render are safe to pick up again.
    ///
    /// Structural links (`parent`, `sibling`, `index`) are left for the
    /// reconciler to assign.
    pub(crate) fn clone_for_work(
        &mut self,
        current: NodeId,
        pending: NodeProps,
    ) -> (NodeId, bool) {
        let (tag, key, kind, memoized_props, state, queue, child, host, existing) = {
            let node = &self[current];
            (
                node.tag,
                node.key,
                node.kind.clone(),
                node.memoized_props.clone(),
                node.state.clone(),
                node.queue.clone(),
                node.child,
                node.host,
                node.alternate,
            )
        };
        match existing {
            Some(wip) => {
                let node = &mut self[wip];
                node.tag = tag;
                node.key = key;
                node.kind = kind;
                node.pending_props = pending;
                node.memoized_props = memoized_props;
                node.state = state;
                node.queue = queue;
                node.child = child;
                node.host = host;
                node.flags = EffectFlags::empty();
                node.subtree_flags = EffectFlags::empty();
                node.deletions.clear();
                (wip, false)
            }
            None => {
                let mut node = WorkNode::new(tag, key, kind, pending);
                node.memoized_props = memoized_props;
                node.state = state;
                node.queue = queue;
                node.child = child;
                node.host = host;
                node.alternate = Some(current);
                let wip = self.alloc(node);
                self[current].alternate = Some(wip);
                (wip, true)
            }
        }
    }
}

impl std::ops::Index<NodeId> for WorkTree {
    type Output = WorkNode;

    fn index(&self, id: NodeId) -> &WorkNode {
        match self.nodes.get(id) {
            Some(Some(node)) => node,
            _ => panic!("work node {id} is not live"),
        }
    }
}

impl std::ops::IndexMut<NodeId> for WorkTree {
    fn index_mut(&mut self, id: NodeId) -> &mut WorkNode {
        match self.nodes.get_mut(id) {
            Some(Some(node)) => node,
            _ => panic!("work node {id} is not live"),
        }
    }
}
