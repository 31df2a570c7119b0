//! An in-memory host adapter.
//!
//! [`MemoryHost`] keeps a real child-list tree, so anchors, moves and
//! removals behave like a retained UI surface, and records every adapter
//! call in commit order so tests can assert on the exact mutations a
//! render produced.

use weft_core::{HostAdapter, HostId, HostProps, PropValue};

/// One adapter call, recorded in the order the commit phase issued it.
#[derive(Clone, Debug, PartialEq)]
pub enum HostCall {
    CreateElement { node: HostId, tag: String },
    CreateText { node: HostId, content: String },
    AppendChild { parent: HostId, child: HostId },
    InsertBefore { parent: HostId, child: HostId, anchor: HostId },
    RemoveChild { parent: HostId, child: HostId },
    UpdateElement { node: HostId },
    UpdateText { node: HostId, content: String },
}

/// A node in the in-memory tree. Detached nodes stay inspectable.
#[derive(Default)]
pub struct MemoryNode {
    tag: Option<String>,
    text: Option<String>,
    props: HostProps,
    parent: Option<HostId>,
    children: Vec<HostId>,
}

impl MemoryNode {
    /// The element tag, or `None` for text nodes.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// The text content, or `None` for elements.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn props(&self) -> &HostProps {
        &self.props
    }

    pub fn parent(&self) -> Option<HostId> {
        self.parent
    }

    pub fn children(&self) -> &[HostId] {
        &self.children
    }
}

/// Host adapter double backed by a real tree model.
///
/// Attachment follows retained-surface rules: appending or inserting a
/// node that is already attached somewhere first detaches it, so a move
/// shows up as exactly one recorded call.
pub struct MemoryHost {
    nodes: Vec<MemoryNode>,
    calls: Vec<HostCall>,
}

impl MemoryHost {
    /// The pre-created container node a [`crate::TestHarness`] renders
    /// into.
    pub const CONTAINER: HostId = 0;

    pub fn new() -> MemoryHost {
        MemoryHost {
            nodes: vec![MemoryNode {
                tag: Some("container".to_owned()),
                ..MemoryNode::default()
            }],
            calls: Vec::new(),
        }
    }

    fn push(&mut self, node: MemoryNode) -> HostId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn detach(&mut self, child: HostId) {
        if let Some(parent) = self.nodes[child].parent.take() {
            self.nodes[parent].children.retain(|&c| c != child);
        }
    }

    fn attach(&mut self, parent: HostId, child: HostId, anchor: Option<HostId>) {
        self.detach(child);
        let at = anchor.map(|anchor| {
            self.nodes[parent]
                .children
                .iter()
                .position(|&c| c == anchor)
                .unwrap_or_else(|| {
                    panic!("insert_before: anchor {anchor} is not a child of {parent}")
                })
        });
        match at {
            Some(at) => self.nodes[parent].children.insert(at, child),
            None => self.nodes[parent].children.push(child),
        }
        self.nodes[child].parent = Some(parent);
    }

    /// Looks up a node. Panics if `id` was never handed out by this host.
    pub fn node(&self, id: HostId) -> &MemoryNode {
        self.nodes
            .get(id)
            .unwrap_or_else(|| panic!("no host node with id {id}"))
    }

    /// Every call recorded so far, oldest first.
    pub fn calls(&self) -> &[HostCall] {
        &self.calls
    }

    /// Drains the recorded calls, leaving the tree untouched.
    pub fn take_calls(&mut self) -> Vec<HostCall> {
        std::mem::take(&mut self.calls)
    }

    /// Concatenated text content of the subtree under `id`, in document
    /// order.
    pub fn text_content(&self, id: HostId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: HostId, out: &mut String) {
        let node = self.node(id);
        if let Some(text) = &node.text {
            out.push_str(text);
        }
        for &child in &node.children {
            self.collect_text(child, out);
        }
    }

    /// Renders the subtree under `root` as indented text, one node per
    /// line, for debugging and golden assertions. Props print sorted by
    /// name so the output is stable.
    pub fn dump_tree(&self, root: HostId) -> String {
        let mut out = String::new();
        self.dump_node(&mut out, root, 0);
        out
    }

    fn dump_node(&self, out: &mut String, id: HostId, depth: usize) {
        let indent = "  ".repeat(depth);
        let node = self.node(id);
        match (&node.tag, &node.text) {
            (Some(tag), _) => {
                out.push_str(&format!("{indent}[{id}] {tag}"));
                let mut props: Vec<_> = node.props.iter().collect();
                props.sort_by_key(|&(name, _)| name);
                for (name, value) in props {
                    match value {
                        PropValue::Text(text) => out.push_str(&format!(" {name}={text:?}")),
                        PropValue::Number(number) => out.push_str(&format!(" {name}={number}")),
                        PropValue::Flag(flag) => out.push_str(&format!(" {name}={flag}")),
                    }
                }
            }
            (None, Some(text)) => out.push_str(&format!("{indent}[{id}] {text:?}")),
            (None, None) => out.push_str(&format!("{indent}[{id}] (empty)")),
        }
        out.push('\n');
        for &child in &node.children {
            self.dump_node(out, child, depth + 1);
        }
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostAdapter for MemoryHost {
    fn create_element(&mut self, tag: &str, props: &HostProps) -> HostId {
        let id = self.push(MemoryNode {
            tag: Some(tag.to_owned()),
            props: props.clone(),
            ..MemoryNode::default()
        });
        self.calls.push(HostCall::CreateElement {
            node: id,
            tag: tag.to_owned(),
        });
        id
    }

    fn create_text(&mut self, content: &str) -> HostId {
        let id = self.push(MemoryNode {
            text: Some(content.to_owned()),
            ..MemoryNode::default()
        });
        self.calls.push(HostCall::CreateText {
            node: id,
            content: content.to_owned(),
        });
        id
    }

    fn append_child(&mut self, parent: HostId, child: HostId) {
        self.attach(parent, child, None);
        self.calls.push(HostCall::AppendChild { parent, child });
    }

    fn insert_before(&mut self, parent: HostId, child: HostId, anchor: HostId) {
        self.attach(parent, child, Some(anchor));
        self.calls.push(HostCall::InsertBefore {
            parent,
            child,
            anchor,
        });
    }

    fn remove_child(&mut self, parent: HostId, child: HostId) {
        self.detach(child);
        self.calls.push(HostCall::RemoveChild { parent, child });
    }

    fn update_element(&mut self, node: HostId, props: &HostProps) {
        self.nodes[node].props = props.clone();
        self.calls.push(HostCall::UpdateElement { node });
    }

    fn update_text(&mut self, node: HostId, content: &str) {
        self.nodes[node].text = Some(content.to_owned());
        self.calls.push(HostCall::UpdateText {
            node,
            content: content.to_owned(),
        });
    }
}

#[cfg(test)]
#[path = "tests/memory_host_tests.rs"]
mod tests;
