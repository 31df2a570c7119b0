//! Doubles shared by the in-crate suites: a host adapter that records
//! every mutation against a real child-list model, and a scheduler the
//! test cranks by hand.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::element::{Element, HostProps};
use crate::error::RenderError;
use crate::host::{HostAdapter, HostId};
use crate::lanes::{Lane, Lanes};
use crate::root::Root;
use crate::scheduler::{RenderOutcome, RenderTask, TaskScheduler};

/// One recorded adapter call.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum HostOp {
    Create { node: HostId, tag: String },
    CreateText { node: HostId, content: String },
    Append { parent: HostId, child: HostId },
    InsertBefore { parent: HostId, child: HostId, anchor: HostId },
    Remove { parent: HostId, child: HostId },
    UpdateElement { node: HostId },
    UpdateText { node: HostId, content: String },
}

#[derive(Default)]
pub(crate) struct RecordedNode {
    pub(crate) tag: Option<String>,
    pub(crate) text: Option<String>,
    pub(crate) props: HostProps,
    parent: Option<HostId>,
    pub(crate) children: Vec<HostId>,
}

/// Host double with attachment semantics: appending or inserting a node
/// that is already attached somewhere first detaches it, so a move shows
/// up as exactly one call.
pub(crate) struct RecordingHost {
    nodes: Vec<RecordedNode>,
    pub(crate) ops: Vec<HostOp>,
}

impl RecordingHost {
    pub(crate) const CONTAINER: HostId = 0;

    pub(crate) fn new() -> RecordingHost {
        RecordingHost {
            nodes: vec![RecordedNode {
                tag: Some("container".to_owned()),
                ..RecordedNode::default()
            }],
            ops: Vec::new(),
        }
    }

    fn push(&mut self, node: RecordedNode) -> HostId {
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
                .expect("anchor is not a child of parent")
        });
        match at {
            Some(at) => self.nodes[parent].children.insert(at, child),
            None => self.nodes[parent].children.push(child),
        }
        self.nodes[child].parent = Some(parent);
    }

    pub(crate) fn node(&self, id: HostId) -> &RecordedNode {
        &self.nodes[id]
    }

    /// The tag for elements, the quoted content for text nodes.
    pub(crate) fn label(&self, id: HostId) -> String {
        let node = &self.nodes[id];
        match (&node.tag, &node.text) {
            (Some(tag), _) => tag.clone(),
            (None, Some(text)) => format!("{text:?}"),
            _ => "?".to_owned(),
        }
    }

    pub(crate) fn child_labels(&self, parent: HostId) -> Vec<String> {
        self.nodes[parent]
            .children
            .iter()
            .map(|&c| self.label(c))
            .collect()
    }

    /// Concatenated text content of the subtree, in document order.
    pub(crate) fn text_of(&self, id: HostId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: HostId, out: &mut String) {
        if let Some(text) = &self.nodes[id].text {
            out.push_str(text);
        }
        for &child in &self.nodes[id].children {
            self.collect_text(child, out);
        }
    }
}

impl HostAdapter for RecordingHost {
    fn create_element(&mut self, tag: &str, props: &HostProps) -> HostId {
        let id = self.push(RecordedNode {
            tag: Some(tag.to_owned()),
            props: props.clone(),
            ..RecordedNode::default()
        });
        self.ops.push(HostOp::Create {
            node: id,
            tag: tag.to_owned(),
        });
        id
    }

    fn create_text(&mut self, content: &str) -> HostId {
        let id = self.push(RecordedNode {
            text: Some(content.to_owned()),
            ..RecordedNode::default()
        });
        self.ops.push(HostOp::CreateText {
            node: id,
            content: content.to_owned(),
        });
        id
    }

    fn append_child(&mut self, parent: HostId, child: HostId) {
        self.attach(parent, child, None);
        self.ops.push(HostOp::Append { parent, child });
    }

    fn insert_before(&mut self, parent: HostId, child: HostId, anchor: HostId) {
        self.attach(parent, child, Some(anchor));
        self.ops.push(HostOp::InsertBefore {
            parent,
            child,
            anchor,
        });
    }

    fn remove_child(&mut self, parent: HostId, child: HostId) {
        self.detach(child);
        self.ops.push(HostOp::Remove { parent, child });
    }

    fn update_element(&mut self, node: HostId, props: &HostProps) {
        self.nodes[node].props = props.clone();
        self.ops.push(HostOp::UpdateElement { node });
    }

    fn update_text(&mut self, node: HostId, content: &str) {
        self.nodes[node].text = Some(content.to_owned());
        self.ops.push(HostOp::UpdateText {
            node,
            content: content.to_owned(),
        });
    }
}

/// Scheduler double. Tasks queue until the test cranks them, the reported
/// lane is whatever the test last set, and yield checks answer from a
/// script (then `false` forever).
pub(crate) struct StepScheduler {
    lane: Cell<Lane>,
    microtasks: RefCell<VecDeque<Box<dyn FnOnce()>>>,
    callbacks: RefCell<VecDeque<(Lane, RenderTask)>>,
    yields: RefCell<VecDeque<bool>>,
    outcomes: RefCell<Vec<Result<RenderOutcome, RenderError>>>,
}

impl StepScheduler {
    pub(crate) fn new() -> StepScheduler {
        StepScheduler {
            lane: Cell::new(Lane::SYNC),
            microtasks: RefCell::new(VecDeque::new()),
            callbacks: RefCell::new(VecDeque::new()),
            yields: RefCell::new(VecDeque::new()),
            outcomes: RefCell::new(Vec::new()),
        }
    }

    /// Runs `f` with the reported lane switched, the way an embedder tags
    /// an input event before dispatching into the tree.
    pub(crate) fn with_lane(&self, lane: Lane, f: impl FnOnce()) {
        let previous = self.lane.replace(lane);
        f();
        self.lane.set(previous);
    }

    pub(crate) fn script_yields(&self, answers: &[bool]) {
        self.yields.borrow_mut().extend(answers.iter().copied());
    }

    pub(crate) fn run_microtasks(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.microtasks.borrow_mut().pop_front();
            let Some(task) = task else {
                break;
            };
            task();
            ran += 1;
        }
        ran
    }

    pub(crate) fn run_next_callback(&self) -> bool {
        let task = self.callbacks.borrow_mut().pop_front();
        let Some((_, task)) = task else {
            return false;
        };
        let outcome = task();
        self.outcomes.borrow_mut().push(outcome);
        true
    }

    pub(crate) fn callback_count(&self) -> usize {
        self.callbacks.borrow().len()
    }

    /// Cranks microtasks and callbacks until a full pass runs nothing.
    pub(crate) fn drain(&self) {
        loop {
            let ran = self.run_microtasks();
            let ran_callback = self.run_next_callback();
            if ran == 0 && !ran_callback {
                break;
            }
        }
    }

    pub(crate) fn outcomes(&self) -> Vec<Result<RenderOutcome, RenderError>> {
        self.outcomes.borrow().clone()
    }
}

impl TaskScheduler for StepScheduler {
    fn current_lane(&self) -> Lane {
        self.lane.get()
    }

    fn schedule_callback(&self, lane: Lane, task: RenderTask) {
        self.callbacks.borrow_mut().push_back((lane, task));
    }

    fn schedule_microtask(&self, task: Box<dyn FnOnce()>) {
        self.microtasks.borrow_mut().push_back(task);
    }

    fn should_yield(&self) -> bool {
        self.yields.borrow_mut().pop_front().unwrap_or(false)
    }
}

/// A root wired to fresh doubles.
pub(crate) struct Fixture {
    pub(crate) host: Rc<RefCell<RecordingHost>>,
    pub(crate) scheduler: Rc<StepScheduler>,
    pub(crate) root: Root,
}

pub(crate) fn fixture() -> Fixture {
    let host = Rc::new(RefCell::new(RecordingHost::new()));
    let scheduler = Rc::new(StepScheduler::new());
    let root = Root::new(host.clone(), scheduler.clone(), RecordingHost::CONTAINER);
    Fixture {
        host,
        scheduler,
        root,
    }
}

impl Fixture {
    /// Renders `element` and cranks everything at the current lane.
    pub(crate) fn mount(&self, element: Element) {
        self.root.render(element);
        self.scheduler.drain();
    }

    pub(crate) fn flush(&self) {
        self.scheduler.drain();
    }

    pub(crate) fn ops(&self) -> Vec<HostOp> {
        self.host.borrow().ops.clone()
    }

    pub(crate) fn take_ops(&self) -> Vec<HostOp> {
        std::mem::take(&mut self.host.borrow_mut().ops)
    }

    pub(crate) fn container_labels(&self) -> Vec<String> {
        self.host.borrow().child_labels(RecordingHost::CONTAINER)
    }

    pub(crate) fn container_text(&self) -> String {
        self.host.borrow().text_of(RecordingHost::CONTAINER)
    }

    pub(crate) fn pending_lanes(&self) -> Lanes {
        self.root.inner().pending_lanes.get()
    }
}

/// A slot a component under test can deposit its setter into, so the test
/// drives state from outside.
pub(crate) type SetterCell<T> = Rc<RefCell<Option<crate::hooks::StateSetter<T>>>>;

pub(crate) fn setter_cell<T>() -> SetterCell<T> {
    Rc::new(RefCell::new(None))
}

pub(crate) fn take_setter<T>(cell: &SetterCell<T>) -> crate::hooks::StateSetter<T> {
    cell.borrow_mut()
        .take()
        .unwrap_or_else(|| panic!("component never deposited its setter"))
}
