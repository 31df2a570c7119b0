//! A headless harness for exercising a root in tests.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use weft_core::{Element, Lane, RenderError, Root};

use crate::memory_host::{HostCall, MemoryHost};
use crate::scheduler::ManualScheduler;

/// A [`Root`] wired to a [`MemoryHost`] and a [`ManualScheduler`].
///
/// The harness drives the scheduler for you: [`TestHarness::render`] and
/// [`TestHarness::flush`] crank queued work until the runtime goes
/// quiescent and surface the first render error they saw. Tests that need
/// finer control reach through [`TestHarness::scheduler`] and
/// [`TestHarness::root`] and crank by hand.
pub struct TestHarness {
    host: Rc<RefCell<MemoryHost>>,
    scheduler: Rc<ManualScheduler>,
    root: Root,
}

impl TestHarness {
    pub fn new() -> TestHarness {
        let host = Rc::new(RefCell::new(MemoryHost::new()));
        let scheduler = Rc::new(ManualScheduler::new());
        let root = Root::new(host.clone(), scheduler.clone(), MemoryHost::CONTAINER);
        TestHarness {
            host,
            scheduler,
            root,
        }
    }

    /// Renders `element` into the container at the scheduler's ambient
    /// lane and flushes to quiescence.
    pub fn render(&self, element: Element) -> Result<(), RenderError> {
        self.root.render(element);
        self.flush()
    }

    /// Unmounts the tree and flushes to quiescence.
    pub fn unmount(&self) -> Result<(), RenderError> {
        self.root.unmount();
        self.flush()
    }

    /// Cranks sync flushes, microtasks and render callbacks until a full
    /// pass runs nothing, then reports the first render error recorded
    /// during this flush, if any. Work queued after a failure stays
    /// queued for the next flush.
    pub fn flush(&self) -> Result<(), RenderError> {
        let seen = self.scheduler.outcomes().len();
        let mut passes = 0;
        loop {
            passes += 1;
            if passes > 100 {
                panic!("flush looped too many times; work keeps scheduling more work");
            }
            self.root.flush_sync()?;
            let microtasks = self.scheduler.run_microtasks();
            let ran_callback = self.scheduler.run_next_callback();
            log::trace!("flush pass {passes}: {microtasks} microtasks, callback={ran_callback}");
            if microtasks == 0 && !ran_callback {
                break;
            }
        }
        for outcome in &self.scheduler.outcomes()[seen..] {
            if let Err(error) = outcome {
                return Err(error.clone());
            }
        }
        Ok(())
    }

    /// Runs `f` with the scheduler reporting `lane`, so dispatches made
    /// inside pick it up as their priority.
    pub fn dispatch_at<R>(&self, lane: Lane, f: impl FnOnce() -> R) -> R {
        self.scheduler.with_lane(lane, f)
    }

    pub fn host(&self) -> Ref<'_, MemoryHost> {
        self.host.borrow()
    }

    pub fn host_mut(&self) -> RefMut<'_, MemoryHost> {
        self.host.borrow_mut()
    }

    pub fn scheduler(&self) -> &ManualScheduler {
        &self.scheduler
    }

    pub fn root(&self) -> &Root {
        &self.root
    }

    /// Every host call recorded so far, oldest first.
    pub fn calls(&self) -> Vec<HostCall> {
        self.host.borrow().calls().to_vec()
    }

    /// Drains the recorded host calls.
    pub fn take_calls(&self) -> Vec<HostCall> {
        self.host.borrow_mut().take_calls()
    }

    /// Concatenated text under the container, in document order.
    pub fn container_text(&self) -> String {
        self.host.borrow().text_content(MemoryHost::CONTAINER)
    }

    /// The container subtree as indented text.
    pub fn dump_tree(&self) -> String {
        self.host.borrow().dump_tree(MemoryHost::CONTAINER)
    }

    /// Asserts on the concatenated container text, printing the tree on
    /// mismatch.
    pub fn assert_container_text(&self, expected: &str) {
        let actual = self.container_text();
        assert!(
            actual == expected,
            "container text mismatch: expected {expected:?}, got {actual:?}\n{}",
            self.dump_tree()
        );
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience for tests that only need temporary access to a harness.
pub fn run_harness<R>(f: impl FnOnce(&TestHarness) -> R) -> R {
    let harness = TestHarness::new();
    f(&harness)
}

#[cfg(test)]
#[path = "tests/harness_tests.rs"]
mod tests;
