//! A scheduler the test cranks by hand.
//!
//! Nothing runs on its own: microtasks and render callbacks queue until
//! the test steps them, the ambient lane is whatever the test last set,
//! and yield checks answer from a script. This makes interruptible
//! renders deterministic enough to assert on outcome by outcome.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use weft_core::{Lane, RenderError, RenderOutcome, RenderTask, TaskScheduler};

pub struct ManualScheduler {
    lane: Cell<Lane>,
    microtasks: RefCell<VecDeque<Box<dyn FnOnce()>>>,
    callbacks: RefCell<VecDeque<(Lane, RenderTask)>>,
    yields: RefCell<VecDeque<bool>>,
    outcomes: RefCell<Vec<Result<RenderOutcome, RenderError>>>,
}

impl ManualScheduler {
    /// Creates a scheduler reporting [`Lane::SYNC`] as the ambient lane.
    pub fn new() -> ManualScheduler {
        ManualScheduler {
            lane: Cell::new(Lane::SYNC),
            microtasks: RefCell::new(VecDeque::new()),
            callbacks: RefCell::new(VecDeque::new()),
            yields: RefCell::new(VecDeque::new()),
            outcomes: RefCell::new(Vec::new()),
        }
    }

    /// Sets the ambient lane reported to the runtime.
    pub fn set_lane(&self, lane: Lane) {
        self.lane.set(lane);
    }

    /// Runs `f` with the ambient lane switched, restoring the previous
    /// lane afterwards, the way an embedder tags an input event before
    /// dispatching into the tree.
    pub fn with_lane<R>(&self, lane: Lane, f: impl FnOnce() -> R) -> R {
        let previous = self.lane.replace(lane);
        let result = f();
        self.lane.set(previous);
        result
    }

    /// Queues answers for upcoming yield checks. An exhausted script
    /// answers `false`.
    pub fn script_yields(&self, answers: &[bool]) {
        self.yields.borrow_mut().extend(answers.iter().copied());
    }

    /// Runs queued microtasks, including any queued while running, and
    /// returns how many ran.
    pub fn run_microtasks(&self) -> usize {
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

    /// Runs the oldest scheduled render callback and records its outcome.
    /// Returns `false` if none was scheduled.
    pub fn run_next_callback(&self) -> bool {
        let task = self.callbacks.borrow_mut().pop_front();
        let Some((_, task)) = task else {
            return false;
        };
        let outcome = task();
        self.outcomes.borrow_mut().push(outcome);
        true
    }

    pub fn pending_microtasks(&self) -> usize {
        self.microtasks.borrow().len()
    }

    pub fn pending_callbacks(&self) -> usize {
        self.callbacks.borrow().len()
    }

    /// Lanes of the callbacks currently scheduled, oldest first.
    pub fn scheduled_lanes(&self) -> Vec<Lane> {
        self.callbacks.borrow().iter().map(|(lane, _)| *lane).collect()
    }

    /// Cranks microtasks and callbacks until a full pass runs nothing,
    /// returning the number of tasks run. Panics after 100 passes so a
    /// feedback loop fails the test instead of hanging it.
    pub fn flush(&self) -> usize {
        let mut total = 0;
        let mut passes = 0;
        loop {
            passes += 1;
            if passes > 100 {
                panic!("flush looped too many times; a task keeps scheduling more work");
            }
            let ran = self.run_microtasks();
            let ran_callback = self.run_next_callback();
            total += ran + usize::from(ran_callback);
            if ran == 0 && !ran_callback {
                break;
            }
        }
        total
    }

    /// Outcomes of every callback run so far, oldest first.
    pub fn outcomes(&self) -> Vec<Result<RenderOutcome, RenderError>> {
        self.outcomes.borrow().clone()
    }

    /// Drains the recorded outcomes.
    pub fn take_outcomes(&self) -> Vec<Result<RenderOutcome, RenderError>> {
        std::mem::take(&mut *self.outcomes.borrow_mut())
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScheduler for ManualScheduler {
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
