//! Scheduling abstraction.
//!
//! The runtime never spins an event loop of its own. It hands render
//! tasks to a [`TaskScheduler`] supplied by the embedder and asks it for
//! the ambient priority of whatever is executing right now.

use crate::error::RenderError;
use crate::lanes::Lane;

/// How a scheduled render task ended.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RenderOutcome {
    /// A render completed and its result was committed to the host.
    Committed,
    /// The task yielded to the host; a follow-up task was scheduled.
    Yielded,
    /// There was nothing to do. Stale callbacks report this.
    Idle,
}

/// A unit of render work handed to the scheduler.
pub type RenderTask = Box<dyn FnOnce() -> Result<RenderOutcome, RenderError>>;

/// Scheduling services the embedder provides to the runtime.
pub trait TaskScheduler {
    /// The priority lane of the code currently running. Dispatches made
    /// from event handlers, timers and idle callbacks pick up their lane
    /// from here.
    fn current_lane(&self) -> Lane;

    /// Run `task` later at roughly `lane` priority. The runtime schedules
    /// at most one outstanding callback per root.
    fn schedule_callback(&self, lane: Lane, task: RenderTask);

    /// Run `task` after the current unit of host work, before yielding to
    /// the event loop. Used for sync-lane flushes and effect processing.
    fn schedule_microtask(&self, task: Box<dyn FnOnce()>);

    /// Whether an interruptible render should yield back to the host.
    /// Sync-lane renders never consult this.
    fn should_yield(&self) -> bool {
        false
    }
}
