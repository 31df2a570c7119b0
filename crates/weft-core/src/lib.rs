//! An incremental tree-reconciliation runtime.
//!
//! Applications describe what a UI tree should look like as plain
//! [`Element`] values; the runtime diffs each description against what it
//! committed last time and drives the difference, and nothing else,
//! through a [`HostAdapter`]. State lives in positional hooks on function
//! components, updates carry a priority [`Lane`], and renders happen on a
//! double-buffered work tree so an interrupted or failed render never
//! leaves the host showing half of anything.
//!
//! The runtime owns no thread and no event loop. An embedder supplies a
//! [`TaskScheduler`] that lends it the thread via callbacks and
//! microtasks, and may ask the work loop to yield between units of work;
//! yielded renders resume where they stopped unless higher-priority work
//! arrived, in which case they restart from a fresh work-in-progress tree.

mod commit;
mod element;
mod error;
mod flags;
mod hash;
mod hooks;
mod host;
mod lanes;
mod node;
mod queue;
mod reconcile;
mod root;
mod scheduler;
mod work_loop;

pub use element::{component, host, text, Element, HostElement, HostProps, Key, PropValue};
pub use error::RenderError;
pub use hooks::{CleanupFn, DepList, Deps, IntoCleanup, Scope, StateSetter};
pub use host::{HostAdapter, HostId, SharedHost};
pub use lanes::{Lane, Lanes};
pub use root::{Root, RootHandle};
pub use scheduler::{RenderOutcome, RenderTask, TaskScheduler};

#[cfg(test)]
#[path = "tests/test_utils.rs"]
mod test_utils;

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod reconcile_tests;

#[cfg(test)]
#[path = "tests/hooks_tests.rs"]
mod hooks_tests;

#[cfg(test)]
#[path = "tests/work_loop_tests.rs"]
mod work_loop_tests;

#[cfg(test)]
#[path = "tests/commit_tests.rs"]
mod commit_tests;
