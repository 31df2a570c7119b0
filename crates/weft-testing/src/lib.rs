//! Testing utilities and harness for weft.
//!
//! Ships the doubles a headless test needs: [`MemoryHost`] models a
//! retained child-list tree and records every adapter call, and
//! [`ManualScheduler`] queues render work until the test cranks it.
//! [`TestHarness`] wires both to a [`weft_core::Root`] with
//! flush-to-quiescence helpers.

pub mod harness;
pub mod memory_host;
pub mod scheduler;

pub use harness::{run_harness, TestHarness};
pub use memory_host::{HostCall, MemoryHost, MemoryNode};
pub use scheduler::ManualScheduler;

pub mod prelude {
    pub use crate::harness::{run_harness, TestHarness};
    pub use crate::memory_host::{HostCall, MemoryHost, MemoryNode};
    pub use crate::scheduler::ManualScheduler;
}
