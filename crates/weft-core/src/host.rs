//! Host adapter abstraction.
//!
//! The runtime never touches a real UI surface. Every mutation the commit
//! phase decides on is expressed through [`HostAdapter`], so the same core
//! drives a DOM-like tree, a terminal grid or an in-memory test double.

use std::cell::RefCell;
use std::rc::Rc;

use crate::element::HostProps;

/// Opaque identifier for a node owned by the host.
pub type HostId = usize;

/// Receives tree mutations during the commit phase.
///
/// Calls arrive in commit order: placements first, then deletions, then
/// in-place updates, per flagged node. Implementations are expected to be
/// infallible; a host that can fail should absorb the failure and
/// reconcile its own state, since the committed work tree has already
/// advanced by the time these run.
pub trait HostAdapter {
    /// Create a host element for `tag`. The node starts detached.
    fn create_element(&mut self, tag: &str, props: &HostProps) -> HostId;

    /// Create a detached text node.
    fn create_text(&mut self, content: &str) -> HostId;

    /// Append `child` as the last child of `parent`.
    fn append_child(&mut self, parent: HostId, child: HostId);

    /// Insert `child` into `parent` immediately before `anchor`.
    fn insert_before(&mut self, parent: HostId, child: HostId, anchor: HostId);

    /// Detach `child` from `parent`.
    fn remove_child(&mut self, parent: HostId, child: HostId);

    /// Replace the props of an existing element.
    fn update_element(&mut self, node: HostId, props: &HostProps);

    /// Replace the content of an existing text node.
    fn update_text(&mut self, node: HostId, content: &str);
}

/// Shared, dynamically borrowed host adapter.
///
/// The runtime holds the adapter behind `RefCell` and only borrows it for
/// the duration of a single commit-phase call, so embedders may keep
/// their own handle to the same adapter between renders.
pub type SharedHost = Rc<RefCell<dyn HostAdapter>>;
