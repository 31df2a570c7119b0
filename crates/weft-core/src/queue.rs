//! Pending-update queues.
//!
//! Each stateful hook (and the host root) owns a [`SharedQueue`]: a FIFO of
//! updates shared between a node and its alternate, so work started in either
//! buffer drains the same ledger. Consumption is all-or-nothing per render:
//! [`SharedQueue::reduce`] folds the updates selected by the render lane over
//! a base value and hands back a [`QueueWriteBack`] describing the queue's
//! post-render contents. The write-back is only applied once the whole render
//! finishes; an abandoned render leaves every queue untouched.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::lanes::{Lane, Lanes};

/// How a single update transforms the current value.
pub(crate) enum UpdateAction<T> {
    Replace(T),
    Compute(Rc<dyn Fn(&T) -> T>),
}

impl<T: Clone> Clone for UpdateAction<T> {
    fn clone(&self) -> Self {
        match self {
            UpdateAction::Replace(value) => UpdateAction::Replace(value.clone()),
            UpdateAction::Compute(f) => UpdateAction::Compute(Rc::clone(f)),
        }
    }
}

pub(crate) struct Update<T> {
    pub(crate) lane: Lane,
    pub(crate) action: UpdateAction<T>,
}

impl<T: Clone> Clone for Update<T> {
    fn clone(&self) -> Self {
        Update {
            lane: self.lane,
            action: self.action.clone(),
        }
    }
}

pub(crate) struct SharedQueue<T> {
    inner: Rc<RefCell<VecDeque<Update<T>>>>,
}

impl<T> Clone for SharedQueue<T> {
    fn clone(&self) -> Self {
        SharedQueue {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone> SharedQueue<T> {
    pub(crate) fn new() -> Self {
        SharedQueue {
            inner: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    pub(crate) fn enqueue(&self, update: Update<T>) {
        self.inner.borrow_mut().push_back(update);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    /// Folds the updates whose lane intersects `lane` over `base`, in FIFO
    /// order. Skipped updates are retained in order. Nothing is removed from
    /// the queue here; the returned write-back captures the snapshot length
    /// so that updates enqueued after this call survive even once it is
    /// applied.
    ///
    /// Update actions are user closures and may themselves dispatch; the
    /// queue borrow is released before any of them run.
    pub(crate) fn reduce(&self, base: T, lane: Lane) -> (T, QueueWriteBack<T>) {
        let snapshot: Vec<Update<T>> = self.inner.borrow().iter().cloned().collect();
        let snapshot_len = snapshot.len();
        let mut value = base;
        let mut retained = Vec::new();
        for update in snapshot {
            if update.lane.intersects(Lanes::from(lane)) {
                value = match update.action {
                    UpdateAction::Replace(next) => next,
                    UpdateAction::Compute(f) => f(&value),
                };
            } else {
                retained.push(update);
            }
        }
        (
            value,
            QueueWriteBack {
                queue: self.clone(),
                retained,
                snapshot_len,
            },
        )
    }
}

/// Deferred result of a [`SharedQueue::reduce`]: the updates that were not
/// consumed, plus how many entries the reduce saw. Applying it replaces the
/// consumed prefix with the retained updates and keeps any later appends.
pub(crate) struct QueueWriteBack<T> {
    queue: SharedQueue<T>,
    retained: Vec<Update<T>>,
    snapshot_len: usize,
}

impl<T: Clone + 'static> QueueWriteBack<T> {
    pub(crate) fn apply(self) {
        let mut pending = self.queue.inner.borrow_mut();
        let split_at = self.snapshot_len.min(pending.len());
        let tail = pending.split_off(split_at);
        let mut next: VecDeque<Update<T>> = self.retained.into();
        next.extend(tail);
        *pending = next;
    }

    pub(crate) fn into_task(self) -> Box<dyn FnOnce()> {
        Box::new(move || self.apply())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replace(lane: Lane, value: i32) -> Update<i32> {
        Update {
            lane,
            action: UpdateAction::Replace(value),
        }
    }

    fn add(lane: Lane, delta: i32) -> Update<i32> {
        Update {
            lane,
            action: UpdateAction::Compute(Rc::new(move |n| n + delta)),
        }
    }

    #[test]
    fn reduce_folds_matching_lanes_in_order() {
        let queue = SharedQueue::new();
        queue.enqueue(replace(Lane::SYNC, 5));
        queue.enqueue(add(Lane::SYNC, 2));
        let (value, write_back) = queue.reduce(0, Lane::SYNC);
        assert_eq!(value, 7);
        write_back.apply();
        assert!(queue.is_empty());
    }

    #[test]
    fn reduce_retains_other_lanes() {
        let queue = SharedQueue::new();
        queue.enqueue(add(Lane::INPUT, 1));
        queue.enqueue(add(Lane::DEFAULT, 10));
        queue.enqueue(add(Lane::INPUT, 2));
        let (value, write_back) = queue.reduce(0, Lane::INPUT);
        assert_eq!(value, 3);
        write_back.apply();
        assert_eq!(queue.len(), 1);
        let (value, write_back) = queue.reduce(value, Lane::DEFAULT);
        assert_eq!(value, 13);
        write_back.apply();
        assert!(queue.is_empty());
    }

    #[test]
    fn write_back_preserves_appends_after_snapshot() {
        let queue = SharedQueue::new();
        queue.enqueue(replace(Lane::SYNC, 1));
        let (value, write_back) = queue.reduce(0, Lane::SYNC);
        assert_eq!(value, 1);
        // Arrives between the reduce and the write-back.
        queue.enqueue(replace(Lane::SYNC, 2));
        write_back.apply();
        assert_eq!(queue.len(), 1);
        let (value, write_back) = queue.reduce(value, Lane::SYNC);
        assert_eq!(value, 2);
        write_back.apply();
        assert!(queue.is_empty());
    }

    #[test]
    fn dropping_a_write_back_leaves_the_queue_intact() {
        let queue = SharedQueue::new();
        queue.enqueue(replace(Lane::SYNC, 1));
        queue.enqueue(add(Lane::DEFAULT, 5));
        let (value, write_back) = queue.reduce(0, Lane::SYNC);
        assert_eq!(value, 1);
        drop(write_back);
        assert_eq!(queue.len(), 2);
    }
}
