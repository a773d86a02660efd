//! Update Scheduler
//!
//! Decides when queued update requests are turned into renders.
//!
//! # Algorithm
//!
//! All engine entry points run inside a *batch*. While a batch is open,
//! update requests are appended to the target instance's pending queue and
//! the instance is marked dirty; nothing renders immediately. When the
//! outermost batch finishes its own work, the scheduler drains the dirty
//! set and the engine runs one follow-up pass over it:
//!
//! 1. Dirty instances are ordered by mount order, so parents render before
//!    the children they may re-render anyway.
//! 2. Each instance's mount status is checked again at flush time. An
//!    instance that started unmounting after its request was queued is
//!    skipped.
//! 3. An instance whose queue was already consumed earlier in the pass (for
//!    example by a parent re-rendering it) is skipped.
//! 4. Updates requested during a pass mark instances dirty again and are
//!    picked up by the next pass, until the dirty set stays empty.
//!
//! Request validation (mount status, `setProps` only on roots) lives with
//! the renderer, which owns the instance records.

mod queue;

pub use queue::{StateUpdate, StateUpdater, UpdateRequest};
pub(crate) use queue::{fold_states, PendingUpdates};

use std::cell::RefCell;
use std::collections::BTreeSet;

use crate::tree::InstanceId;

/// Batch depth and the set of instances waiting for a follow-up pass.
#[derive(Debug, Default)]
pub(crate) struct UpdateScheduler {
    depth: usize,
    dirty: BTreeSet<InstanceId>,
    passes: usize,
}

impl UpdateScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a batch. Returns `true` for the outermost batch.
    fn begin(&mut self) -> bool {
        self.depth += 1;
        self.depth == 1
    }

    fn end(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.passes = 0;
        }
    }

    pub fn is_batching(&self) -> bool {
        self.depth > 0
    }

    pub fn mark_dirty(&mut self, id: InstanceId) {
        self.dirty.insert(id);
    }

    /// Drop `id` from the dirty set, e.g. once it has been unmounted.
    pub fn forget(&mut self, id: InstanceId) {
        self.dirty.remove(&id);
    }

    /// Take the dirty set in mount order and count the pass.
    pub fn drain(&mut self) -> Vec<InstanceId> {
        let dirty: Vec<_> = std::mem::take(&mut self.dirty).into_iter().collect();
        if !dirty.is_empty() {
            self.passes += 1;
        }
        dirty
    }

    /// Passes run by the current outermost batch.
    pub fn passes(&self) -> usize {
        self.passes
    }
}

/// Guard for one batch. Dropping it closes the batch.
pub(crate) struct BatchScope<'a> {
    scheduler: &'a RefCell<UpdateScheduler>,
    outermost: bool,
}

impl<'a> BatchScope<'a> {
    pub fn open(scheduler: &'a RefCell<UpdateScheduler>) -> Self {
        let outermost = scheduler.borrow_mut().begin();
        Self {
            scheduler,
            outermost,
        }
    }

    /// Whether this guard opened the outermost batch and so must flush.
    pub fn is_outermost(&self) -> bool {
        self.outermost
    }
}

impl Drop for BatchScope<'_> {
    fn drop(&mut self) {
        self.scheduler.borrow_mut().end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_batches_flush_once() {
        let scheduler = RefCell::new(UpdateScheduler::new());
        {
            let outer = BatchScope::open(&scheduler);
            assert!(outer.is_outermost());
            {
                let inner = BatchScope::open(&scheduler);
                assert!(!inner.is_outermost());
            }
            assert!(scheduler.borrow().is_batching());
        }
        assert!(!scheduler.borrow().is_batching());
    }

    #[test]
    fn drain_orders_by_mount_order() {
        let mut scheduler = UpdateScheduler::new();
        let parent = InstanceId::new();
        let child = InstanceId::new();

        scheduler.mark_dirty(child);
        scheduler.mark_dirty(parent);
        scheduler.mark_dirty(child);

        assert_eq!(scheduler.drain(), vec![parent, child]);
        assert_eq!(scheduler.passes(), 1);
        assert!(scheduler.drain().is_empty());
        assert_eq!(scheduler.passes(), 1);
    }

    #[test]
    fn forgotten_instances_are_not_drained() {
        let mut scheduler = UpdateScheduler::new();
        let id = InstanceId::new();
        scheduler.mark_dirty(id);
        scheduler.forget(id);
        assert!(scheduler.drain().is_empty());
        assert_eq!(scheduler.passes(), 0);
    }
}
