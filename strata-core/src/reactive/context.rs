//! Tracking Context
//!
//! The tracking context records which computation is currently running, so
//! that a cell read can be attributed to it.
//!
//! # Implementation
//!
//! There is exactly one active-computation slot per thread. A graph is driven
//! by a single strand at a time, so the slot is thread-local rather than a
//! process global, and nothing here takes a lock.
//!
//! `ComputedCell::read` installs itself with [`TrackingContext::enter`], which
//! hands back a guard that restores whatever was in the slot before. Host
//! adapters and tests that need to pretend they are inside a computation use
//! [`TrackingContext::set_current`] instead; that path overwrites the slot and
//! leaves restoring it to the caller.

use std::cell::RefCell;

use super::node::ComputationHandle;
use super::NodeId;

thread_local! {
    static CURRENT: RefCell<Option<ComputationHandle>> = const { RefCell::new(None) };
}

/// Access to the active-computation slot.
pub struct TrackingContext;

impl TrackingContext {
    /// Install `computation` as the active one until the guard is dropped.
    pub fn enter(computation: ComputationHandle) -> ContextGuard {
        let id = computation.id();
        let previous = CURRENT.with(|slot| slot.replace(Some(computation)));
        ContextGuard { id, previous }
    }

    /// The computation currently running, if any.
    pub fn current() -> Option<ComputationHandle> {
        CURRENT.with(|slot| slot.borrow().clone())
    }

    /// Check if there is an active computation.
    pub fn is_active() -> bool {
        CURRENT.with(|slot| slot.borrow().is_some())
    }

    /// Overwrite the slot. Returns the previous occupant.
    pub fn set_current(computation: Option<ComputationHandle>) -> Option<ComputationHandle> {
        CURRENT.with(|slot| slot.replace(computation))
    }

    /// Empty the slot.
    pub fn clear() {
        Self::set_current(None);
    }
}

/// Restores the previously active computation when dropped.
///
/// This keeps the slot consistent even if a compute fn panics.
#[must_use = "the computation is only active while the guard is alive"]
pub struct ContextGuard {
    id: NodeId,
    previous: Option<ComputationHandle>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let popped = CURRENT.with(|slot| slot.replace(previous));

        if let Some(popped) = popped {
            debug_assert_eq!(
                popped.id(),
                self.id,
                "TrackingContext mismatch: expected {:?}, got {:?}",
                self.id,
                popped.id()
            );
        }
    }
}
