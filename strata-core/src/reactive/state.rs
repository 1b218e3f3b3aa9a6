//! State Cell Implementation
//!
//! A `StateCell` is the mutable root of the graph. It holds a value and
//! remembers which computations read it.
//!
//! # How State Cells Work
//!
//! 1. When a cell is read while a computation is active, the cell registers
//!    that computation as a dependent. Repeated reads in the same run add
//!    nothing.
//!
//! 2. When the cell is written, its version is bumped and every direct
//!    dependent is marked dirty.
//!
//! 3. Nothing recomputes during a write. Dependents pick up the new value the
//!    next time they are read.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::TrackingContext;
use super::node::{link, Dependents, Source};
use super::observe::{FrozenValue, Observed};
use super::NodeId;

struct StateInner<T> {
    id: NodeId,
    value: RwLock<T>,
    version: AtomicU64,
    dependents: Dependents,
}

impl<T> Source for StateInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn id(&self) -> NodeId {
        self.id
    }

    fn dependents(&self) -> &Dependents {
        &self.dependents
    }
}

/// A reactive cell holding a value of type T.
///
/// Cloning a `StateCell` yields another handle to the same cell.
///
/// # Example
///
/// ```rust
/// use strata_core::reactive::StateCell;
///
/// let count = StateCell::new(0);
/// assert_eq!(count.read(), 0);
///
/// count.write(5);
/// assert_eq!(count.read(), 5);
/// assert_eq!(count.version(), 1);
/// ```
pub struct StateCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<StateInner<T>>,
}

impl<T> StateCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new cell with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(StateInner {
                id: NodeId::new(),
                value: RwLock::new(value),
                version: AtomicU64::new(0),
                dependents: Dependents::default(),
            }),
        }
    }

    /// Get the cell's unique ID.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Get the current value.
    ///
    /// If a computation is active, it is registered as a dependent.
    pub fn read(&self) -> T {
        self.track();
        self.inner.value.read().clone()
    }

    /// Get the current value without registering a dependency.
    pub fn read_untracked(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Replace the value, bump the version and mark dependents dirty.
    pub fn write(&self, value: T) {
        *self.inner.value.write() = value;
        let version = self.inner.version.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::debug!(
            cell = self.inner.id.raw(),
            version,
            dependents = self.inner.dependents.len(),
            "state written"
        );

        self.inner.dependents.mark_all_dirty();
    }

    /// Write a value derived from the current one.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let guard = self.inner.value.read();
            f(&*guard)
        };
        self.write(next);
    }

    /// Number of writes so far.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::SeqCst)
    }

    /// Get the number of dependents.
    pub fn dependent_count(&self) -> usize {
        self.inner.dependents.len()
    }

    /// Whether the computation `id` currently depends on this cell.
    pub fn has_dependent(&self, id: NodeId) -> bool {
        self.inner.dependents.contains(id)
    }

    /// Register the active computation, if any, and report whether one was.
    fn track(&self) -> bool {
        match TrackingContext::current() {
            Some(computation) => {
                link(self.inner.clone(), &computation);
                true
            }
            None => false,
        }
    }
}

impl StateCell<FrozenValue> {
    /// Read the value through an observation view.
    ///
    /// Under an active computation, composite values come back wrapped: any
    /// number of nested accesses attribute to this one cell. Primitives and
    /// untracked reads come back plain.
    pub fn observe(&self) -> Observed {
        let tracked = self.track();
        let value = self.inner.value.read().clone();
        if tracked && value.is_composite() {
            Observed::wrapped(self.inner.clone(), value)
        } else {
            Observed::plain(value)
        }
    }
}

impl<T> Clone for StateCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for StateCell<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCell")
            .field("id", &self.inner.id)
            .field("value", &self.read_untracked())
            .field("version", &self.version())
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
