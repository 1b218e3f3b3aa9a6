//! Graph plumbing shared by state and computed cells.
//!
//! Edges are stored on both ends. A source keeps weak references to the
//! computations that read it, and a computation keeps strong references to
//! the sources it read on its latest run. Strong edges only ever point
//! "upstream", so the graph never forms an `Arc` cycle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

/// Unique identifier for a reactive cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// A computation that reads cells and can be invalidated by them.
///
/// Implemented by [`ComputedCell`](super::ComputedCell). Host adapters get a
/// handle through `ComputedCell::handle` and install it with
/// [`TrackingContext::set_current`](super::TrackingContext::set_current).
pub trait Computation: Send + Sync {
    /// The computation's node ID.
    fn id(&self) -> NodeId;

    /// Invalidate the cached result and everything downstream of it.
    fn mark_dirty(&self);

    /// Record that `source` was read during the current run.
    fn track(&self, source: Arc<dyn Source>);
}

/// Anything a computation can depend on.
pub trait Source: Send + Sync {
    /// The source's node ID.
    fn id(&self) -> NodeId;

    /// The computations currently reading this source.
    fn dependents(&self) -> &Dependents;
}

/// Shared, type-erased handle to a computation.
pub type ComputationHandle = Arc<dyn Computation>;

/// Register the edge `source -> computation`.
///
/// Both ends are keyed by node ID, so repeating the call within one run is a
/// no-op.
pub(crate) fn link(source: Arc<dyn Source>, computation: &ComputationHandle) {
    if source.dependents().insert(computation) {
        tracing::trace!(
            source = source.id().raw(),
            computation = computation.id().raw(),
            "dependency edge registered"
        );
    }
    computation.track(source);
}

/// The reverse edges of a source.
#[derive(Default)]
pub struct Dependents {
    inner: Mutex<IndexMap<NodeId, Weak<dyn Computation>>>,
}

impl Dependents {
    /// Add a dependent. Returns `false` if it was already present.
    pub(crate) fn insert(&self, computation: &ComputationHandle) -> bool {
        let mut inner = self.inner.lock();
        let id = computation.id();
        if inner.contains_key(&id) {
            return false;
        }
        inner.insert(id, Arc::downgrade(computation));
        true
    }

    /// Drop the edge to `id`, if any.
    pub(crate) fn remove(&self, id: NodeId) {
        self.inner.lock().shift_remove(&id);
    }

    /// Mark every live dependent dirty, pruning the ones that were dropped.
    ///
    /// The lock is released before any dependent runs its own marking, since
    /// that may walk back into this graph.
    pub(crate) fn mark_all_dirty(&self) {
        let live: Vec<ComputationHandle> = {
            let mut inner = self.inner.lock();
            inner.retain(|_, weak| weak.strong_count() > 0);
            inner.values().filter_map(Weak::upgrade).collect()
        };
        for dependent in live {
            dependent.mark_dirty();
        }
    }

    /// Number of live dependents.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `id` currently depends on this source.
    pub fn contains(&self, id: NodeId) -> bool {
        self.inner
            .lock()
            .get(&id)
            .map_or(false, |weak| weak.strong_count() > 0)
    }
}
