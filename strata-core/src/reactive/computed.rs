//! Computed Cell Implementation
//!
//! A `ComputedCell` is a cached derived value that recomputes lazily.
//!
//! # How Computed Cells Work
//!
//! 1. On first read, the cell runs its compute fn under the tracking context
//!    and caches the result. Every cell read during the run becomes a
//!    dependency.
//!
//! 2. Later reads return the cache while the cell is clean.
//!
//! 3. When a dependency changes, the cell is marked dirty, and so is
//!    everything downstream of it, in the same step. Nothing recomputes.
//!
//! 4. The next read of a dirty cell drops its old dependency set, runs again,
//!    and records the new set. Cells that were only read conditionally stop
//!    being tracked as soon as a run skips them.
//!
//! # Cycles
//!
//! A cell that is read again while its own compute fn is running fails with
//! [`CycleError`] instead of recursing. The failed cell keeps its previous
//! cache and stays dirty.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;

use super::context::TrackingContext;
use super::node::{link, Computation, ComputationHandle, Dependents, Source};
use super::NodeId;
use crate::error::CycleError;

type ComputeFn<T> = dyn Fn() -> Result<T, CycleError> + Send + Sync;

struct ComputedInner<T> {
    id: NodeId,
    compute: Box<ComputeFn<T>>,
    value: RwLock<Option<T>>,
    dirty: AtomicBool,
    in_progress: AtomicBool,
    /// Sources read on the latest run. Replaced wholesale on every run.
    dependencies: Mutex<IndexMap<NodeId, Arc<dyn Source>>>,
    dependents: Dependents,
    runs: AtomicU64,
}

/// Clears the in-progress flag on every exit path, panics included.
struct Running<'a>(&'a AtomicBool);

impl<'a> Running<'a> {
    fn start(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<T> ComputedInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn recompute(self: &Arc<Self>) -> Result<T, CycleError> {
        let _running = Running::start(&self.in_progress);

        let stale: SmallVec<[Arc<dyn Source>; 4]> = self
            .dependencies
            .lock()
            .drain(..)
            .map(|(_, source)| source)
            .collect();
        for source in stale {
            source.dependents().remove(self.id);
        }

        // Cleared before the run so that a write landing mid-run can set it
        // again and survive the run.
        self.dirty.store(false, Ordering::SeqCst);

        let result = {
            let handle: ComputationHandle = self.clone();
            let _ctx = TrackingContext::enter(handle);
            (self.compute)()
        };

        match result {
            Ok(value) => {
                *self.value.write() = Some(value.clone());
                let runs = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::trace!(
                    cell = self.id.raw(),
                    runs,
                    dependencies = self.dependencies.lock().len(),
                    "computed cell recomputed"
                );
                Ok(value)
            }
            Err(err) => {
                // Readers that caught the error cached a fallback. They must
                // rerun once this cell can succeed, and later writes stop here.
                self.dirty.store(true, Ordering::SeqCst);
                self.dependents.mark_all_dirty();
                Err(err)
            }
        }
    }
}

impl<T> Computation for ComputedInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn id(&self) -> NodeId {
        self.id
    }

    fn mark_dirty(&self) {
        // An already-dirty cell has already dirtied everything below it.
        if self.dirty.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::trace!(cell = self.id.raw(), "computed cell marked dirty");
        self.dependents.mark_all_dirty();
    }

    fn track(&self, source: Arc<dyn Source>) {
        self.dependencies.lock().entry(source.id()).or_insert(source);
    }
}

impl<T> Source for ComputedInner<T>
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

/// A cached derived value that recomputes lazily when its inputs change.
///
/// # Example
///
/// ```rust
/// use strata_core::reactive::{ComputedCell, StateCell};
///
/// let count = StateCell::new(2);
/// let doubled = {
///     let count = count.clone();
///     ComputedCell::new(move || count.read() * 2)
/// };
///
/// assert_eq!(doubled.read().unwrap(), 4);
///
/// count.write(5);
/// assert!(doubled.is_dirty());
/// assert_eq!(doubled.read().unwrap(), 10);
/// ```
pub struct ComputedCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<ComputedInner<T>>,
}

impl<T> ComputedCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cell from an infallible compute fn.
    ///
    /// The computation is not run immediately. It runs on first read.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::try_new(move || Ok(compute()))
    }

    /// Create a cell whose compute fn reads other computed cells with `?`.
    pub fn try_new<F>(compute: F) -> Self
    where
        F: Fn() -> Result<T, CycleError> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(ComputedInner {
                id: NodeId::new(),
                compute: Box::new(compute),
                value: RwLock::new(None),
                dirty: AtomicBool::new(true),
                in_progress: AtomicBool::new(false),
                dependencies: Mutex::new(IndexMap::new()),
                dependents: Dependents::default(),
                runs: AtomicU64::new(0),
            }),
        }
    }

    /// Get the cell's unique ID.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Get the current value, recomputing if necessary.
    ///
    /// If an outer computation is active, it is registered as a dependent.
    pub fn read(&self) -> Result<T, CycleError> {
        self.read_with(true)
    }

    /// Like [`read`](Self::read), without registering the outer computation.
    pub fn read_untracked(&self) -> Result<T, CycleError> {
        self.read_with(false)
    }

    fn read_with(&self, track: bool) -> Result<T, CycleError> {
        let inner = &self.inner;

        if inner.in_progress.load(Ordering::SeqCst) {
            tracing::warn!(cell = inner.id.raw(), "cycle detected in computed cell");
            return Err(CycleError { node: inner.id });
        }

        if track {
            if let Some(outer) = TrackingContext::current() {
                if outer.id() != inner.id {
                    link(inner.clone(), &outer);
                }
            }
        }

        if !inner.dirty.load(Ordering::SeqCst) {
            if let Some(value) = inner.value.read().clone() {
                return Ok(value);
            }
        }

        inner.recompute()
    }

    /// The cached value, stale or not, without running anything.
    pub fn peek(&self) -> Option<T> {
        self.inner.value.read().clone()
    }

    /// Mark the cell and everything downstream of it dirty.
    pub fn mark_dirty(&self) {
        self.inner.mark_dirty();
    }

    /// Whether the next read will recompute.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::SeqCst)
    }

    /// Check if the cell has a cached value.
    pub fn has_value(&self) -> bool {
        self.inner.value.read().is_some()
    }

    /// Number of completed runs of the compute fn.
    pub fn run_count(&self) -> u64 {
        self.inner.runs.load(Ordering::SeqCst)
    }

    /// Number of sources read on the latest run.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.lock().len()
    }

    /// Whether the latest run read the cell `id`.
    pub fn has_dependency(&self, id: NodeId) -> bool {
        self.inner.dependencies.lock().contains_key(&id)
    }

    /// Get the number of dependents.
    pub fn dependent_count(&self) -> usize {
        self.inner.dependents.len()
    }

    /// Type-erased handle for [`TrackingContext`].
    pub fn handle(&self) -> ComputationHandle {
        self.inner.clone()
    }
}

impl<T> Clone for ComputedCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for ComputedCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputedCell")
            .field("id", &self.inner.id)
            .field("dirty", &self.is_dirty())
            .field("has_value", &self.has_value())
            .field("dependency_count", &self.dependency_count())
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
