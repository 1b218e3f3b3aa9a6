//! Reactive Cells
//!
//! This module implements the reactive core: state cells, computed cells,
//! and the tracking context that connects them.
//!
//! # Concepts
//!
//! ## State cells
//!
//! A `StateCell` is a container for mutable state. When it is read while a
//! computation is running, the computation is registered as a dependent.
//! Writing the cell marks its dependents dirty.
//!
//! ## Computed cells
//!
//! A `ComputedCell` is a derived value that caches its result. It is lazy: a
//! write upstream only marks it dirty, and it recomputes on its next read.
//! Its dependency set is whatever it read on its latest run.
//!
//! ## Observation
//!
//! Nested immutable values (`FrozenValue`) are tracked as a whole. Reading
//! one under a computation yields an `Observed` view whose nested accesses
//! all attribute to the single root cell.
//!
//! # Implementation Notes
//!
//! The active computation lives in a thread-local slot. A graph is driven by
//! one strand at a time and has no internal synchronization beyond the
//! short-lived field locks that make cells `Send + Sync`.

mod node;
mod context;
mod state;
mod computed;
mod observe;

pub use node::{Computation, ComputationHandle, Dependents, NodeId, Source};
pub use context::{ContextGuard, TrackingContext};
pub use state::StateCell;
pub use computed::ComputedCell;
pub use observe::{FrozenValue, Observed};
