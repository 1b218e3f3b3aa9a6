//! Strata Core
//!
//! This crate provides the core of the Strata application framework.
//! It implements:
//!
//! - Reactive cells (state, computed) with lazy, coarse-grained tracking
//! - Observation views over nested immutable state
//! - Static dependency manifests for driver functions
//! - Injection of those manifests into compiled driver output
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `reactive`: runtime state model and dependency tracking
//! - `manifest`: build-time analysis of driver source
//!
//! # Example
//!
//! ```rust
//! use strata_core::reactive::{ComputedCell, StateCell};
//! use strata_core::manifest::DependencyExtractor;
//!
//! let count = StateCell::new(1);
//! let next = {
//!     let count = count.clone();
//!     ComputedCell::new(move || count.read() + 1)
//! };
//! assert_eq!(next.read().unwrap(), 2);
//!
//! let manifest = DependencyExtractor::new()
//!     .extract("f", "function f(a) { return a + b }")
//!     .unwrap();
//! assert!(manifest.depends_on("b"));
//! ```

pub mod error;
pub mod manifest;
pub mod reactive;

pub use error::{CycleError, ManifestError, ParseError};
