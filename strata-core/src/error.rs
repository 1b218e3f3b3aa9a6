//! Error types shared across the crate.
//!
//! Failures are local to the call that triggered them. A cycle in one
//! computed cell leaves the rest of the graph usable, and a malformed driver
//! only aborts its own manifest.

use thiserror::Error;

use crate::reactive::NodeId;

/// A computed cell was read again while it was still computing.
///
/// The cell keeps its previous cached value and stays dirty, so a later read
/// on a corrected graph can retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cycle detected: computed cell {node:?} read itself while computing")]
pub struct CycleError {
    /// The cell whose recomputation was re-entered.
    pub node: NodeId,
}

/// Driver source could not be analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to analyze `{function}`: {message}")]
pub struct ParseError {
    /// Name of the function (or compilation unit) being analyzed.
    pub function: String,
    /// Parser diagnostics, joined.
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while building or reading dependency manifests.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Two functions in one compilation unit share a declared name.
    #[error("duplicate function name `{0}` in compilation unit")]
    DuplicateName(String),

    #[error("invalid manifest record: {0}")]
    Json(#[from] serde_json::Error),
}
