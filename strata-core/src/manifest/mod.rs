//! Driver Dependency Manifests
//!
//! Build-time half of the crate. Driver functions may run on either side of
//! the client/server boundary; to decide where, and what to send along, the
//! dispatcher needs to know which external names each function reads.
//!
//! # Pipeline
//!
//! - `parser`: OXC frontend, source text to [`ScopeTree`]
//! - `scope`: grammar-agnostic scope tree and free-identifier analysis
//! - `extractor`: [`DependencyExtractor`], one manifest per function
//! - `table`: [`ManifestTable`], the per-unit record handed to the dispatcher
//! - `inject`: [`ManifestInjector`], attaches the record to compiled output

mod scope;
mod parser;
mod extractor;
mod table;
mod inject;

pub use scope::{Binding, BindingKind, FunctionScope, Reference, ScopeId, ScopeTree, TextRange};
pub use extractor::{DependencyExtractor, ExtractorOptions, SourceDialect, DEFAULT_EXPORT};
pub use table::{DependencyManifest, ManifestEntry, ManifestRecord, ManifestTable};
pub use inject::{
    Injection, InjectorConfig, ManifestInjector, DEFAULT_END_MARKER, DEFAULT_GENERATED_TAG,
    DEFAULT_START_MARKER,
};
