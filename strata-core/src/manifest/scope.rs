//! Grammar-agnostic scope tree.
//!
//! A language frontend lowers a compilation unit into a [`ScopeTree`]: its
//! top-level functions, every binding with the scope that introduced it, and
//! every value reference with the binding it resolved to. Manifest
//! computation only looks at this tree, never at a syntax tree, so another
//! grammar can be supported by writing another frontend.

use indexmap::IndexSet;

use super::table::DependencyManifest;

/// Index of a scope within one compilation unit.
pub type ScopeId = u32;

/// Byte range in the analyzed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextRange {
    pub start: u32,
    pub end: u32,
}

impl TextRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Whether `other` lies entirely inside this range.
    pub fn contains(&self, other: TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Introduced by an import declaration.
    Import,
    /// Any other declaration: parameter, variable, function, class, catch
    /// parameter, destructured name.
    Declared,
}

/// A name introduced into a scope. Destructuring patterns contribute one
/// binding per introduced name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub range: TextRange,
    pub scope: ScopeId,
    pub kind: BindingKind,
}

/// A value read or write of a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub range: TextRange,
    /// Index into [`ScopeTree::bindings`], or `None` if unresolved.
    pub binding: Option<usize>,
}

/// A top-level function definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionScope {
    /// Declared name, or the name of the variable it was assigned to.
    pub name: Option<String>,
    /// The whole definition.
    pub range: TextRange,
    /// The parameter list.
    pub params: TextRange,
    /// The scope the parameters are bound in.
    pub scope: ScopeId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeTree {
    /// Top-level functions in source order.
    pub functions: Vec<FunctionScope>,
    pub bindings: Vec<Binding>,
    /// References in source order.
    pub references: Vec<Reference>,
    /// Names exported from the unit.
    pub exported: IndexSet<String>,
}

impl ScopeTree {
    /// Names bound at module level that are code rather than data: imports
    /// and exports.
    pub fn module_bindings(&self) -> IndexSet<String> {
        self.bindings
            .iter()
            .filter(|binding| binding.kind == BindingKind::Import)
            .map(|binding| binding.name.clone())
            .chain(self.exported.iter().cloned())
            .collect()
    }

    /// Parameter names of `function`, destructuring expanded, in source order.
    pub fn params(&self, function: &FunctionScope) -> Vec<String> {
        let mut params: Vec<&Binding> = self
            .bindings
            .iter()
            .filter(|binding| {
                binding.scope == function.scope && function.params.contains(binding.range)
            })
            .collect();
        params.sort_by_key(|binding| binding.range.start);
        params.into_iter().map(|binding| binding.name.clone()).collect()
    }

    /// Names read inside `function` that it does not bind itself.
    ///
    /// A reference is free when it is unresolved, or resolves to a binding
    /// declared outside the function. Imports, names in `known`, and the
    /// function's own name are never free. Order is first occurrence.
    pub fn free_identifiers(
        &self,
        function: &FunctionScope,
        known: &IndexSet<String>,
    ) -> IndexSet<String> {
        let mut free = IndexSet::new();

        for reference in &self.references {
            if !function.range.contains(reference.range) {
                continue;
            }

            if let Some(binding) = reference.binding.and_then(|index| self.bindings.get(index)) {
                if function.range.contains(binding.range) || binding.kind == BindingKind::Import {
                    continue;
                }
            }

            if known.contains(&reference.name)
                || function.name.as_deref() == Some(reference.name.as_str())
            {
                continue;
            }

            free.insert(reference.name.clone());
        }

        free
    }

    /// Build the manifest of `function`. Anonymous functions take `fallback`.
    pub fn manifest(
        &self,
        function: &FunctionScope,
        fallback: &str,
        known: &IndexSet<String>,
    ) -> DependencyManifest {
        let name = function.name.clone().unwrap_or_else(|| fallback.to_string());
        DependencyManifest::new(
            name,
            self.params(function),
            self.free_identifiers(function, known),
        )
    }
}
