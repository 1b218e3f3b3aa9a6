//! Dependency Extractor
//!
//! Computes, ahead of execution, which external names a driver function
//! reads. The dispatcher uses the result to ship only that subset of state
//! across the client/server boundary.
//!
//! # Algorithm
//!
//! 1. Parse the source and resolve every name against its scope chain
//!    (see [`parser`](super::parser)).
//!
//! 2. Lower the result into a [`ScopeTree`](super::ScopeTree).
//!
//! 3. For each function, keep the references that escape it. Names bound at
//!    module level as imports or exports are code, not data, and are dropped.
//!
//! Extraction is pure: the same source and module bindings always give the
//! same manifest. A function either gets a complete manifest or a
//! [`ParseError`]; nothing is produced halfway.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::parser::scope_tree;
use super::table::{DependencyManifest, ManifestTable};
use crate::error::{ManifestError, ParseError};

/// Manifest name given to an anonymous `export default` function.
pub const DEFAULT_EXPORT: &str = "default";

/// Source language of the analyzed code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceDialect {
    #[default]
    JavaScript,
    TypeScript,
    Jsx,
    Tsx,
}

/// Extractor configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorOptions {
    pub dialect: SourceDialect,
    /// Names known to be bound at module level and never treated as data.
    pub module_bindings: IndexSet<String>,
}

/// Static analyzer producing [`DependencyManifest`]s.
#[derive(Debug, Clone, Default)]
pub struct DependencyExtractor {
    options: ExtractorOptions,
}

impl DependencyExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ExtractorOptions) -> Self {
        Self { options }
    }

    pub fn with_dialect(mut self, dialect: SourceDialect) -> Self {
        self.options.dialect = dialect;
        self
    }

    pub fn with_module_bindings<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options
            .module_bindings
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn options(&self) -> &ExtractorOptions {
        &self.options
    }

    /// Manifest of the first function defined in `source`.
    ///
    /// `name` labels errors and names the manifest if the function is
    /// anonymous.
    pub fn extract(&self, name: &str, source: &str) -> Result<DependencyManifest, ParseError> {
        let tree = scope_tree(source, self.options.dialect, name)?;

        let function = tree
            .functions
            .first()
            .ok_or_else(|| ParseError::new(name, "no function definition found"))?;

        let known = self.known_bindings(tree.module_bindings());
        let manifest = match function.name.as_deref() {
            None | Some(DEFAULT_EXPORT) => DependencyManifest::new(
                name,
                tree.params(function),
                tree.free_identifiers(function, &known),
            ),
            Some(_) => tree.manifest(function, name, &known),
        };

        tracing::debug!(
            function = manifest.name(),
            params = manifest.params().len(),
            free = manifest.free_identifiers().len(),
            "extracted dependency manifest"
        );

        Ok(manifest)
    }

    /// Manifests of every top-level function in a compilation unit.
    ///
    /// Anonymous default exports are named `default`; other anonymous
    /// functions have nothing to attach a manifest to and are skipped.
    pub fn extract_module(&self, unit: &str, source: &str) -> Result<ManifestTable, ManifestError> {
        let tree = scope_tree(source, self.options.dialect, unit)?;
        let known = self.known_bindings(tree.module_bindings());

        let table = ManifestTable::from_manifests(
            tree.functions
                .iter()
                .filter(|function| function.name.is_some())
                .map(|function| tree.manifest(function, DEFAULT_EXPORT, &known)),
        )?;

        tracing::debug!(unit, functions = table.len(), "extracted module manifests");

        Ok(table)
    }

    /// Extract several independent drivers given as `(name, source)` pairs.
    ///
    /// A failing driver is reported and skipped; its siblings still land in
    /// the table.
    pub fn extract_all<'s, I>(&self, drivers: I) -> (ManifestTable, Vec<ManifestError>)
    where
        I: IntoIterator<Item = (&'s str, &'s str)>,
    {
        let mut table = ManifestTable::new();
        let mut errors = Vec::new();

        for (name, source) in drivers {
            let result = self
                .extract(name, source)
                .map_err(ManifestError::from)
                .and_then(|manifest| table.try_insert(manifest));

            if let Err(err) = result {
                tracing::warn!(driver = name, error = %err, "skipping driver");
                errors.push(err);
            }
        }

        (table, errors)
    }

    fn known_bindings(&self, module: IndexSet<String>) -> IndexSet<String> {
        let mut known = self.options.module_bindings.clone();
        known.extend(module);
        known
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free(manifest: &DependencyManifest) -> Vec<&str> {
        manifest.free_identifiers().iter().map(String::as_str).collect()
    }

    #[test]
    fn simple_free_identifier() {
        let manifest = DependencyExtractor::new()
            .extract("f", "function f(a) { return a + b }")
            .unwrap();

        assert_eq!(manifest.name(), "f");
        assert_eq!(manifest.params(), ["a".to_string()]);
        assert_eq!(free(&manifest), vec!["b"]);
    }

    #[test]
    fn locals_and_nested_scopes_are_bound() {
        let manifest = DependencyExtractor::new()
            .extract(
                "f",
                r#"
                function f(items) {
                    const total = items.length;
                    let seen = 0;
                    for (const item of items) {
                        seen += item.weight * factor;
                    }
                    const scale = (n) => n * ratio;
                    try { risky() } catch (err) { report(err) }
                    return scale(total + seen);
                }
                "#,
            )
            .unwrap();

        assert_eq!(free(&manifest), vec!["factor", "ratio", "risky", "report"]);
    }

    #[test]
    fn destructured_params_expand_in_order() {
        let manifest = DependencyExtractor::new()
            .extract("f", "function f({ a, b: [c, d] }, e = g, ...rest) { return a + c + d + e + rest }")
            .unwrap();

        assert_eq!(manifest.params(), ["a", "c", "d", "e", "rest"].map(String::from));
        assert_eq!(free(&manifest), vec!["g"]);
    }

    #[test]
    fn hoisted_declarations_are_bound() {
        let manifest = DependencyExtractor::new()
            .extract("f", "function f() { helper(); function helper() { return v } var v = 1 }")
            .unwrap();

        assert!(manifest.free_identifiers().is_empty());
    }

    #[test]
    fn shadowing_inner_block_does_not_bind_outer_use() {
        let manifest = DependencyExtractor::new()
            .extract("f", "function f() { { let x = 1 } return x }")
            .unwrap();

        assert_eq!(free(&manifest), vec!["x"]);
    }

    #[test]
    fn module_bindings_are_not_data() {
        let source = r#"
            import { state } from "signal";
            export const LIMIT = 10;
            const secret = "s";
            export default function counter(step) {
                return state(count + step + LIMIT + secret);
            }
        "#;

        let manifest = DependencyExtractor::new()
            .with_module_bindings(["count"])
            .extract("counter", source)
            .unwrap();

        assert_eq!(manifest.name(), "counter");
        assert_eq!(free(&manifest), vec!["secret"]);
    }

    #[test]
    fn anonymous_arrow_takes_given_name() {
        let manifest = DependencyExtractor::new()
            .extract("load", "(id) => fetchUser(id, session)")
            .unwrap();

        assert_eq!(manifest.name(), "load");
        assert_eq!(free(&manifest), vec!["fetchUser", "session"]);
    }

    #[test]
    fn recursive_arrow_does_not_depend_on_itself() {
        let manifest = DependencyExtractor::new()
            .extract("fact", "const fact = (n) => n <= 1 ? base : n * fact(n - 1)")
            .unwrap();

        assert_eq!(manifest.name(), "fact");
        assert_eq!(free(&manifest), vec!["base"]);
    }

    #[test]
    fn typescript_types_are_not_dependencies() {
        let manifest = DependencyExtractor::new()
            .with_dialect(SourceDialect::TypeScript)
            .extract("f", "function f(a: Input): Output { return a.value + offset }")
            .unwrap();

        assert_eq!(free(&manifest), vec!["offset"]);
    }

    #[test]
    fn extraction_is_deterministic() {
        let extractor = DependencyExtractor::new();
        let source = "function f(a) { return z + a + y + z + x }";

        let first = extractor.extract("f", source).unwrap();
        let second = extractor.extract("f", source).unwrap();

        assert_eq!(first, second);
        assert_eq!(free(&first), vec!["z", "y", "x"]);
    }

    #[test]
    fn malformed_source_is_a_parse_error() {
        let err = DependencyExtractor::new()
            .extract("broken", "function broken(a { return a }")
            .unwrap_err();

        assert_eq!(err.function, "broken");
    }

    #[test]
    fn source_without_function_is_a_parse_error() {
        let err = DependencyExtractor::new().extract("x", "const x = 1;").unwrap_err();

        assert_eq!(err.function, "x");
        assert!(err.message.contains("no function"));
    }

    #[test]
    fn module_extraction_covers_every_function() {
        let source = r#"
            import { computed } from "signal";
            export function a(x) { return x + shared }
            export const b = (y) => computed(() => y * other);
        "#;

        let table = DependencyExtractor::new().extract_module("drivers.js", source).unwrap();

        assert_eq!(table.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(free(table.get("a").unwrap()), vec!["shared"]);
        assert_eq!(free(table.get("b").unwrap()), vec!["other"]);
    }

    #[test]
    fn anonymous_functions_in_modules() {
        let source = r#"
            export default (seed) => seed + offset;
            (() => ignored);
        "#;

        let table = DependencyExtractor::new().extract_module("index.js", source).unwrap();

        assert_eq!(table.names().collect::<Vec<_>>(), vec![DEFAULT_EXPORT]);
        assert_eq!(free(table.get(DEFAULT_EXPORT).unwrap()), vec!["offset"]);

        let single = DependencyExtractor::new()
            .extract("counter", "export default (step) => step * 2")
            .unwrap();
        assert_eq!(single.name(), "counter");
    }

    #[test]
    fn failing_driver_does_not_affect_siblings() {
        let (table, errors) = DependencyExtractor::new().extract_all([
            ("good", "function good(a) { return a + b }"),
            ("bad", "function bad( {"),
            ("also_good", "function also_good() { return c }"),
        ]);

        assert_eq!(table.len(), 2);
        assert!(table.get("good").is_some());
        assert!(table.get("also_good").is_some());
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], ManifestError::Parse(err) if err.function == "bad"));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: ExtractorOptions =
            serde_json::from_str(r#"{ "dialect": "typescript" }"#).unwrap();

        assert_eq!(options.dialect, SourceDialect::TypeScript);
        assert!(options.module_bindings.is_empty());
    }
}
