//! Manifest Injector
//!
//! Attaches a unit's manifests to its compiled output so the dispatcher can
//! read them off the function values at runtime. Each function receives
//! three fields: `__deps__` (free identifiers), `__names__` (parameters) and
//! `__name__` (declared name).
//!
//! The injected code sits between a start and an end marker line. Injection
//! always strips every existing block before appending a new one, so
//! re-injecting the same manifests is byte-for-byte stable and changed
//! manifests never leave stale lines behind.

use serde::{Deserialize, Serialize};

use super::table::ManifestTable;
use crate::error::ManifestError;

pub const DEFAULT_START_MARKER: &str = "// @strata-manifest:start";
pub const DEFAULT_END_MARKER: &str = "// @strata-manifest:end";
pub const DEFAULT_GENERATED_TAG: &str = "@strata-generated";

const RECORD_BINDING: &str = "__strata_manifest__";

/// Words that cannot name a function value in an `Object.assign` call.
const RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "export", "extends", "finally", "for", "function", "if", "import", "in", "instanceof",
    "new", "return", "super", "switch", "this", "throw", "try", "typeof", "var", "void", "while",
    "with", "yield",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectorConfig {
    pub start_marker: String,
    pub end_marker: String,
    /// Sources containing this tag are generated elsewhere and left alone.
    pub generated_tag: Option<String>,
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            start_marker: DEFAULT_START_MARKER.to_string(),
            end_marker: DEFAULT_END_MARKER.to_string(),
            generated_tag: Some(DEFAULT_GENERATED_TAG.to_string()),
        }
    }
}

/// Outcome of [`ManifestInjector::inject`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Injection {
    /// The source changed; here is the new text.
    Rewritten(String),
    /// The source already carries exactly this block.
    Unchanged,
    /// The source is tagged as generated and was not touched.
    Skipped,
}

/// Appends a manifest block to compiled driver source and reads it back.
///
/// Every function in the table lands in the JSON record line. Only names
/// that are bindings in module scope also get `__deps__`, `__names__` and
/// `__name__` attached with `Object.assign`. An anonymous default export is
/// stored under `default`, which binds nothing, so consumers read it from
/// the record through [`retrieve`](Self::retrieve).
#[derive(Debug, Clone, Default)]
pub struct ManifestInjector {
    config: InjectorConfig,
}

impl ManifestInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: InjectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InjectorConfig {
        &self.config
    }

    /// Inject `table` into `source`, reporting whether anything changed.
    pub fn inject(&self, source: &str, table: &ManifestTable) -> Result<Injection, ManifestError> {
        if let Some(tag) = &self.config.generated_tag {
            if source.contains(tag.as_str()) {
                tracing::debug!("source is tagged as generated, skipping injection");
                return Ok(Injection::Skipped);
            }
        }

        let rendered = self.render(source, table)?;
        if rendered == source {
            return Ok(Injection::Unchanged);
        }

        tracing::debug!(functions = table.len(), "manifest block injected");
        Ok(Injection::Rewritten(rendered))
    }

    /// `source` with any existing block replaced by one carrying `table`.
    pub fn render(&self, source: &str, table: &ManifestTable) -> Result<String, ManifestError> {
        let body = self.strip(source);
        let body = body.trim_end();
        let block = self.block(table)?;

        if body.is_empty() {
            Ok(format!("{block}\n"))
        } else {
            Ok(format!("{body}\n{block}\n"))
        }
    }

    /// Remove every complete marker-bracketed block.
    ///
    /// A start marker without a matching end marker is left in place.
    pub fn strip(&self, source: &str) -> String {
        let mut kept: Vec<&str> = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        let mut inside = false;

        for line in source.lines() {
            let marker = line.trim();
            if marker == self.config.start_marker {
                // A second start marker means the earlier one never closed.
                kept.append(&mut pending);
                inside = true;
                pending.push(line);
            } else if inside && marker == self.config.end_marker {
                inside = false;
                pending.clear();
            } else if inside {
                pending.push(line);
            } else {
                kept.push(line);
            }
        }
        kept.extend(pending);

        let mut stripped = kept.join("\n");
        if source.ends_with('\n') && !stripped.is_empty() {
            stripped.push('\n');
        }
        stripped
    }

    /// Whether `source` carries a complete injected block.
    pub fn has_block(&self, source: &str) -> bool {
        self.block_lines(source).is_some()
    }

    /// Read the manifests back out of an injected source.
    pub fn retrieve(&self, source: &str) -> Result<Option<ManifestTable>, ManifestError> {
        let Some(lines) = self.block_lines(source) else {
            return Ok(None);
        };

        let prefix = format!("const {RECORD_BINDING} = ");
        for line in lines {
            if let Some(json) = line
                .trim()
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_suffix(';'))
            {
                return ManifestTable::from_json(json).map(Some);
            }
        }
        Ok(None)
    }

    /// Lines of the last complete block.
    fn block_lines<'s>(&self, source: &'s str) -> Option<Vec<&'s str>> {
        let mut found = None;
        let mut open: Option<Vec<&'s str>> = None;

        for line in source.lines() {
            let marker = line.trim();
            if marker == self.config.start_marker {
                open = Some(Vec::new());
            } else if marker == self.config.end_marker {
                if let Some(block) = open.take() {
                    found = Some(block);
                }
            } else if let Some(block) = open.as_mut() {
                block.push(line);
            }
        }
        found
    }

    fn block(&self, table: &ManifestTable) -> Result<String, ManifestError> {
        let mut lines = vec![
            self.config.start_marker.clone(),
            format!("const {RECORD_BINDING} = {};", table.to_json()?),
        ];

        for name in table.names().filter(|name| is_identifier(name)) {
            let key = serde_json::to_string(name)?;
            lines.push(format!(
                "Object.assign({name}, {{ __deps__: {RECORD_BINDING}[{key}].deps, __names__: {RECORD_BINDING}[{key}].names, __name__: {key} }});"
            ));
        }

        lines.push(self.config.end_marker.clone());
        Ok(lines.join("\n"))
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let head_ok = chars
        .next()
        .map_or(false, |c| c.is_alphabetic() || c == '_' || c == '$');
    head_ok
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        && !RESERVED.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::DependencyManifest;

    fn table(deps: &[&str]) -> ManifestTable {
        ManifestTable::from_manifests([DependencyManifest::new(
            "a",
            vec!["x".to_string()],
            deps.iter().map(|d| d.to_string()).collect(),
        )])
        .unwrap()
    }

    const SOURCE: &str = "export default function a(x) {\n  return x + s1\n}\n";

    #[test]
    fn block_attaches_three_fields() {
        let out = ManifestInjector::new().render(SOURCE, &table(&["s1"])).unwrap();

        assert!(out.starts_with(SOURCE));
        assert!(out.contains(DEFAULT_START_MARKER));
        assert!(out.contains(DEFAULT_END_MARKER));
        assert!(out.contains(r#"const __strata_manifest__ = {"a":{"deps":["s1"],"names":["x"]}};"#));
        assert!(out.contains(r#"__deps__: __strata_manifest__["a"].deps"#));
        assert!(out.contains(r#"__names__: __strata_manifest__["a"].names"#));
        assert!(out.contains(r#"__name__: "a""#));
        assert!(out.ends_with(&format!("{DEFAULT_END_MARKER}\n")));
    }

    #[test]
    fn identical_injection_is_byte_identical() {
        let injector = ManifestInjector::new();
        let once = injector.render(SOURCE, &table(&["s1"])).unwrap();
        let twice = injector.render(&once, &table(&["s1"])).unwrap();

        assert_eq!(once, twice);
        assert_eq!(injector.inject(&once, &table(&["s1"])).unwrap(), Injection::Unchanged);
    }

    #[test]
    fn changed_manifest_leaves_no_stale_block() {
        let injector = ManifestInjector::new();
        let first = injector.render(SOURCE, &table(&["old_dep"])).unwrap();
        let second = injector.render(&first, &table(&["new_dep"])).unwrap();

        assert!(!second.contains("old_dep"));
        assert!(second.contains("new_dep"));
        assert_eq!(second.matches(DEFAULT_START_MARKER).count(), 1);
        assert_eq!(second.matches(DEFAULT_END_MARKER).count(), 1);
    }

    #[test]
    fn strip_restores_original() {
        let injector = ManifestInjector::new();
        let injected = injector.render(SOURCE, &table(&["s1"])).unwrap();

        assert_eq!(injector.strip(&injected), SOURCE);
    }

    #[test]
    fn unterminated_block_is_kept() {
        let source = format!("code();\n{DEFAULT_START_MARKER}\nleftover();\n");
        assert_eq!(ManifestInjector::new().strip(&source), source);
    }

    #[test]
    fn unterminated_block_survives_reinjection() {
        let injector = ManifestInjector::new();
        let source = format!("code();\n{DEFAULT_START_MARKER}\nleftover();\n");

        let once = injector.render(&source, &table(&["s1"])).unwrap();
        assert!(once.starts_with(&source));
        assert_eq!(injector.strip(&once), source);
        assert_eq!(injector.render(&once, &table(&["s1"])).unwrap(), once);
        assert!(injector.retrieve(&once).unwrap().unwrap().get("a").is_some());
    }

    #[test]
    fn retrieve_reads_manifests_back() {
        let injector = ManifestInjector::new();
        let injected = injector.render(SOURCE, &table(&["s1"])).unwrap();

        let table = injector.retrieve(&injected).unwrap().unwrap();
        let a = table.get("a").unwrap();
        assert_eq!(a.params(), ["x".to_string()]);
        assert!(a.depends_on("s1"));

        assert!(injector.retrieve(SOURCE).unwrap().is_none());
        assert!(!injector.has_block(SOURCE));
    }

    #[test]
    fn generated_sources_are_skipped() {
        let source = format!("// {DEFAULT_GENERATED_TAG}\nfunction a(x) {{}}\n");
        let outcome = ManifestInjector::new().inject(&source, &table(&[])).unwrap();

        assert_eq!(outcome, Injection::Skipped);
    }

    #[test]
    fn non_identifier_names_stay_in_record_only() {
        let table = ManifestTable::from_manifests([DependencyManifest::new(
            "default",
            Vec::new(),
            Default::default(),
        )])
        .unwrap();
        let out = ManifestInjector::new().render("", &table).unwrap();

        assert!(out.contains(r#"{"default":{"deps":[],"names":[]}}"#));
        assert!(!out.contains("Object.assign"));
    }

    #[test]
    fn custom_markers() {
        let injector = ManifestInjector::with_config(InjectorConfig {
            start_marker: "/* deps:begin */".to_string(),
            end_marker: "/* deps:end */".to_string(),
            generated_tag: None,
        });
        let out = injector.render(SOURCE, &table(&["s1"])).unwrap();

        assert!(out.contains("/* deps:begin */"));
        assert!(injector.has_block(&out));
        assert_eq!(injector.render(&out, &table(&["s1"])).unwrap(), out);
    }
}
