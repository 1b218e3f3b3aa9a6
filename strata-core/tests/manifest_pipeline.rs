//! Build-step tests: analyze a compiled driver file, inject the manifests,
//! and read them back the way the dispatcher does.

use strata_core::manifest::{DependencyExtractor, Injection, ManifestInjector, ManifestTable};
use strata_core::ManifestError;

const DRIVER: &str = r#"import { state, computed } from "@strata/signal";

export default function a(seed) {
  const s1 = state(seed);
  const c1 = computed(() => s1() + offset);
  return { s1, c1 };
}

export function b(query, { page, size }) {
  return search(query, page * size, a);
}
"#;

#[test]
fn analyze_inject_and_retrieve() {
    let table = DependencyExtractor::new()
        .extract_module("drivers/a.js", DRIVER)
        .unwrap();

    let a = table.get("a").unwrap();
    assert_eq!(a.params(), ["seed".to_string()]);
    assert_eq!(a.free_identifiers().iter().collect::<Vec<_>>(), vec!["offset"]);

    let b = table.get("b").unwrap();
    assert_eq!(b.params(), ["query", "page", "size"].map(String::from));
    assert_eq!(b.free_identifiers().iter().collect::<Vec<_>>(), vec!["search"]);

    let injector = ManifestInjector::new();
    let compiled = match injector.inject(DRIVER, &table).unwrap() {
        Injection::Rewritten(text) => text,
        other => panic!("expected a rewrite, got {other:?}"),
    };

    assert!(compiled.starts_with(DRIVER));
    assert_eq!(injector.inject(&compiled, &table).unwrap(), Injection::Unchanged);

    let retrieved = injector.retrieve(&compiled).unwrap().unwrap();
    assert_eq!(retrieved, table);
}

#[test]
fn reanalysis_replaces_injected_manifests() {
    let extractor = DependencyExtractor::new();
    let injector = ManifestInjector::new();

    let v1 = "export function f(x) { return x + alpha }\n";
    let t1 = extractor.extract_module("f.js", v1).unwrap();
    let out1 = injector.render(v1, &t1).unwrap();

    // The driver changes; the build step re-analyzes the stripped source.
    let v2 = injector.strip(&out1).replace("alpha", "beta");
    let t2 = extractor.extract_module("f.js", &v2).unwrap();
    let out2 = injector.render(&v2, &t2).unwrap();

    assert!(!out2.contains("alpha"));
    let retrieved = injector.retrieve(&out2).unwrap().unwrap();
    assert!(retrieved.get("f").unwrap().depends_on("beta"));
}

#[test]
fn duplicate_function_names_fail_the_unit() {
    let source = "function f() {}\nvar g = () => 1;\nvar g2 = function g() {};\nvar g = function () {};\n";
    let err = DependencyExtractor::new()
        .extract_module("dup.js", source)
        .unwrap_err();

    assert!(matches!(err, ManifestError::DuplicateName(name) if name == "g"));
}

#[test]
fn named_function_expression_is_keyed_by_its_binding() {
    let source = "export const handler = function inner(x) { return x + y }\n";
    let table = DependencyExtractor::new().extract_module("m.js", source).unwrap();

    assert_eq!(table.names().collect::<Vec<_>>(), vec!["handler"]);
    assert!(table.get("handler").unwrap().depends_on("y"));

    let out = ManifestInjector::new().render(source, &table).unwrap();
    assert!(out.contains("Object.assign(handler, {"));
    assert!(!out.contains("Object.assign(inner"));
}

#[test]
fn anonymous_default_export_lives_in_the_record() {
    let source = "export default (seed) => seed + offset;\n";
    let injector = ManifestInjector::new();
    let table = DependencyExtractor::new().extract_module("d.js", source).unwrap();
    let out = injector.render(source, &table).unwrap();

    assert!(!out.contains("Object.assign"));
    let retrieved = injector.retrieve(&out).unwrap().unwrap();
    assert!(retrieved.get("default").unwrap().depends_on("offset"));
}

#[test]
fn record_is_the_dispatcher_wire_format() {
    let table = DependencyExtractor::new()
        .extract_module("m.js", "export function add(a) { return a + b }")
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&table.to_json().unwrap()).unwrap();
    assert_eq!(json, serde_json::json!({ "add": { "deps": ["b"], "names": ["a"] } }));

    let back = ManifestTable::from_json(&table.to_json().unwrap()).unwrap();
    assert_eq!(back, table);
}
