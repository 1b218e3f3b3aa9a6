//! Dependency manifests and the per-unit manifest table.
//!
//! The table is the out-of-band record handed to the dispatcher. On the wire
//! it is a JSON object keyed by function name:
//!
//! ```json
//! { "add": { "deps": ["b"], "names": ["a"] } }
//! ```

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ManifestError;

/// The static dependency record of one function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyManifest {
    name: String,
    params: Vec<String>,
    free_identifiers: IndexSet<String>,
}

impl DependencyManifest {
    pub fn new(name: impl Into<String>, params: Vec<String>, free_identifiers: IndexSet<String>) -> Self {
        Self {
            name: name.into(),
            params,
            free_identifiers,
        }
    }

    /// Declared name within the compilation unit.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter names in declaration order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// External names the function reads, in first-occurrence order.
    pub fn free_identifiers(&self) -> &IndexSet<String> {
        &self.free_identifiers
    }

    /// Whether the function reads `name` from outside itself.
    pub fn depends_on(&self, name: &str) -> bool {
        self.free_identifiers.contains(name)
    }
}

/// Wire form of one manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub deps: Vec<String>,
    pub names: Vec<String>,
}

/// Wire form of a whole table.
pub type ManifestRecord = IndexMap<String, ManifestEntry>;

/// Manifests of one compilation unit, keyed by function name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestTable {
    entries: IndexMap<String, DependencyManifest>,
}

impl ManifestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table, rejecting duplicate names.
    pub fn from_manifests<I>(manifests: I) -> Result<Self, ManifestError>
    where
        I: IntoIterator<Item = DependencyManifest>,
    {
        let mut table = Self::new();
        for manifest in manifests {
            table.try_insert(manifest)?;
        }
        Ok(table)
    }

    /// Insert or replace the manifest under its name. Returns the replaced one.
    pub fn insert(&mut self, manifest: DependencyManifest) -> Option<DependencyManifest> {
        self.entries.insert(manifest.name.clone(), manifest)
    }

    /// Insert a manifest whose name must not be taken yet.
    pub fn try_insert(&mut self, manifest: DependencyManifest) -> Result<(), ManifestError> {
        if self.entries.contains_key(&manifest.name) {
            return Err(ManifestError::DuplicateName(manifest.name));
        }
        self.entries.insert(manifest.name.clone(), manifest);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&DependencyManifest> {
        self.entries.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<DependencyManifest> {
        self.entries.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DependencyManifest> {
        self.entries.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn to_record(&self) -> ManifestRecord {
        self.entries
            .iter()
            .map(|(name, manifest)| {
                (
                    name.clone(),
                    ManifestEntry {
                        deps: manifest.free_identifiers.iter().cloned().collect(),
                        names: manifest.params.clone(),
                    },
                )
            })
            .collect()
    }

    pub fn from_record(record: ManifestRecord) -> Self {
        let entries = record
            .into_iter()
            .map(|(name, entry)| {
                let manifest = DependencyManifest {
                    name: name.clone(),
                    params: entry.names,
                    free_identifiers: entry.deps.into_iter().collect(),
                };
                (name, manifest)
            })
            .collect();
        Self { entries }
    }

    /// Compact, single-line JSON record.
    pub fn to_json(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Serialize for ManifestTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_record().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ManifestTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        ManifestRecord::deserialize(deserializer).map(Self::from_record)
    }
}
