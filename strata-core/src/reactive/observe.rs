//! Observation of nested immutable values.
//!
//! State often holds a nested, immutable structure (a parsed config, a
//! request payload). Tracking is deliberately coarse for such values: reading
//! any part of the structure depends on the whole cell.
//!
//! [`FrozenValue`] is the immutable tree. Composite payloads sit behind `Arc`
//! and there is no mutating API, so a clone is cheap and shares the original.
//!
//! [`Observed`] is a thin view over a `FrozenValue` that remembers the cell it
//! came from. Every access through a wrapped view re-attributes the read to
//! that root cell, which is idempotent per computation, so one computation
//! ends up with exactly one edge to the root however many fields it touches.
//! Transformations such as [`Observed::map`] build new plain values and never
//! carry the view into them.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::context::TrackingContext;
use super::node::{link, Source};
use super::NodeId;

/// An immutable JSON-like value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrozenValue {
    Null,
    Bool(bool),
    Number(f64),
    String(Arc<str>),
    Array(Arc<[FrozenValue]>),
    Object(Arc<IndexMap<String, FrozenValue>>),
}

impl FrozenValue {
    /// Build an object from key/value pairs, keeping their order.
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, FrozenValue)>,
    {
        FrozenValue::Object(Arc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// Build an array.
    pub fn array<I>(items: I) -> Self
    where
        I: IntoIterator<Item = FrozenValue>,
    {
        FrozenValue::Array(items.into_iter().collect())
    }

    /// Objects and arrays.
    pub fn is_composite(&self) -> bool {
        matches!(self, FrozenValue::Array(_) | FrozenValue::Object(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FrozenValue::Null)
    }

    /// Field lookup on an object.
    pub fn get(&self, key: &str) -> Option<&FrozenValue> {
        match self {
            FrozenValue::Object(fields) => fields.get(key),
            _ => None,
        }
    }

    /// Element lookup on an array.
    pub fn at(&self, index: usize) -> Option<&FrozenValue> {
        match self {
            FrozenValue::Array(items) => items.get(index),
            _ => None,
        }
    }

    /// Element count of an array, field count of an object, zero otherwise.
    pub fn len(&self) -> usize {
        match self {
            FrozenValue::Array(items) => items.len(),
            FrozenValue::Object(fields) => fields.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FrozenValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FrozenValue::String(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FrozenValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<f64> for FrozenValue {
    fn from(n: f64) -> Self {
        FrozenValue::Number(n)
    }
}

impl From<i64> for FrozenValue {
    fn from(n: i64) -> Self {
        FrozenValue::Number(n as f64)
    }
}

impl From<bool> for FrozenValue {
    fn from(b: bool) -> Self {
        FrozenValue::Bool(b)
    }
}

impl From<&str> for FrozenValue {
    fn from(s: &str) -> Self {
        FrozenValue::String(Arc::from(s))
    }
}

impl From<String> for FrozenValue {
    fn from(s: String) -> Self {
        FrozenValue::String(Arc::from(s))
    }
}

impl From<Vec<FrozenValue>> for FrozenValue {
    fn from(items: Vec<FrozenValue>) -> Self {
        FrozenValue::Array(Arc::from(items))
    }
}

impl From<serde_json::Value> for FrozenValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => FrozenValue::Null,
            Value::Bool(b) => FrozenValue::Bool(b),
            Value::Number(n) => FrozenValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => FrozenValue::from(s),
            Value::Array(items) => FrozenValue::array(items.into_iter().map(FrozenValue::from)),
            Value::Object(fields) => FrozenValue::object(
                fields.into_iter().map(|(k, v)| (k, FrozenValue::from(v))),
            ),
        }
    }
}

/// A read of a [`FrozenValue`] cell, possibly attributed to its root.
#[derive(Clone)]
pub struct Observed {
    root: Option<Arc<dyn Source>>,
    value: FrozenValue,
}

impl Observed {
    pub(crate) fn wrapped(root: Arc<dyn Source>, value: FrozenValue) -> Self {
        Self {
            root: Some(root),
            value,
        }
    }

    pub(crate) fn plain(value: FrozenValue) -> Self {
        Self { root: None, value }
    }

    /// Whether accesses through this view are attributed to a root cell.
    pub fn is_wrapped(&self) -> bool {
        self.root.is_some() && self.value.is_composite()
    }

    /// The cell this view was read from, if wrapped.
    pub fn root_id(&self) -> Option<NodeId> {
        self.root.as_ref().map(|root| root.id())
    }

    fn touch(&self) {
        if let (Some(root), Some(computation)) = (&self.root, TrackingContext::current()) {
            link(root.clone(), &computation);
        }
    }

    fn child(&self, value: FrozenValue) -> Observed {
        Observed {
            root: self.root.clone(),
            value,
        }
    }

    /// Field of an object.
    pub fn get(&self, key: &str) -> Option<Observed> {
        self.touch();
        self.value.get(key).cloned().map(|v| self.child(v))
    }

    /// Element of an array.
    pub fn at(&self, index: usize) -> Option<Observed> {
        self.touch();
        self.value.at(index).cloned().map(|v| self.child(v))
    }

    pub fn len(&self) -> usize {
        self.touch();
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Field names of an object, in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.touch();
        match &self.value {
            FrozenValue::Object(fields) => fields.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.touch();
        self.value.as_f64()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.touch();
        self.value.as_str()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.touch();
        self.value.as_bool()
    }

    /// Elements of an array as views. Empty for anything else.
    pub fn iter(&self) -> impl Iterator<Item = Observed> + '_ {
        self.touch();
        let items: &[FrozenValue] = match &self.value {
            FrozenValue::Array(items) => &**items,
            _ => &[],
        };
        items.iter().map(move |item| self.child(item.clone()))
    }

    /// Map an array into a new plain array. `None` if this is not an array.
    pub fn map<F>(&self, f: F) -> Option<FrozenValue>
    where
        F: FnMut(Observed) -> FrozenValue,
    {
        match &self.value {
            FrozenValue::Array(_) => Some(FrozenValue::array(self.iter().map(f))),
            _ => None,
        }
    }

    /// Keep the elements matching `predicate`, as a new plain array.
    pub fn filter<P>(&self, mut predicate: P) -> Option<FrozenValue>
    where
        P: FnMut(&Observed) -> bool,
    {
        match &self.value {
            FrozenValue::Array(_) => Some(FrozenValue::array(
                self.iter()
                    .filter(|item| predicate(item))
                    .map(|item| item.value),
            )),
            _ => None,
        }
    }

    /// The underlying value, detached from any root.
    pub fn to_value(&self) -> FrozenValue {
        self.touch();
        self.value.clone()
    }
}

impl PartialEq<FrozenValue> for Observed {
    fn eq(&self, other: &FrozenValue) -> bool {
        self.touch();
        self.value == *other
    }
}

impl fmt::Debug for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observed")
            .field("root", &self.root_id())
            .field("value", &self.value)
            .finish()
    }
}
