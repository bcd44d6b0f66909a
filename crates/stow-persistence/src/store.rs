//! In-memory key-value mapping.
//!
//! Pure data: no I/O and no scheduling. Keys are normalized (trimmed and
//! lowercased) on every access, so raw keys differing only in case or
//! surrounding whitespace alias the same entry.

use serde_json::{Map, Number, Value};

/// Normalize a raw key for lookup or storage.
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Mapping from normalized key to an arbitrary JSON value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    entries: Map<String, Value>,
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a parsed top-level JSON object.
    ///
    /// Keys are taken as-is; files written by this crate only ever contain
    /// normalized keys.
    pub fn from_map(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    /// Borrow the underlying map for serialization.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(&normalize_key(name))
    }

    /// Store a value under the normalized key.
    ///
    /// Returns `false` without touching the store when the key normalizes to
    /// an empty string or the value is `null`.
    pub fn insert(&mut self, name: &str, value: Value) -> bool {
        let key = normalize_key(name);
        if key.is_empty() || value.is_null() {
            return false;
        }
        self.entries.insert(key, value);
        true
    }

    /// Remove the normalized key, returning the old value if there was one.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.entries.remove(&normalize_key(name))
    }

    /// Check whether a key is present and, optionally, deeply equal to
    /// `expected`.
    ///
    /// Object comparison ignores key order and numbers compare by value
    /// (`1` equals `1.0`). A `null` comparison value is treated like no
    /// comparison value.
    pub fn contains(&self, name: &str, expected: Option<&Value>) -> bool {
        match (self.get(name), expected) {
            (None, _) => false,
            (Some(_), None | Some(Value::Null)) => true,
            (Some(stored), Some(expected)) => deep_equal(stored, expected),
        }
    }

    /// Snapshot of the current keys.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Snapshot of the current values.
    pub fn values(&self) -> Vec<Value> {
        self.entries.values().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Structural equality with numeric comparison by value.
fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| deep_equal(x, y)))
        }
        _ => a == b,
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
        return x == y;
    }
    // Integers beyond i64 and floats meet as f64
    x.as_f64() == y.as_f64()
}
