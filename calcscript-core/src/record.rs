//! Ordered, pollution-safe records.
//!
//! Table rows, object-literal results and group entries are all [`Record`]s.
//! Key order is first-insertion order and survives overrides; a handful of
//! prototype-pollution keys are rejected outright so no hostile document can
//! smuggle them into downstream JSON consumers.

use std::collections::HashMap;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::CalcError;
use crate::value::Value;

/// Keys no record may carry, wherever it is built.
pub const RESERVED_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

/// An insertion-ordered string→value map.
///
/// Inserting an existing key replaces the value but keeps the key's original
/// position. Inserting a reserved key fails.
#[derive(Debug, Clone, Default)]
pub struct Record {
    keys: Vec<String>,
    entries: HashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from (key, value) pairs, last value winning per key.
    pub fn from_entries<K, I>(pairs: I) -> Result<Self, CalcError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let mut rec = Record::new();
        for (key, value) in pairs {
            rec.insert(key, value)?;
        }
        Ok(rec)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Result<(), CalcError> {
        let key = key.into();
        if RESERVED_KEYS.contains(&key.as_str()) {
            return Err(CalcError::reserved_record_key(&key));
        }
        if !self.entries.contains_key(&key) {
            self.keys.push(key.clone());
        }
        self.entries.insert(key, value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.keys.iter().map(move |k| {
            // every key in `keys` has an entry
            (k.as_str(), &self.entries[k])
        })
    }
}

/// Order-insensitive: two records are equal when they hold the same keys
/// with equal values. Order matters for display, not identity.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.entries.get(k) == Some(v))
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Record(self.clone()))
    }
}
