//! Runtime values.
//!
//! Everything a CalcScript pass computes is a [`Value`]. Numbers are finite
//! IEEE-754 doubles; currency and percent exist only as inferred kinds, so a
//! price and a ratio are both plain numbers at runtime. Tables bind as lists
//! of [`Record`]s. Functions (builtins and closures) and namespaces are
//! first-class but opaque: they can be called and traversed, never mutated.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::key::KeyedIndex;
use crate::record::Record;
use crate::traits::FunctionPlugin;

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    /// A finite double. Non-finite results are rejected before they
    /// become values.
    Number(f64),
    Text(String),
    Bool(bool),
    /// A calendar date with no time component.
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Null,
    List(Vec<Value>),
    Record(Record),
    Function(Arc<dyn FunctionPlugin>),
    Namespace(Arc<Namespace>),
    /// A reusable keyed lookup built by `lookup.index`.
    Index(Arc<KeyedIndex>),
}

impl Value {
    /// The user-facing name of this value's type, as used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Null => "null",
            Value::List(_) => "list",
            Value::Record(_) => "record",
            Value::Function(_) => "function",
            Value::Namespace(_) => "namespace",
            Value::Index(_) => "index",
        }
    }

    /// Truthiness for `!`, `&&`, `||` and the conditional operator.
    /// False, zero, empty text, null and empty containers are falsy.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::Null => false,
            Value::List(items) => !items.is_empty(),
            Value::Record(rec) => !rec.is_empty(),
            Value::Date(_) | Value::DateTime(_) => true,
            Value::Function(_) | Value::Namespace(_) | Value::Index(_) => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(rec) => Some(rec),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Arc<dyn FunctionPlugin>> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_index(&self) -> Option<&Arc<KeyedIndex>> {
        match self {
            Value::Index(idx) => Some(idx),
            _ => None,
        }
    }
}

/// Equality is structural for data values. Functions, namespaces and
/// indexes compare by identity; records compare by key set, not key order.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Namespace(a), Value::Namespace(b)) => Arc::ptr_eq(a, b),
            (Value::Index(a), Value::Index(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            Value::Null => write!(f, "null"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    fmt_nested(item, f)?;
                }
                write!(f, "]")
            }
            Value::Record(rec) => {
                write!(f, "{{")?;
                for (i, (key, value)) in rec.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: ", key)?;
                    fmt_nested(value, f)?;
                }
                write!(f, "}}")
            }
            Value::Function(func) => write!(f, "[function {}]", func.meta().name),
            Value::Namespace(ns) => write!(f, "[namespace {}]", ns.name()),
            Value::Index(idx) => write!(f, "[index on {}]", idx.key_column()),
        }
    }
}

/// Inside containers, text is quoted so `["1", 2]` and `[1, 2]` read apart.
fn fmt_nested(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::Text(s) => write!(f, "\"{}\"", s),
        other => write!(f, "{}", other),
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Date(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
            Value::DateTime(dt) => {
                serializer.serialize_str(&dt.format("%Y-%m-%dT%H:%M:%S").to_string())
            }
            Value::Null => serializer.serialize_none(),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Record(rec) => rec.serialize(serializer),
            Value::Function(func) => {
                serializer.serialize_str(&format!("[function {}]", func.meta().name))
            }
            Value::Namespace(ns) => serializer.serialize_str(&format!("[namespace {}]", ns.name())),
            Value::Index(idx) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("keyColumn", idx.key_column())?;
                map.serialize_entry("rows", &idx.len())?;
                map.end()
            }
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Record> for Value {
    fn from(rec: Record) -> Self {
        Value::Record(rec)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

/// A frozen name→value table, used to mount the standard library under the
/// reserved root. There is no mutation API: the entry map is consumed at
/// construction and only read afterwards.
#[derive(Debug, Clone)]
pub struct Namespace {
    name: String,
    entries: BTreeMap<String, Value>,
}

impl Namespace {
    pub fn from_entries(name: impl Into<String>, entries: BTreeMap<String, Value>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Number(1.0).type_name(), "number");
        assert_eq!(Value::from("hi").type_name(), "string");
        assert_eq!(Value::Bool(true).type_name(), "boolean");
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::List(vec![]).type_name(), "list");
        assert_eq!(Value::Date(date(2024, 1, 1)).type_name(), "date");
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Number(1.0).truthy());
        assert!(!Value::Number(0.0).truthy());
        assert!(!Value::from("").truthy());
        assert!(Value::from("x").truthy());
        assert!(!Value::Null.truthy());
        assert!(!Value::List(vec![]).truthy());
        assert!(Value::List(vec![Value::Null]).truthy());
        assert!(Value::Date(date(2024, 1, 1)).truthy());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::from("abc").to_string(), "abc");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(
            Value::List(vec![Value::Number(1.0), Value::from("a")]).to_string(),
            "[1, \"a\"]"
        );
        assert_eq!(Value::Date(date(2024, 3, 9)).to_string(), "2024-03-09");
    }

    #[test]
    fn test_equality_across_kinds() {
        assert_eq!(Value::Number(1.0), Value::Number(1.0));
        assert_ne!(Value::Number(1.0), Value::from("1"));
        assert_eq!(Value::Null, Value::Null);
        assert_ne!(Value::Null, Value::Number(0.0));
    }

    #[test]
    fn test_serialize_scalar_values() {
        let json = serde_json::to_string(&Value::List(vec![
            Value::Number(1.5),
            Value::from("x"),
            Value::Null,
            Value::Bool(false),
        ]))
        .unwrap();
        assert_eq!(json, "[1.5,\"x\",null,false]");
    }

    #[test]
    fn test_namespace_lookup_and_freeze() {
        let mut entries = BTreeMap::new();
        entries.insert("pi".to_string(), Value::Number(3.14));
        let ns = Namespace::from_entries("math", entries);
        assert_eq!(ns.get("pi"), Some(&Value::Number(3.14)));
        assert_eq!(ns.get("tau"), None);
        assert_eq!(ns.name(), "math");
        assert_eq!(ns.len(), 1);
    }
}
