//! Type-disambiguated keys and keyed indexes.
//!
//! Grouping, joining and lookups all key rows by a scalar cell. A number
//! and its text spelling must stay distinct (`1` is not `"1"`), so keys are
//! normalized into [`KeyRepr`] rather than display strings. Negative zero
//! folds into zero; NaN can never occur because numbers are finite.

use std::collections::HashMap;
use std::fmt;

use crate::error::CalcError;
use crate::record::Record;
use crate::value::Value;

/// A normalized grouping/join/lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyRepr {
    /// Bit pattern of a finite f64, with -0.0 folded into 0.0.
    Num(u64),
    Text(String),
}

impl KeyRepr {
    /// Normalize a scalar into a key. Only finite numbers and text qualify.
    pub fn from_value(value: &Value) -> Result<Self, CalcError> {
        match value {
            Value::Number(n) if n.is_finite() => {
                let n = if *n == 0.0 { 0.0 } else { *n };
                Ok(KeyRepr::Num(n.to_bits()))
            }
            Value::Number(_) => Err(CalcError::not_finite("key")),
            Value::Text(s) => Ok(KeyRepr::Text(s.clone())),
            other => Err(CalcError::eval(format!(
                "keys must be strings or numbers, got {}",
                other.type_name()
            ))),
        }
    }

    /// The key as a value again, for building group records.
    pub fn to_value(&self) -> Value {
        match self {
            KeyRepr::Num(bits) => Value::Number(f64::from_bits(*bits)),
            KeyRepr::Text(s) => Value::Text(s.clone()),
        }
    }
}

impl fmt::Display for KeyRepr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyRepr::Num(bits) => write!(f, "{}", f64::from_bits(*bits)),
            KeyRepr::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// A reusable lookup table over rows, keyed by one column.
///
/// Built once by `lookup.index`, then probed any number of times by
/// `lookup.get`/`lookup.xlookup`. Duplicate keys keep the first row.
#[derive(Debug, Clone)]
pub struct KeyedIndex {
    key_column: String,
    rows: Vec<Record>,
    by_key: HashMap<KeyRepr, usize>,
}

impl KeyedIndex {
    /// Index `rows` by `key_column`. Every row must carry a non-null
    /// string or number in that column.
    pub fn build(rows: Vec<Record>, key_column: &str) -> Result<Self, CalcError> {
        let mut by_key = HashMap::with_capacity(rows.len());
        for (pos, row) in rows.iter().enumerate() {
            let cell = match row.get(key_column) {
                Some(v) if !v.is_null() => v,
                _ => {
                    return Err(CalcError::eval(format!(
                        "row {} has no usable '{}' key",
                        pos, key_column
                    )))
                }
            };
            let key = KeyRepr::from_value(cell).map_err(|e| {
                CalcError::eval(format!("row {} key column '{}': {}", pos, key_column, e.message))
            })?;
            by_key.entry(key).or_insert(pos);
        }
        Ok(Self {
            key_column: key_column.to_string(),
            rows,
            by_key,
        })
    }

    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look a key up. `Ok(None)` means the key is absent; `Err` means the
    /// probe value itself cannot be a key.
    pub fn get(&self, key: &Value) -> Result<Option<&Record>, CalcError> {
        let key = KeyRepr::from_value(key)?;
        Ok(self.by_key.get(&key).map(|&pos| &self.rows[pos]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: Value, name: &str) -> Record {
        Record::from_entries([("id", id), ("name", Value::from(name))]).unwrap()
    }

    #[test]
    fn test_number_and_text_keys_stay_distinct() {
        let a = KeyRepr::from_value(&Value::Number(1.0)).unwrap();
        let b = KeyRepr::from_value(&Value::from("1")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_negative_zero_folds_into_zero() {
        let a = KeyRepr::from_value(&Value::Number(0.0)).unwrap();
        let b = KeyRepr::from_value(&Value::Number(-0.0)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_non_scalar_keys_rejected() {
        assert!(KeyRepr::from_value(&Value::Bool(true)).is_err());
        assert!(KeyRepr::from_value(&Value::List(vec![])).is_err());
        assert!(KeyRepr::from_value(&Value::Null).is_err());
    }

    #[test]
    fn test_index_lookup_and_first_wins() {
        let idx = KeyedIndex::build(
            vec![
                row(Value::Number(1.0), "first"),
                row(Value::Number(2.0), "second"),
                row(Value::Number(1.0), "shadowed"),
            ],
            "id",
        )
        .unwrap();
        assert_eq!(idx.len(), 3);
        let hit = idx.get(&Value::Number(1.0)).unwrap().unwrap();
        assert_eq!(hit.get("name"), Some(&Value::from("first")));
        assert_eq!(idx.get(&Value::Number(3.0)).unwrap(), None);
    }

    #[test]
    fn test_index_rejects_missing_key_cell() {
        let rows = vec![Record::from_entries([("name", Value::from("x"))]).unwrap()];
        let err = KeyedIndex::build(rows, "id").unwrap_err();
        assert!(err.message.contains("no usable 'id' key"));
    }
}
