//! Core types for CalcScript.
//!
//! This crate defines the data model everything else builds on: runtime
//! [`Value`]s, ordered [`Record`]s, declared [`InputType`] kinds, the
//! [`FunctionPlugin`] trait implemented by every standard-library function,
//! and the structured [`CalcError`]/[`Diagnostic`] pair that carries every
//! failure. It has no knowledge of the language itself.

pub mod date;
pub mod error;
pub mod key;
pub mod number;
pub mod record;
pub mod traits;
pub mod types;
pub mod value;

pub use error::{codes, CalcError, Diagnostic, Severity};
pub use key::{KeyRepr, KeyedIndex};
pub use record::{Record, RESERVED_KEYS};
pub use traits::{ArgMeta, FnContext, FunctionMeta, FunctionPlugin};
pub use types::{combine_numeric, InputType, NumericOp, TypeParseError};
pub use value::{Namespace, Value};

/// Common imports for kernel crates and the language crate.
pub mod prelude {
    pub use crate::error::{codes, CalcError, Diagnostic, Severity};
    pub use crate::key::{KeyRepr, KeyedIndex};
    pub use crate::record::Record;
    pub use crate::traits::{ArgMeta, FnContext, FunctionMeta, FunctionPlugin};
    pub use crate::types::InputType;
    pub use crate::value::{Namespace, Value};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use crate::key::KeyRepr;

    #[test]
    fn test_rows_flow_into_index_and_back() {
        let rows: Vec<Record> = (1..=3)
            .map(|i| {
                Record::from_entries([
                    ("sku", Value::Text(format!("A{}", i))),
                    ("price", Value::Number(i as f64 * 10.0)),
                ])
                .unwrap()
            })
            .collect();
        let idx = KeyedIndex::build(rows, "sku").unwrap();
        let hit = idx.get(&Value::from("A2")).unwrap().unwrap();
        assert_eq!(hit.get("price"), Some(&Value::Number(20.0)));
    }

    #[test]
    fn test_key_disambiguation_against_display() {
        // "1" and 1 render alike but never collide as keys
        let num = KeyRepr::from_value(&Value::Number(1.0)).unwrap();
        let text = KeyRepr::from_value(&Value::from("1")).unwrap();
        assert_ne!(num, text);
        assert_eq!(num.to_value(), Value::Number(1.0));
    }

    #[test]
    fn test_reserved_key_error_reaches_diagnostics() {
        let err = Record::new()
            .insert("__proto__", Value::Null)
            .unwrap_err();
        let diag: Diagnostic = err.into();
        assert_eq!(diag.code, codes::RESERVED_KEY);
        assert_eq!(diag.severity, Severity::Error);
    }

    #[test]
    fn test_input_type_drives_no_runtime_representation() {
        // a currency and a plain number are the same value at runtime
        let price = Value::Number(10.5);
        assert_eq!(price.type_name(), "number");
        let ty = InputType::parse("currency(USD)").unwrap();
        assert!(ty.is_numeric());
    }
}
