//! Keyed lookups: reusable indexes and one-shot scans.

use std::sync::Arc;

use calcscript_core::{
    ArgMeta, CalcError, FnContext, FunctionMeta, FunctionPlugin, KeyRepr, KeyedIndex, Value,
};

use crate::helpers::{rows_arg, text_arg};

/// index(rows, keyColumn) - build a reusable lookup table
pub struct Index;

static INDEX_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("rows", "list", "Rows to index"),
    ArgMeta::required("keyColumn", "string", "Column holding the key of each row"),
];

impl FunctionPlugin for Index {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "index",
            namespace: "lookup",
            usage: "index(rows, keyColumn)",
            description: "Index rows by a key column; duplicate keys keep the first row",
            args: &INDEX_ARGS,
            returns: "index",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 2 {
            return Err(CalcError::arg_count("index", "2", args.len()));
        }
        let rows = rows_arg(args, 0, "index", "rows")?;
        let column = text_arg(args, 1, "index", "keyColumn")?;
        let built = KeyedIndex::build(rows, &column)
            .map_err(|e| CalcError::eval(format!("index: {}", e.message)))?;
        Ok(Value::Index(Arc::new(built)))
    }
}

/// get(index, key, default?) - probe an index for a whole row
pub struct Get;

static GET_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("index", "index", "Index built by lookup.index"),
    ArgMeta::required("key", "string | number", "Key to look up"),
    ArgMeta::optional("default", "any", "Returned when the key is absent"),
];

impl FunctionPlugin for Get {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "get",
            namespace: "lookup",
            usage: "get(index, key, default?)",
            description: "Row for a key, or the default; errors when absent with no default",
            args: &GET_ARGS,
            returns: "record",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() < 2 || args.len() > 3 {
            return Err(CalcError::arg_count("get", "2 or 3", args.len()));
        }
        let index = match &args[0] {
            Value::Index(idx) => idx,
            other => return Err(CalcError::arg_type("get", "index", "index", other.type_name())),
        };
        let key = &args[1];
        match index.get(key)? {
            Some(row) => Ok(Value::Record(row.clone())),
            None => match args.get(2) {
                Some(default) if !default.is_null() => Ok(default.clone()),
                _ => Err(CalcError::key_not_found(&KeyRepr::from_value(key)?.to_string())),
            },
        }
    }
}

/// xlookup(key, rows, keyColumn, resultColumn?, default?) - first-match scan
///
/// Rows whose key cell is null or missing are skipped, so partially
/// filled tables can still be probed without pre-cleaning.
pub struct Xlookup;

static XLOOKUP_ARGS: [ArgMeta; 5] = [
    ArgMeta::required("key", "string | number", "Key to find"),
    ArgMeta::required("rows", "list", "Rows to scan in order"),
    ArgMeta::required("keyColumn", "string", "Column holding the key of each row"),
    ArgMeta::optional("resultColumn", "string", "Column to project from the match"),
    ArgMeta::optional("default", "any", "Returned when no row matches"),
];

impl FunctionPlugin for Xlookup {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "xlookup",
            namespace: "lookup",
            usage: "xlookup(key, rows, keyColumn, resultColumn?, default?)",
            description: "First row whose key column matches; optionally projects one column",
            args: &XLOOKUP_ARGS,
            returns: "any",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() < 3 || args.len() > 5 {
            return Err(CalcError::arg_count("xlookup", "3 to 5", args.len()));
        }
        let needle = KeyRepr::from_value(&args[0])
            .map_err(|e| CalcError::eval(format!("xlookup key: {}", e.message)))?;
        let rows = rows_arg(args, 1, "xlookup", "rows")?;
        let key_column = text_arg(args, 2, "xlookup", "keyColumn")?;
        let result_column = match args.get(3) {
            None | Some(Value::Null) => None,
            Some(Value::Text(col)) => Some(col.clone()),
            Some(other) => {
                return Err(CalcError::arg_type(
                    "xlookup",
                    "resultColumn",
                    "string",
                    other.type_name(),
                ))
            }
        };

        for (i, row) in rows.iter().enumerate() {
            let cell = match row.get(&key_column) {
                None | Some(Value::Null) => continue,
                Some(cell) => cell,
            };
            let candidate = KeyRepr::from_value(cell).map_err(|e| {
                CalcError::eval(format!(
                    "xlookup: row {} key column '{}': {}",
                    i, key_column, e.message
                ))
            })?;
            if candidate == needle {
                return Ok(match &result_column {
                    Some(col) => row.get(col).cloned().unwrap_or(Value::Null),
                    None => Value::Record(row.clone()),
                });
            }
        }

        match args.get(4) {
            Some(default) if !default.is_null() => Ok(default.clone()),
            _ => Err(CalcError::key_not_found(&needle.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calcscript_core::Record;

    fn row(id: Value, name: &str) -> Value {
        Value::Record(Record::from_entries([("id", id), ("name", Value::from(name))]).unwrap())
    }

    #[test]
    fn test_index_then_get() {
        let rows = Value::List(vec![
            row(Value::from("a"), "alpha"),
            row(Value::from("b"), "beta"),
        ]);
        let idx = Index
            .call(&[rows, Value::from("id")], &FnContext::fixed())
            .unwrap();
        let hit = Get
            .call(&[idx.clone(), Value::from("b")], &FnContext::fixed())
            .unwrap();
        assert_eq!(
            hit.as_record().unwrap().get("name"),
            Some(&Value::from("beta"))
        );

        let miss = Get
            .call(&[idx.clone(), Value::from("z")], &FnContext::fixed())
            .unwrap_err();
        assert!(miss.message.contains("key not found"));

        let defaulted = Get
            .call(
                &[idx, Value::from("z"), Value::from("fallback")],
                &FnContext::fixed(),
            )
            .unwrap();
        assert_eq!(defaulted, Value::from("fallback"));
    }

    #[test]
    fn test_index_requires_usable_keys() {
        let rows = Value::List(vec![Value::Record(
            Record::from_entries([("name", Value::from("orphan"))]).unwrap(),
        )]);
        let err = Index
            .call(&[rows, Value::from("id")], &FnContext::fixed())
            .unwrap_err();
        assert!(err.message.contains("no usable 'id' key"));
    }

    #[test]
    fn test_xlookup_projects_result_column() {
        let rows = Value::List(vec![
            row(Value::Number(1.0), "one"),
            row(Value::Number(2.0), "two"),
        ]);
        let got = Xlookup
            .call(
                &[
                    Value::Number(2.0),
                    rows,
                    Value::from("id"),
                    Value::from("name"),
                ],
                &FnContext::fixed(),
            )
            .unwrap();
        assert_eq!(got, Value::from("two"));
    }

    #[test]
    fn test_xlookup_skips_null_keys_and_returns_first_match() {
        let rows = Value::List(vec![
            row(Value::Null, "skipped"),
            row(Value::from("x"), "first"),
            row(Value::from("x"), "second"),
        ]);
        let got = Xlookup
            .call(
                &[Value::from("x"), rows, Value::from("id")],
                &FnContext::fixed(),
            )
            .unwrap();
        assert_eq!(
            got.as_record().unwrap().get("name"),
            Some(&Value::from("first"))
        );
    }

    #[test]
    fn test_xlookup_miss_uses_default_or_errors() {
        let rows = Value::List(vec![row(Value::from("a"), "alpha")]);
        let defaulted = Xlookup
            .call(
                &[
                    Value::from("zzz"),
                    rows.clone(),
                    Value::from("id"),
                    Value::Null,
                    Value::Number(0.0),
                ],
                &FnContext::fixed(),
            )
            .unwrap();
        assert_eq!(defaulted, Value::Number(0.0));

        let err = Xlookup
            .call(
                &[Value::from("zzz"), rows, Value::from("id")],
                &FnContext::fixed(),
            )
            .unwrap_err();
        assert!(err.message.contains("key not found"));
    }

    #[test]
    fn test_xlookup_number_key_does_not_match_text() {
        let rows = Value::List(vec![row(Value::from("1"), "text-keyed")]);
        let err = Xlookup
            .call(
                &[Value::Number(1.0), rows, Value::from("id")],
                &FnContext::fixed(),
            )
            .unwrap_err();
        assert!(err.message.contains("key not found"));
    }
}
