//! Keyed joins.

use std::collections::HashMap;

use calcscript_core::{ArgMeta, CalcError, FnContext, FunctionMeta, FunctionPlugin, KeyRepr, Record, Value};

use crate::helpers::rows_arg;

const DEFAULT_RIGHT_PREFIX: &str = "right_";

/// join(left, right, opts) - merge rows on matching keys
///
/// `opts` is a record: `leftKey` (required), `rightKey` (defaults to
/// `leftKey`), `how` (`"inner"` or `"left"`, default `"inner"`) and
/// `rightPrefix` (default `"right_"`). Duplicate right keys keep the first
/// row. A right column colliding with a left column is carried under the
/// prefix; if the prefixed name still collides the join fails.
pub struct Join;

static JOIN_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("left", "list", "Left rows"),
    ArgMeta::required("right", "list", "Right rows"),
    ArgMeta::required("opts", "record", "leftKey, rightKey?, how?, rightPrefix?"),
];

struct JoinOpts {
    left_key: String,
    right_key: String,
    left_outer: bool,
    right_prefix: String,
}

fn parse_opts(value: &Value) -> Result<JoinOpts, CalcError> {
    let opts = value
        .as_record()
        .ok_or_else(|| CalcError::arg_type("join", "opts", "record", value.type_name()))?;

    let left_key = match opts.get("leftKey") {
        Some(Value::Text(s)) => s.clone(),
        Some(other) => {
            return Err(CalcError::eval(format!(
                "join: leftKey must be a string, got {}",
                other.type_name()
            )))
        }
        None => return Err(CalcError::eval("join: opts needs a 'leftKey'")),
    };
    let right_key = match opts.get("rightKey") {
        None | Some(Value::Null) => left_key.clone(),
        Some(Value::Text(s)) => s.clone(),
        Some(other) => {
            return Err(CalcError::eval(format!(
                "join: rightKey must be a string, got {}",
                other.type_name()
            )))
        }
    };
    let left_outer = match opts.get("how") {
        None | Some(Value::Null) => false,
        Some(Value::Text(how)) => match how.as_str() {
            "inner" => false,
            "left" => true,
            other => {
                return Err(CalcError::eval(format!(
                    "join: how must be \"inner\" or \"left\", got \"{}\"",
                    other
                )))
            }
        },
        Some(other) => {
            return Err(CalcError::eval(format!(
                "join: how must be a string, got {}",
                other.type_name()
            )))
        }
    };
    let right_prefix = match opts.get("rightPrefix") {
        None | Some(Value::Null) => DEFAULT_RIGHT_PREFIX.to_string(),
        Some(Value::Text(s)) => s.clone(),
        Some(other) => {
            return Err(CalcError::eval(format!(
                "join: rightPrefix must be a string, got {}",
                other.type_name()
            )))
        }
    };
    Ok(JoinOpts {
        left_key,
        right_key,
        left_outer,
        right_prefix,
    })
}

impl FunctionPlugin for Join {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "join",
            namespace: "table",
            usage: "join(left, right, {leftKey, rightKey?, how?, rightPrefix?})",
            description: "Merge rows on matching keys; collisions take the right prefix",
            args: &JOIN_ARGS,
            returns: "list",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 3 {
            return Err(CalcError::arg_count("join", "3", args.len()));
        }
        let left = rows_arg(args, 0, "join", "left")?;
        let right = rows_arg(args, 1, "join", "right")?;
        let opts = parse_opts(&args[2])?;

        // first occurrence of each right key wins
        let mut right_by_key: HashMap<KeyRepr, usize> = HashMap::with_capacity(right.len());
        for (i, row) in right.iter().enumerate() {
            let cell = match row.get(&opts.right_key) {
                Some(v) if !v.is_null() => v,
                _ => {
                    return Err(CalcError::eval(format!(
                        "join: right row {} has no usable '{}' key",
                        i, opts.right_key
                    )))
                }
            };
            let key = KeyRepr::from_value(cell)
                .map_err(|e| CalcError::eval(format!("join: right row {}: {}", i, e.message)))?;
            right_by_key.entry(key).or_insert(i);
        }

        let mut out = Vec::with_capacity(left.len());
        for row in left {
            // a null or absent left key matches nothing
            let matched = match row.get(&opts.left_key) {
                Some(cell) if !cell.is_null() => {
                    let key = KeyRepr::from_value(cell)?;
                    right_by_key.get(&key).map(|&i| &right[i])
                }
                _ => None,
            };
            match matched {
                Some(right_row) => out.push(Value::Record(merge(
                    &row,
                    right_row,
                    &opts.right_prefix,
                )?)),
                None if opts.left_outer => out.push(Value::Record(row)),
                None => {}
            }
        }
        Ok(Value::List(out))
    }
}

fn merge(left: &Record, right: &Record, prefix: &str) -> Result<Record, CalcError> {
    let mut merged = left.clone();
    for (key, value) in right.iter() {
        if !merged.contains_key(key) {
            merged.insert(key, value.clone())?;
            continue;
        }
        let prefixed = format!("{}{}", prefix, key);
        if merged.contains_key(&prefixed) {
            return Err(CalcError::eval(format!(
                "join: column '{}' still collides after prefixing as '{}'",
                key, prefixed
            )));
        }
        merged.insert(prefixed, value.clone())?;
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> Value {
        Value::List(vec![
            Value::Record(
                Record::from_entries([
                    ("sku", Value::from("a")),
                    ("qty", Value::Number(2.0)),
                ])
                .unwrap(),
            ),
            Value::Record(
                Record::from_entries([
                    ("sku", Value::from("b")),
                    ("qty", Value::Number(1.0)),
                ])
                .unwrap(),
            ),
            Value::Record(
                Record::from_entries([
                    ("sku", Value::from("zzz")),
                    ("qty", Value::Number(9.0)),
                ])
                .unwrap(),
            ),
        ])
    }

    fn prices() -> Value {
        Value::List(vec![
            Value::Record(
                Record::from_entries([
                    ("sku", Value::from("a")),
                    ("price", Value::Number(10.0)),
                ])
                .unwrap(),
            ),
            Value::Record(
                Record::from_entries([
                    ("sku", Value::from("b")),
                    ("price", Value::Number(20.0)),
                ])
                .unwrap(),
            ),
            Value::Record(
                Record::from_entries([
                    ("sku", Value::from("a")),
                    ("price", Value::Number(99.0)),
                ])
                .unwrap(),
            ),
        ])
    }

    fn opts(entries: &[(&str, Value)]) -> Value {
        Value::Record(
            Record::from_entries(entries.iter().map(|(k, v)| (*k, v.clone()))).unwrap(),
        )
    }

    #[test]
    fn test_inner_join_drops_unmatched_and_prefixes_collisions() {
        let out = Join
            .call(
                &[orders(), prices(), opts(&[("leftKey", Value::from("sku"))])],
                &FnContext::fixed(),
            )
            .unwrap();
        let rows = out.as_list().unwrap();
        assert_eq!(rows.len(), 2); // zzz dropped
        let first = rows[0].as_record().unwrap();
        assert_eq!(first.get("qty"), Some(&Value::Number(2.0)));
        assert_eq!(first.get("price"), Some(&Value::Number(10.0))); // first a wins
        assert_eq!(first.get("right_sku"), Some(&Value::from("a")));
    }

    #[test]
    fn test_left_join_passes_unmatched_through() {
        let out = Join
            .call(
                &[
                    orders(),
                    prices(),
                    opts(&[
                        ("leftKey", Value::from("sku")),
                        ("how", Value::from("left")),
                    ]),
                ],
                &FnContext::fixed(),
            )
            .unwrap();
        let rows = out.as_list().unwrap();
        assert_eq!(rows.len(), 3);
        let last = rows[2].as_record().unwrap();
        assert_eq!(last.get("sku"), Some(&Value::from("zzz")));
        assert_eq!(last.get("price"), None);
    }

    #[test]
    fn test_second_order_collision_is_fatal() {
        let left = Value::List(vec![Value::Record(
            Record::from_entries([
                ("id", Value::Number(1.0)),
                ("x", Value::Number(0.0)),
                ("right_x", Value::Number(0.0)),
            ])
            .unwrap(),
        )]);
        let right = Value::List(vec![Value::Record(
            Record::from_entries([("id", Value::Number(1.0)), ("x", Value::Number(5.0))])
                .unwrap(),
        )]);
        let err = Join
            .call(
                &[left, right, opts(&[("leftKey", Value::from("id"))])],
                &FnContext::fixed(),
            )
            .unwrap_err();
        assert!(err.message.contains("still collides"));
    }

    #[test]
    fn test_join_respects_key_kinds() {
        let left = Value::List(vec![Value::Record(
            Record::from_entries([("id", Value::from("1"))]).unwrap(),
        )]);
        let right = Value::List(vec![Value::Record(
            Record::from_entries([("id", Value::Number(1.0)), ("v", Value::Number(7.0))])
                .unwrap(),
        )]);
        let out = Join
            .call(
                &[left, right, opts(&[("leftKey", Value::from("id"))])],
                &FnContext::fixed(),
            )
            .unwrap();
        assert!(out.as_list().unwrap().is_empty()); // "1" does not match 1
    }

    #[test]
    fn test_join_rejects_unknown_mode() {
        let err = Join
            .call(
                &[
                    orders(),
                    prices(),
                    opts(&[
                        ("leftKey", Value::from("sku")),
                        ("how", Value::from("outer")),
                    ]),
                ],
                &FnContext::fixed(),
            )
            .unwrap_err();
        assert!(err.message.contains("inner"));
    }
}
