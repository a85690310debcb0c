//! Grouping and aggregation.

use std::collections::HashMap;

use calcscript_core::{ArgMeta, CalcError, FnContext, FunctionMeta, FunctionPlugin, KeyRepr, Record, Value};

use crate::helpers::{apply, rows_arg};

/// groupBy(rows, keyOrFn) - bucket rows, first-seen key order
pub struct GroupBy;

static GROUP_BY_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("rows", "list", "Rows to bucket"),
    ArgMeta::required(
        "keyOrFn",
        "string|function",
        "Column name, or a function from row to key",
    ),
];

impl FunctionPlugin for GroupBy {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "groupBy",
            namespace: "table",
            usage: "groupBy(rows, keyOrFn)",
            description: "Bucket rows by key into {key, rows} records, in first-seen order",
            args: &GROUP_BY_ARGS,
            returns: "list",
        }
    }

    fn call(&self, args: &[Value], ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 2 {
            return Err(CalcError::arg_count("groupBy", "2", args.len()));
        }
        let rows = rows_arg(args, 0, "groupBy", "rows")?;

        // first-seen order: parallel vec of buckets plus a position map
        let mut order: Vec<(KeyRepr, Vec<Record>)> = Vec::new();
        let mut positions: HashMap<KeyRepr, usize> = HashMap::new();

        for (i, row) in rows.into_iter().enumerate() {
            let key_value = match &args[1] {
                Value::Text(column) => row.get(column).cloned().ok_or_else(|| {
                    CalcError::eval(format!("groupBy: row {} has no '{}' column", i, column))
                })?,
                Value::Function(f) => apply(f, Value::Record(row.clone()), ctx)?,
                other => {
                    return Err(CalcError::arg_type(
                        "groupBy",
                        "keyOrFn",
                        "string or function",
                        other.type_name(),
                    ))
                }
            };
            let key = KeyRepr::from_value(&key_value)
                .map_err(|e| CalcError::eval(format!("groupBy: row {}: {}", i, e.message)))?;
            match positions.get(&key) {
                Some(&pos) => order[pos].1.push(row),
                None => {
                    positions.insert(key.clone(), order.len());
                    order.push((key, vec![row]));
                }
            }
        }

        let groups = order
            .into_iter()
            .map(|(key, rows)| {
                let rec = Record::from_entries([
                    ("key", key.to_value()),
                    (
                        "rows",
                        Value::List(rows.into_iter().map(Value::Record).collect()),
                    ),
                ])?;
                Ok(Value::Record(rec))
            })
            .collect::<Result<Vec<_>, CalcError>>()?;
        Ok(Value::List(groups))
    }
}

/// agg(groups, mapper) - one fresh record per group
pub struct Agg;

static AGG_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("groups", "list", "Group records from groupBy"),
    ArgMeta::required("mapper", "function", "Function from group to result record"),
];

impl FunctionPlugin for Agg {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "agg",
            namespace: "table",
            usage: "agg(groups, mapper)",
            description: "Map each group to a fresh record holding only the mapper's keys",
            args: &AGG_ARGS,
            returns: "list",
        }
    }

    fn call(&self, args: &[Value], ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 2 {
            return Err(CalcError::arg_count("agg", "2", args.len()));
        }
        let groups = rows_arg(args, 0, "agg", "groups")?;
        let mapper = match &args[1] {
            Value::Function(f) => f,
            other => {
                return Err(CalcError::arg_type(
                    "agg",
                    "mapper",
                    "function",
                    other.type_name(),
                ))
            }
        };
        let mut out = Vec::with_capacity(groups.len());
        for (i, group) in groups.into_iter().enumerate() {
            match apply(mapper, Value::Record(group), ctx)? {
                Value::Record(rec) => out.push(Value::Record(rec)),
                other => {
                    return Err(CalcError::eval(format!(
                        "agg: mapper must return a record, got {} for group {}",
                        other.type_name(),
                        i
                    )))
                }
            }
        }
        Ok(Value::List(out))
    }
}
