//! Stable row sorting.

use std::cmp::Ordering;

use calcscript_core::{date, ArgMeta, CalcError, FnContext, FunctionMeta, FunctionPlugin, Record, Value};

use crate::helpers::{rows_arg, text_arg};

/// sortBy(rows, key, direction?) - stable sort on one column
///
/// Present values must all be one comparable kind (numbers, strings, or
/// dates compared as timestamps). Rows with a null or missing key keep
/// their relative order at the end, whatever the direction.
pub struct SortBy;

static SORT_BY_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("rows", "list", "Rows to sort"),
    ArgMeta::required("key", "string", "Column to sort on"),
    ArgMeta::optional("direction", "string", "\"asc\" (default) or \"desc\""),
];

enum SortKey {
    Num(f64),
    Text(String),
    Time(i64),
}

impl SortKey {
    fn kind(&self) -> &'static str {
        match self {
            SortKey::Num(_) => "number",
            SortKey::Text(_) => "string",
            SortKey::Time(_) => "date",
        }
    }

    fn compare(&self, other: &SortKey) -> Ordering {
        match (self, other) {
            (SortKey::Num(a), SortKey::Num(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::Time(a), SortKey::Time(b)) => a.cmp(b),
            // build_key guarantees one kind per sort
            _ => Ordering::Equal,
        }
    }
}

fn build_key(cell: &Value, column: &str, row: usize) -> Result<SortKey, CalcError> {
    match cell {
        Value::Number(n) => Ok(SortKey::Num(*n)),
        Value::Text(s) => Ok(SortKey::Text(s.clone())),
        Value::Date(_) | Value::DateTime(_) => {
            let ts = date::timestamp(cell)
                .ok_or_else(|| CalcError::domain("date out of range"))?;
            Ok(SortKey::Time(ts))
        }
        other => Err(CalcError::eval(format!(
            "sortBy: row {} column '{}' is not sortable ({})",
            row,
            column,
            other.type_name()
        ))),
    }
}

impl FunctionPlugin for SortBy {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "sortBy",
            namespace: "table",
            usage: "sortBy(rows, key, direction?)",
            description: "Stable sort by one column; null keys always sort last",
            args: &SORT_BY_ARGS,
            returns: "list",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() < 2 || args.len() > 3 {
            return Err(CalcError::arg_count("sortBy", "2 or 3", args.len()));
        }
        let rows = rows_arg(args, 0, "sortBy", "rows")?;
        let column = text_arg(args, 1, "sortBy", "key")?;
        let descending = match args.get(2) {
            None | Some(Value::Null) => false,
            Some(Value::Text(dir)) => match dir.as_str() {
                "asc" => false,
                "desc" => true,
                other => {
                    return Err(CalcError::eval(format!(
                        "sortBy: direction must be \"asc\" or \"desc\", got \"{}\"",
                        other
                    )))
                }
            },
            Some(other) => {
                return Err(CalcError::arg_type(
                    "sortBy",
                    "direction",
                    "string",
                    other.type_name(),
                ))
            }
        };

        let mut keyed: Vec<(SortKey, Record)> = Vec::new();
        let mut nullish: Vec<Record> = Vec::new();
        for (i, row) in rows.into_iter().enumerate() {
            match row.get(&column) {
                None | Some(Value::Null) => nullish.push(row),
                Some(cell) => {
                    let key = build_key(cell, &column, i)?;
                    if let Some((first, _)) = keyed.first() {
                        if first.kind() != key.kind() {
                            return Err(CalcError::eval(format!(
                                "sortBy: column '{}' mixes {} and {} values",
                                column,
                                first.kind(),
                                key.kind()
                            )));
                        }
                    }
                    keyed.push((key, row));
                }
            }
        }

        // sort_by is stable; flipping the comparison keeps ties in
        // document order for both directions
        keyed.sort_by(|(a, _), (b, _)| {
            let ord = a.compare(b);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });

        let mut out: Vec<Value> = keyed.into_iter().map(|(_, row)| Value::Record(row)).collect();
        out.extend(nullish.into_iter().map(Value::Record));
        Ok(Value::List(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, amount: Value) -> Value {
        Value::Record(
            Record::from_entries([("name", Value::from(name)), ("amount", amount)]).unwrap(),
        )
    }

    fn names(out: &Value) -> Vec<String> {
        out.as_list()
            .unwrap()
            .iter()
            .map(|r| {
                r.as_record()
                    .unwrap()
                    .get("name")
                    .unwrap()
                    .as_text()
                    .unwrap()
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn test_sort_ascending_with_nulls_last() {
        let rows = Value::List(vec![
            row("b", Value::Number(2.0)),
            row("none1", Value::Null),
            row("a", Value::Number(1.0)),
            row("none2", Value::Null),
        ]);
        let out = SortBy
            .call(&[rows, Value::from("amount")], &FnContext::fixed())
            .unwrap();
        assert_eq!(names(&out), vec!["a", "b", "none1", "none2"]);
    }

    #[test]
    fn test_sort_descending_keeps_nulls_last() {
        let rows = Value::List(vec![
            row("none", Value::Null),
            row("small", Value::Number(1.0)),
            row("big", Value::Number(10.0)),
        ]);
        let out = SortBy
            .call(
                &[rows, Value::from("amount"), Value::from("desc")],
                &FnContext::fixed(),
            )
            .unwrap();
        assert_eq!(names(&out), vec!["big", "small", "none"]);
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let rows = Value::List(vec![
            row("first", Value::Number(1.0)),
            row("second", Value::Number(1.0)),
            row("third", Value::Number(0.0)),
        ]);
        let out = SortBy
            .call(&[rows, Value::from("amount")], &FnContext::fixed())
            .unwrap();
        assert_eq!(names(&out), vec!["third", "first", "second"]);
    }

    #[test]
    fn test_sort_rejects_mixed_kinds() {
        let rows = Value::List(vec![
            row("a", Value::Number(1.0)),
            row("b", Value::from("two")),
        ]);
        let err = SortBy
            .call(&[rows, Value::from("amount")], &FnContext::fixed())
            .unwrap_err();
        assert!(err.message.contains("mixes number and string"));
    }

    #[test]
    fn test_sort_dates_as_timestamps() {
        let d = |s: &str| Value::Date(date::parse_date(s).unwrap());
        let rows = Value::List(vec![
            row("later", d("2024-06-01")),
            row("early", d("2024-01-01")),
        ]);
        let out = SortBy
            .call(&[rows, Value::from("amount")], &FnContext::fixed())
            .unwrap();
        assert_eq!(names(&out), vec!["early", "later"]);
    }
}
