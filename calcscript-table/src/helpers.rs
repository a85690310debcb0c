//! Shared argument handling for the table kernels.

use std::sync::Arc;

use calcscript_core::{CalcError, FnContext, FunctionPlugin, Record, Value};

/// Extract a list of records (table rows).
pub fn rows_arg(
    args: &[Value],
    index: usize,
    func: &str,
    name: &str,
) -> Result<Vec<Record>, CalcError> {
    let list = match args.get(index) {
        Some(Value::List(items)) => items,
        Some(other) => {
            return Err(CalcError::arg_type(
                func,
                name,
                "list of records",
                other.type_name(),
            ))
        }
        None => {
            return Err(CalcError::eval(format!(
                "{} is missing required argument '{}'",
                func, name
            )))
        }
    };
    let mut rows = Vec::with_capacity(list.len());
    for (i, item) in list.iter().enumerate() {
        match item {
            Value::Record(rec) => rows.push(rec.clone()),
            other => {
                return Err(CalcError::eval(format!(
                    "{} argument '{}'[{}]: expected record, got {}",
                    func,
                    name,
                    i,
                    other.type_name()
                )))
            }
        }
    }
    Ok(rows)
}

pub fn text_arg(args: &[Value], index: usize, func: &str, name: &str) -> Result<String, CalcError> {
    match args.get(index) {
        Some(Value::Text(s)) => Ok(s.clone()),
        Some(other) => Err(CalcError::arg_type(func, name, "string", other.type_name())),
        None => Err(CalcError::eval(format!(
            "{} is missing required argument '{}'",
            func, name
        ))),
    }
}

pub fn function_arg<'a>(
    args: &'a [Value],
    index: usize,
    func: &str,
    name: &str,
) -> Result<&'a Arc<dyn FunctionPlugin>, CalcError> {
    match args.get(index) {
        Some(Value::Function(f)) => Ok(f),
        Some(other) => Err(CalcError::arg_type(
            func,
            name,
            "function",
            other.type_name(),
        )),
        None => Err(CalcError::eval(format!(
            "{} is missing required argument '{}'",
            func, name
        ))),
    }
}

/// Apply a row-mapper function to one value.
pub fn apply(
    f: &Arc<dyn FunctionPlugin>,
    arg: Value,
    ctx: &FnContext,
) -> Result<Value, CalcError> {
    f.call(&[arg], ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_arg_rejects_non_record_item() {
        let args = vec![Value::List(vec![Value::Number(1.0)])];
        let err = rows_arg(&args, 0, "sortBy", "rows").unwrap_err();
        assert!(err.message.contains("'rows'[0]"));
    }

    #[test]
    fn test_text_arg() {
        let args = vec![Value::from("amount")];
        assert_eq!(text_arg(&args, 0, "sortBy", "key").unwrap(), "amount");
        assert!(text_arg(&args, 1, "sortBy", "key").is_err());
    }
}
