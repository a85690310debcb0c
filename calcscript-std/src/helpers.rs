//! Shared argument extraction for the standard library.

use std::sync::Arc;

use calcscript_core::{number, CalcError, FunctionPlugin, Value};

pub fn missing_arg(func: &str, name: &str) -> CalcError {
    CalcError::eval(format!("{} is missing required argument '{}'", func, name))
}

pub fn number_arg(args: &[Value], index: usize, func: &str, name: &str) -> Result<f64, CalcError> {
    match args.get(index) {
        Some(Value::Number(n)) => number::ensure_finite(*n, name),
        Some(other) => Err(CalcError::arg_type(func, name, "number", other.type_name())),
        None => Err(missing_arg(func, name)),
    }
}

/// A number argument that may be omitted or null.
pub fn optional_number_arg(
    args: &[Value],
    index: usize,
    func: &str,
    name: &str,
    default: f64,
) -> Result<f64, CalcError> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => number::ensure_finite(*n, name),
        Some(other) => Err(CalcError::arg_type(func, name, "number", other.type_name())),
    }
}

pub fn text_arg(args: &[Value], index: usize, func: &str, name: &str) -> Result<String, CalcError> {
    match args.get(index) {
        Some(Value::Text(s)) => Ok(s.clone()),
        Some(other) => Err(CalcError::arg_type(func, name, "string", other.type_name())),
        None => Err(missing_arg(func, name)),
    }
}

pub fn list_arg<'a>(
    args: &'a [Value],
    index: usize,
    func: &str,
    name: &str,
) -> Result<&'a [Value], CalcError> {
    match args.get(index) {
        Some(Value::List(items)) => Ok(items),
        Some(other) => Err(CalcError::arg_type(func, name, "list", other.type_name())),
        None => Err(missing_arg(func, name)),
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
        Some(other) => Err(CalcError::arg_type(func, name, "function", other.type_name())),
        None => Err(missing_arg(func, name)),
    }
}

/// Numbers from either a single list argument or bare varargs, so both
/// `math.sum(xs)` and `math.sum(1, 2, 3)` work. Nulls are rejected with
/// their position; clean first with `data.fillNull`/`data.dropNull`.
pub fn numbers_varargs(args: &[Value], func: &str) -> Result<Vec<f64>, CalcError> {
    let (items, spelled_out): (&[Value], bool) = match args {
        [Value::List(items)] => (items, false),
        _ => (args, true),
    };
    let mut numbers = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::Number(n) => numbers.push(number::ensure_finite(*n, "values")?),
            other => {
                let place = if spelled_out {
                    format!("argument {}", i + 1)
                } else {
                    format!("'values'[{}]", i)
                };
                return Err(CalcError::eval(format!(
                    "{} {}: expected number, got {}",
                    func,
                    place,
                    other.type_name()
                )));
            }
        }
    }
    Ok(numbers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_arg_rejects_non_numbers() {
        let args = vec![Value::from("x")];
        let err = number_arg(&args, 0, "abs", "x").unwrap_err();
        assert!(err.message.contains("expected number, got string"));
        assert!(number_arg(&[], 0, "abs", "x").is_err());
    }

    #[test]
    fn test_optional_number_arg_defaults_on_null() {
        assert_eq!(optional_number_arg(&[], 0, "round", "digits", 0.0).unwrap(), 0.0);
        let args = vec![Value::Null];
        assert_eq!(optional_number_arg(&args, 0, "round", "digits", 0.0).unwrap(), 0.0);
    }

    #[test]
    fn test_numbers_varargs_accepts_both_shapes() {
        let as_list = vec![Value::List(vec![Value::Number(1.0), Value::Number(2.0)])];
        assert_eq!(numbers_varargs(&as_list, "sum").unwrap(), vec![1.0, 2.0]);
        let bare = vec![Value::Number(1.0), Value::Number(2.0)];
        assert_eq!(numbers_varargs(&bare, "sum").unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_numbers_varargs_names_the_bad_position() {
        let args = vec![Value::List(vec![Value::Number(1.0), Value::Null])];
        let err = numbers_varargs(&args, "sum").unwrap_err();
        assert!(err.message.contains("'values'[1]"));
    }
}
