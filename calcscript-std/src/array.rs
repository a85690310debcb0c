//! List functions, mounted as `array.*`.

use calcscript_core::{ArgMeta, CalcError, FnContext, FunctionMeta, FunctionPlugin, Value};

use crate::helpers::{function_arg, list_arg, number_arg, optional_number_arg};

/// Hard cap on generated ranges. A step chosen badly should fail, not
/// allocate gigabytes.
const MAX_RANGE_LEN: usize = 1_000_000;

static LIST_ARGS: [ArgMeta; 1] = [ArgMeta::required("list", "list", "Input list")];

/// len(list)
pub struct Len;

impl FunctionPlugin for Len {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "len",
            namespace: "array",
            usage: "len(list)",
            description: "Number of elements",
            args: &LIST_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("len", "1", args.len()));
        }
        Ok(Value::Number(list_arg(args, 0, "len", "list")?.len() as f64))
    }
}

/// first(list) - errors on an empty list
pub struct First;

impl FunctionPlugin for First {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "first",
            namespace: "array",
            usage: "first(list)",
            description: "First element; empty input is an error",
            args: &LIST_ARGS,
            returns: "any",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("first", "1", args.len()));
        }
        list_arg(args, 0, "first", "list")?
            .first()
            .cloned()
            .ok_or_else(|| CalcError::domain("first: list is empty"))
    }
}

/// last(list) - errors on an empty list
pub struct Last;

impl FunctionPlugin for Last {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "last",
            namespace: "array",
            usage: "last(list)",
            description: "Last element; empty input is an error",
            args: &LIST_ARGS,
            returns: "any",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("last", "1", args.len()));
        }
        list_arg(args, 0, "last", "list")?
            .last()
            .cloned()
            .ok_or_else(|| CalcError::domain("last: list is empty"))
    }
}

/// map(list, fn)
pub struct Map;

static MAP_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("list", "list", "Input list"),
    ArgMeta::required("fn", "function", "Applied to each element"),
];

impl FunctionPlugin for Map {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "map",
            namespace: "array",
            usage: "map(list, fn)",
            description: "Apply a function to every element",
            args: &MAP_ARGS,
            returns: "list",
        }
    }

    fn call(&self, args: &[Value], ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 2 {
            return Err(CalcError::arg_count("map", "2", args.len()));
        }
        let items = list_arg(args, 0, "map", "list")?;
        let f = function_arg(args, 1, "map", "fn")?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(f.call(std::slice::from_ref(item), ctx)?);
        }
        Ok(Value::List(out))
    }
}

/// filter(list, fn) - keeps elements where fn returns truthy
pub struct Filter;

static FILTER_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("list", "list", "Input list"),
    ArgMeta::required("fn", "function", "Predicate; truthy keeps the element"),
];

impl FunctionPlugin for Filter {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "filter",
            namespace: "array",
            usage: "filter(list, fn)",
            description: "Keep elements the predicate accepts",
            args: &FILTER_ARGS,
            returns: "list",
        }
    }

    fn call(&self, args: &[Value], ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 2 {
            return Err(CalcError::arg_count("filter", "2", args.len()));
        }
        let items = list_arg(args, 0, "filter", "list")?;
        let f = function_arg(args, 1, "filter", "fn")?;
        let mut out = Vec::new();
        for item in items {
            if f.call(std::slice::from_ref(item), ctx)?.truthy() {
                out.push(item.clone());
            }
        }
        Ok(Value::List(out))
    }
}

/// unique(list) - structural dedup, first occurrence wins
pub struct Unique;

impl FunctionPlugin for Unique {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "unique",
            namespace: "array",
            usage: "unique(list)",
            description: "Drop structural duplicates, keeping first occurrences",
            args: &LIST_ARGS,
            returns: "list",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("unique", "1", args.len()));
        }
        let items = list_arg(args, 0, "unique", "list")?;
        let mut out: Vec<Value> = Vec::new();
        for item in items {
            if !out.contains(item) {
                out.push(item.clone());
            }
        }
        Ok(Value::List(out))
    }
}

/// range(start, stop, step?) - half-open, step defaults to 1
pub struct Range;

static RANGE_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("start", "number", "First value"),
    ArgMeta::required("stop", "number", "Exclusive end"),
    ArgMeta::optional("step", "number", "Increment, non-zero (default 1)"),
];

impl FunctionPlugin for Range {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "range",
            namespace: "array",
            usage: "range(start, stop, step?)",
            description: "Numbers from start up to (excluding) stop",
            args: &RANGE_ARGS,
            returns: "list",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() < 2 || args.len() > 3 {
            return Err(CalcError::arg_count("range", "2 or 3", args.len()));
        }
        let start = number_arg(args, 0, "range", "start")?;
        let stop = number_arg(args, 1, "range", "stop")?;
        let step = optional_number_arg(args, 2, "range", "step", 1.0)?;
        if step == 0.0 {
            return Err(CalcError::domain("range: step must not be zero"));
        }
        let span = (stop - start) / step;
        if span > MAX_RANGE_LEN as f64 {
            return Err(CalcError::domain(format!(
                "range from {} to {} by {} would produce more than {} elements",
                start, stop, step, MAX_RANGE_LEN
            )));
        }
        let mut out = Vec::new();
        // value computed from the index, not accumulated, so long ranges
        // do not drift
        for i in 0..MAX_RANGE_LEN {
            let v = start + i as f64 * step;
            let done = if step > 0.0 { v >= stop } else { v <= stop };
            if done {
                break;
            }
            out.push(Value::Number(v));
        }
        Ok(Value::List(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> FnContext {
        FnContext::fixed()
    }

    fn nums(values: &[f64]) -> Value {
        Value::List(values.iter().map(|&n| Value::Number(n)).collect())
    }

    #[test]
    fn test_first_last_and_empty() {
        let list = nums(&[1.0, 2.0, 3.0]);
        assert_eq!(First.call(&[list.clone()], &ctx()).unwrap(), Value::Number(1.0));
        assert_eq!(Last.call(&[list], &ctx()).unwrap(), Value::Number(3.0));
        assert!(First.call(&[Value::List(vec![])], &ctx()).is_err());
    }

    #[test]
    fn test_unique_keeps_first_and_distinguishes_kinds() {
        let list = Value::List(vec![
            Value::Number(1.0),
            Value::from("1"),
            Value::Number(1.0),
            Value::Null,
            Value::Null,
        ]);
        let out = Unique.call(&[list], &ctx()).unwrap();
        assert_eq!(
            out,
            Value::List(vec![Value::Number(1.0), Value::from("1"), Value::Null])
        );
    }

    #[test]
    fn test_range_forward_and_backward() {
        assert_eq!(
            Range
                .call(&[Value::Number(0.0), Value::Number(3.0)], &ctx())
                .unwrap(),
            nums(&[0.0, 1.0, 2.0])
        );
        assert_eq!(
            Range
                .call(
                    &[Value::Number(3.0), Value::Number(0.0), Value::Number(-1.0)],
                    &ctx(),
                )
                .unwrap(),
            nums(&[3.0, 2.0, 1.0])
        );
        // wrong-direction step yields an empty list, not an error
        assert_eq!(
            Range
                .call(
                    &[Value::Number(3.0), Value::Number(0.0), Value::Number(1.0)],
                    &ctx(),
                )
                .unwrap(),
            Value::List(vec![])
        );
    }

    #[test]
    fn test_map_and_filter_apply_the_function() {
        struct Double;
        static DOUBLE_ARGS: [ArgMeta; 1] = [ArgMeta::required("x", "number", "")];
        impl FunctionPlugin for Double {
            fn meta(&self) -> FunctionMeta {
                FunctionMeta {
                    name: "double",
                    namespace: "test",
                    usage: "double(x)",
                    description: "",
                    args: &DOUBLE_ARGS,
                    returns: "number",
                }
            }
            fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
                match args {
                    [Value::Number(n)] => Ok(Value::Number(n * 2.0)),
                    _ => Err(CalcError::eval("double wants one number")),
                }
            }
        }

        let f = Value::Function(std::sync::Arc::new(Double));
        let mapped = Map
            .call(&[nums(&[1.0, 2.0]), f.clone()], &ctx())
            .unwrap();
        assert_eq!(mapped, nums(&[2.0, 4.0]));

        // 0 doubles to 0, which is falsy, so filter drops it
        let filtered = Filter.call(&[nums(&[0.0, 3.0]), f], &ctx()).unwrap();
        assert_eq!(filtered, nums(&[3.0]));
    }

    #[test]
    fn test_range_guards() {
        assert!(Range
            .call(
                &[Value::Number(0.0), Value::Number(1.0), Value::Number(0.0)],
                &ctx(),
            )
            .is_err());
        assert!(Range
            .call(
                &[Value::Number(0.0), Value::Number(1e9), Value::Number(1.0)],
                &ctx(),
            )
            .is_err());
    }
}
