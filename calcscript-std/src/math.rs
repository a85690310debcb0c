//! Core numeric functions, mounted as `math.*`.

use calcscript_core::{number, ArgMeta, CalcError, FnContext, FunctionMeta, FunctionPlugin, Value};

use crate::helpers::{number_arg, numbers_varargs};

/// abs(x)
pub struct Abs;

static ABS_ARGS: [ArgMeta; 1] = [ArgMeta::required("x", "number", "Value to take magnitude of")];

impl FunctionPlugin for Abs {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "abs",
            namespace: "math",
            usage: "abs(x)",
            description: "Absolute value",
            args: &ABS_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("abs", "1", args.len()));
        }
        Ok(Value::Number(number_arg(args, 0, "abs", "x")?.abs()))
    }
}

/// round(x, digits?) - half-away-from-zero, default 0 digits
pub struct Round;

static ROUND_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("x", "number", "Value to round"),
    ArgMeta::optional("digits", "integer", "Decimal digits; negative rounds to tens, hundreds"),
];

impl FunctionPlugin for Round {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "round",
            namespace: "math",
            usage: "round(x, digits?)",
            description: "Round to a number of decimal digits (default 0)",
            args: &ROUND_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.is_empty() || args.len() > 2 {
            return Err(CalcError::arg_count("round", "1 or 2", args.len()));
        }
        let x = number_arg(args, 0, "round", "x")?;
        let digits = match args.get(1) {
            None | Some(Value::Null) => 0,
            Some(Value::Number(n)) => number::as_exact_int(*n)
                .and_then(|d| i32::try_from(d).ok())
                .ok_or_else(|| {
                    CalcError::eval(format!("round: digits must be an integer, got {}", n))
                })?,
            Some(other) => {
                return Err(CalcError::arg_type(
                    "round",
                    "digits",
                    "integer",
                    other.type_name(),
                ))
            }
        };
        number::ensure_finite(number::round_to_digits(x, digits), "round").map(Value::Number)
    }
}

/// floor(x)
pub struct Floor;

static FLOOR_ARGS: [ArgMeta; 1] = [ArgMeta::required("x", "number", "Value to round down")];

impl FunctionPlugin for Floor {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "floor",
            namespace: "math",
            usage: "floor(x)",
            description: "Largest integer not above x",
            args: &FLOOR_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("floor", "1", args.len()));
        }
        Ok(Value::Number(number_arg(args, 0, "floor", "x")?.floor()))
    }
}

/// ceil(x)
pub struct Ceil;

static CEIL_ARGS: [ArgMeta; 1] = [ArgMeta::required("x", "number", "Value to round up")];

impl FunctionPlugin for Ceil {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "ceil",
            namespace: "math",
            usage: "ceil(x)",
            description: "Smallest integer not below x",
            args: &CEIL_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("ceil", "1", args.len()));
        }
        Ok(Value::Number(number_arg(args, 0, "ceil", "x")?.ceil()))
    }
}

/// sqrt(x) - errors on negative input
pub struct Sqrt;

static SQRT_ARGS: [ArgMeta; 1] = [ArgMeta::required("x", "number", "Non-negative value")];

impl FunctionPlugin for Sqrt {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "sqrt",
            namespace: "math",
            usage: "sqrt(x)",
            description: "Square root; negative input is an error",
            args: &SQRT_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("sqrt", "1", args.len()));
        }
        let x = number_arg(args, 0, "sqrt", "x")?;
        if x < 0.0 {
            return Err(CalcError::domain(format!("sqrt of a negative number ({})", x)));
        }
        Ok(Value::Number(x.sqrt()))
    }
}

/// min(...) - varargs or one list
pub struct Min;

static AGGREGATE_ARGS: [ArgMeta; 1] = [ArgMeta::required(
    "values",
    "number... | list",
    "Numbers, spelled out or as one list",
)];

impl FunctionPlugin for Min {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "min",
            namespace: "math",
            usage: "min(values...)",
            description: "Smallest of the given numbers",
            args: &AGGREGATE_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        let values = numbers_varargs(args, "min")?;
        values
            .into_iter()
            .reduce(f64::min)
            .map(Value::Number)
            .ok_or_else(|| CalcError::domain("min needs at least one value"))
    }
}

/// max(...) - varargs or one list
pub struct Max;

impl FunctionPlugin for Max {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "max",
            namespace: "math",
            usage: "max(values...)",
            description: "Largest of the given numbers",
            args: &AGGREGATE_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        let values = numbers_varargs(args, "max")?;
        values
            .into_iter()
            .reduce(f64::max)
            .map(Value::Number)
            .ok_or_else(|| CalcError::domain("max needs at least one value"))
    }
}

/// sum(...) - varargs or one list; empty sums to 0
pub struct Sum;

impl FunctionPlugin for Sum {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "sum",
            namespace: "math",
            usage: "sum(values...)",
            description: "Sum of the given numbers; empty input sums to 0",
            args: &AGGREGATE_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        let values = numbers_varargs(args, "sum")?;
        number::ensure_finite(values.iter().sum(), "sum").map(Value::Number)
    }
}

/// clamp(x, lo, hi)
pub struct Clamp;

static CLAMP_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("x", "number", "Value to clamp"),
    ArgMeta::required("lo", "number", "Lower bound"),
    ArgMeta::required("hi", "number", "Upper bound"),
];

impl FunctionPlugin for Clamp {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "clamp",
            namespace: "math",
            usage: "clamp(x, lo, hi)",
            description: "Constrain x to [lo, hi]",
            args: &CLAMP_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 3 {
            return Err(CalcError::arg_count("clamp", "3", args.len()));
        }
        let x = number_arg(args, 0, "clamp", "x")?;
        let lo = number_arg(args, 1, "clamp", "lo")?;
        let hi = number_arg(args, 2, "clamp", "hi")?;
        if lo > hi {
            return Err(CalcError::domain(format!(
                "clamp: lo ({}) is greater than hi ({})",
                lo, hi
            )));
        }
        Ok(Value::Number(x.min(hi).max(lo)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> FnContext {
        FnContext::fixed()
    }

    #[test]
    fn test_round_defaults_and_digits() {
        let r = Round.call(&[Value::Number(2.5)], &ctx()).unwrap();
        assert_eq!(r, Value::Number(3.0));
        let r = Round
            .call(&[Value::Number(2.678), Value::Number(2.0)], &ctx())
            .unwrap();
        assert_eq!(r, Value::Number(2.68));
        let r = Round
            .call(&[Value::Number(1234.5), Value::Number(-2.0)], &ctx())
            .unwrap();
        assert_eq!(r, Value::Number(1200.0));
        assert!(Round
            .call(&[Value::Number(1.0), Value::Number(0.5)], &ctx())
            .is_err());
    }

    #[test]
    fn test_sqrt_rejects_negative() {
        assert_eq!(
            Sqrt.call(&[Value::Number(9.0)], &ctx()).unwrap(),
            Value::Number(3.0)
        );
        let err = Sqrt.call(&[Value::Number(-1.0)], &ctx()).unwrap_err();
        assert!(err.message.contains("negative"));
    }

    #[test]
    fn test_aggregates_take_varargs_or_list() {
        let bare = [Value::Number(3.0), Value::Number(1.0), Value::Number(2.0)];
        assert_eq!(Min.call(&bare, &ctx()).unwrap(), Value::Number(1.0));
        assert_eq!(Max.call(&bare, &ctx()).unwrap(), Value::Number(3.0));
        let as_list = [Value::List(bare.to_vec())];
        assert_eq!(Sum.call(&as_list, &ctx()).unwrap(), Value::Number(6.0));
    }

    #[test]
    fn test_min_rejects_empty_sum_allows_it() {
        assert!(Min.call(&[Value::List(vec![])], &ctx()).is_err());
        assert_eq!(
            Sum.call(&[Value::List(vec![])], &ctx()).unwrap(),
            Value::Number(0.0)
        );
    }

    #[test]
    fn test_clamp_bounds_check() {
        let r = Clamp
            .call(
                &[Value::Number(15.0), Value::Number(0.0), Value::Number(10.0)],
                &ctx(),
            )
            .unwrap();
        assert_eq!(r, Value::Number(10.0));
        assert!(Clamp
            .call(
                &[Value::Number(1.0), Value::Number(5.0), Value::Number(0.0)],
                &ctx(),
            )
            .is_err());
    }
}
