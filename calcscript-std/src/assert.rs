//! In-document assertions, mounted as `assert.*`.
//!
//! A failing assertion errors the node that called it; the rest of the
//! document still evaluates. A passing one returns true so assertion
//! nodes read as green checkmarks in the output.

use calcscript_core::{number, ArgMeta, CalcError, FnContext, FunctionMeta, FunctionPlugin, Value};

use crate::helpers::{number_arg, optional_number_arg};

const DEFAULT_TOLERANCE: f64 = 1e-9;

fn optional_message(args: &[Value], index: usize, func: &str) -> Result<Option<String>, CalcError> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Text(s)) => Ok(Some(s.clone())),
        Some(other) => Err(CalcError::arg_type(func, "msg", "string", other.type_name())),
    }
}

/// that(cond, msg?)
pub struct That;

static THAT_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("cond", "any", "Must be truthy"),
    ArgMeta::optional("msg", "string", "Failure message"),
];

impl FunctionPlugin for That {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "that",
            namespace: "assert",
            usage: "that(cond, msg?)",
            description: "Fail unless the condition is truthy",
            args: &THAT_ARGS,
            returns: "boolean",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.is_empty() || args.len() > 2 {
            return Err(CalcError::arg_count("that", "1 or 2", args.len()));
        }
        if args[0].truthy() {
            return Ok(Value::Bool(true));
        }
        let message = optional_message(args, 1, "that")?
            .unwrap_or_else(|| "assertion failed".to_string());
        Err(CalcError::eval(message))
    }
}

/// equal(a, b, msg?) - structural equality
pub struct Equal;

static EQUAL_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("a", "any", "Left value"),
    ArgMeta::required("b", "any", "Right value"),
    ArgMeta::optional("msg", "string", "Failure message"),
];

impl FunctionPlugin for Equal {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "equal",
            namespace: "assert",
            usage: "equal(a, b, msg?)",
            description: "Fail unless the two values are structurally equal",
            args: &EQUAL_ARGS,
            returns: "boolean",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() < 2 || args.len() > 3 {
            return Err(CalcError::arg_count("equal", "2 or 3", args.len()));
        }
        if args[0] == args[1] {
            return Ok(Value::Bool(true));
        }
        let detail = format!("{} vs {}", args[0], args[1]);
        let message = match optional_message(args, 2, "equal")? {
            Some(msg) => format!("{}: {}", msg, detail),
            None => format!("assert.equal failed: {}", detail),
        };
        Err(CalcError::eval(message))
    }
}

/// near(a, b, tol?) - absolute difference, default tolerance 1e-9
pub struct Near;

static NEAR_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("a", "number", "Left value"),
    ArgMeta::required("b", "number", "Right value"),
    ArgMeta::optional("tol", "number", "Absolute tolerance (default 1e-9)"),
];

impl FunctionPlugin for Near {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "near",
            namespace: "assert",
            usage: "near(a, b, tol?)",
            description: "Fail unless two numbers agree within a tolerance",
            args: &NEAR_ARGS,
            returns: "boolean",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() < 2 || args.len() > 3 {
            return Err(CalcError::arg_count("near", "2 or 3", args.len()));
        }
        let a = number_arg(args, 0, "near", "a")?;
        let b = number_arg(args, 1, "near", "b")?;
        let tol = optional_number_arg(args, 2, "near", "tol", DEFAULT_TOLERANCE)?;
        if tol < 0.0 {
            return Err(CalcError::domain("near: tolerance must not be negative"));
        }
        if number::approx_eq(a, b, tol) {
            Ok(Value::Bool(true))
        } else {
            Err(CalcError::eval(format!(
                "assert.near failed: {} and {} differ by {} (tolerance {})",
                a,
                b,
                (a - b).abs(),
                tol
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> FnContext {
        FnContext::fixed()
    }

    #[test]
    fn test_that_passes_and_fails() {
        assert_eq!(
            That.call(&[Value::Bool(true)], &ctx()).unwrap(),
            Value::Bool(true)
        );
        let err = That
            .call(&[Value::Number(0.0), Value::from("budget blown")], &ctx())
            .unwrap_err();
        assert_eq!(err.message, "budget blown");
    }

    #[test]
    fn test_equal_structural() {
        let a = Value::List(vec![Value::Number(1.0)]);
        let b = Value::List(vec![Value::Number(1.0)]);
        assert_eq!(Equal.call(&[a, b], &ctx()).unwrap(), Value::Bool(true));
        let err = Equal
            .call(&[Value::Number(1.0), Value::from("1")], &ctx())
            .unwrap_err();
        assert!(err.message.contains("1 vs 1"));
    }

    #[test]
    fn test_near_default_and_custom_tolerance() {
        assert!(Near
            .call(&[Value::Number(0.1 + 0.2), Value::Number(0.3)], &ctx())
            .is_ok());
        assert!(Near
            .call(&[Value::Number(1.0), Value::Number(1.01)], &ctx())
            .is_err());
        assert!(Near
            .call(
                &[Value::Number(1.0), Value::Number(1.01), Value::Number(0.1)],
                &ctx(),
            )
            .is_ok());
    }
}
