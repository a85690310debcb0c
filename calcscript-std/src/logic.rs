//! Boolean functions, mounted as `logic.*`.
//!
//! These use the language's truthiness rule: false, 0, empty text, null
//! and empty containers are falsy, everything else is truthy.

use calcscript_core::{ArgMeta, CalcError, FnContext, FunctionMeta, FunctionPlugin, Value};

use crate::helpers::list_arg;

/// not(x)
pub struct Not;

static NOT_ARGS: [ArgMeta; 1] = [ArgMeta::required("x", "any", "Value to negate")];

impl FunctionPlugin for Not {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "not",
            namespace: "logic",
            usage: "not(x)",
            description: "Logical negation of truthiness",
            args: &NOT_ARGS,
            returns: "boolean",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("not", "1", args.len()));
        }
        Ok(Value::Bool(!args[0].truthy()))
    }
}

/// all(list) - empty list is vacuously true
pub struct All;

static LIST_ARGS: [ArgMeta; 1] = [ArgMeta::required("list", "list", "Values to test")];

impl FunctionPlugin for All {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "all",
            namespace: "logic",
            usage: "all(list)",
            description: "Whether every element is truthy",
            args: &LIST_ARGS,
            returns: "boolean",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("all", "1", args.len()));
        }
        let items = list_arg(args, 0, "all", "list")?;
        Ok(Value::Bool(items.iter().all(Value::truthy)))
    }
}

/// any(list) - empty list is false
pub struct Any;

impl FunctionPlugin for Any {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "any",
            namespace: "logic",
            usage: "any(list)",
            description: "Whether at least one element is truthy",
            args: &LIST_ARGS,
            returns: "boolean",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("any", "1", args.len()));
        }
        let items = list_arg(args, 0, "any", "list")?;
        Ok(Value::Bool(items.iter().any(Value::truthy)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> FnContext {
        FnContext::fixed()
    }

    #[test]
    fn test_not_follows_truthiness() {
        assert_eq!(Not.call(&[Value::Number(0.0)], &ctx()).unwrap(), Value::Bool(true));
        assert_eq!(Not.call(&[Value::from("x")], &ctx()).unwrap(), Value::Bool(false));
        assert_eq!(Not.call(&[Value::Null], &ctx()).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_all_and_any_on_empty() {
        let empty = Value::List(vec![]);
        assert_eq!(All.call(&[empty.clone()], &ctx()).unwrap(), Value::Bool(true));
        assert_eq!(Any.call(&[empty], &ctx()).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_all_and_any_mixed() {
        let mixed = Value::List(vec![Value::Bool(true), Value::Number(0.0)]);
        assert_eq!(All.call(&[mixed.clone()], &ctx()).unwrap(), Value::Bool(false));
        assert_eq!(Any.call(&[mixed], &ctx()).unwrap(), Value::Bool(true));
    }
}
