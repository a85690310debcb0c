//! Null handling, mounted as `data.*`.
//!
//! The `??` operator deliberately refuses list operands; these functions
//! are the vectorized counterpart for cleaning nullable table columns
//! before they reach strict kernels like `stats.*` or `finance.*`.

use calcscript_core::{ArgMeta, CalcError, FnContext, FunctionMeta, FunctionPlugin, Value};

use crate::helpers::list_arg;

/// coalesce(...) - first non-null argument, or null when all are
pub struct Coalesce;

static COALESCE_ARGS: [ArgMeta; 1] = [ArgMeta::required(
    "values",
    "any...",
    "Candidates, tried left to right",
)];

impl FunctionPlugin for Coalesce {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "coalesce",
            namespace: "data",
            usage: "coalesce(values...)",
            description: "First non-null argument",
            args: &COALESCE_ARGS,
            returns: "any",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.is_empty() {
            return Err(CalcError::arg_count("coalesce", "at least 1", 0));
        }
        Ok(args
            .iter()
            .find(|v| !v.is_null())
            .cloned()
            .unwrap_or(Value::Null))
    }
}

/// fillNull(list, repl)
pub struct FillNull;

static FILL_NULL_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("list", "list", "Input list"),
    ArgMeta::required("repl", "any", "Replacement for null elements"),
];

impl FunctionPlugin for FillNull {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "fillNull",
            namespace: "data",
            usage: "fillNull(list, repl)",
            description: "Replace null elements with a value",
            args: &FILL_NULL_ARGS,
            returns: "list",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 2 {
            return Err(CalcError::arg_count("fillNull", "2", args.len()));
        }
        let items = list_arg(args, 0, "fillNull", "list")?;
        let repl = &args[1];
        Ok(Value::List(
            items
                .iter()
                .map(|v| if v.is_null() { repl.clone() } else { v.clone() })
                .collect(),
        ))
    }
}

/// dropNull(list)
pub struct DropNull;

static LIST_ARGS: [ArgMeta; 1] = [ArgMeta::required("list", "list", "Input list")];

impl FunctionPlugin for DropNull {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "dropNull",
            namespace: "data",
            usage: "dropNull(list)",
            description: "Remove null elements",
            args: &LIST_ARGS,
            returns: "list",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("dropNull", "1", args.len()));
        }
        let items = list_arg(args, 0, "dropNull", "list")?;
        Ok(Value::List(
            items.iter().filter(|v| !v.is_null()).cloned().collect(),
        ))
    }
}

/// isNull(x)
pub struct IsNull;

static IS_NULL_ARGS: [ArgMeta; 1] = [ArgMeta::required("x", "any", "Value to test")];

impl FunctionPlugin for IsNull {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "isNull",
            namespace: "data",
            usage: "isNull(x)",
            description: "Whether the value is null",
            args: &IS_NULL_ARGS,
            returns: "boolean",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("isNull", "1", args.len()));
        }
        Ok(Value::Bool(args[0].is_null()))
    }
}

/// count(list) - non-null elements only
pub struct Count;

impl FunctionPlugin for Count {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "count",
            namespace: "data",
            usage: "count(list)",
            description: "Number of non-null elements",
            args: &LIST_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("count", "1", args.len()));
        }
        let items = list_arg(args, 0, "count", "list")?;
        Ok(Value::Number(
            items.iter().filter(|v| !v.is_null()).count() as f64,
        ))
    }
}
