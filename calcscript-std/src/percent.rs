//! Percentage arithmetic, mounted as `percent.*`.
//!
//! Percent values are plain numbers on a 0..100 scale; these helpers
//! convert between that scale and ratios and compute relative change.

use calcscript_core::{number, ArgMeta, CalcError, FnContext, FunctionMeta, FunctionPlugin, Value};

use crate::helpers::number_arg;

/// of(p, base) = base * p / 100
pub struct Of;

static OF_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("p", "percent", "Percentage on the 0..100 scale"),
    ArgMeta::required("base", "number", "Value to take the percentage of"),
];

impl FunctionPlugin for Of {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "of",
            namespace: "percent",
            usage: "of(p, base)",
            description: "p percent of base",
            args: &OF_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 2 {
            return Err(CalcError::arg_count("of", "2", args.len()));
        }
        let p = number_arg(args, 0, "of", "p")?;
        let base = number_arg(args, 1, "of", "base")?;
        number::ensure_finite(base * p / 100.0, "of").map(Value::Number)
    }
}

/// ratio(p) = p / 100
pub struct Ratio;

static RATIO_ARGS: [ArgMeta; 1] =
    [ArgMeta::required("p", "percent", "Percentage on the 0..100 scale")];

impl FunctionPlugin for Ratio {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "ratio",
            namespace: "percent",
            usage: "ratio(p)",
            description: "Percentage as a 0..1 ratio",
            args: &RATIO_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("ratio", "1", args.len()));
        }
        Ok(Value::Number(number_arg(args, 0, "ratio", "p")? / 100.0))
    }
}

/// fromRatio(r) = 100 * r
pub struct FromRatio;

static FROM_RATIO_ARGS: [ArgMeta; 1] =
    [ArgMeta::required("r", "number", "Ratio on the 0..1 scale")];

impl FunctionPlugin for FromRatio {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "fromRatio",
            namespace: "percent",
            usage: "fromRatio(r)",
            description: "Ratio as a percentage",
            args: &FROM_RATIO_ARGS,
            returns: "percent",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("fromRatio", "1", args.len()));
        }
        let r = number_arg(args, 0, "fromRatio", "r")?;
        number::ensure_finite(100.0 * r, "fromRatio").map(Value::Number)
    }
}

/// change(old, new) - percent change from old to new
pub struct Change;

static CHANGE_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("old", "number", "Reference value, non-zero"),
    ArgMeta::required("new", "number", "New value"),
];

impl FunctionPlugin for Change {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "change",
            namespace: "percent",
            usage: "change(old, new)",
            description: "Relative change as a percentage of the old value",
            args: &CHANGE_ARGS,
            returns: "percent",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 2 {
            return Err(CalcError::arg_count("change", "2", args.len()));
        }
        let old = number_arg(args, 0, "change", "old")?;
        let new = number_arg(args, 1, "change", "new")?;
        if old == 0.0 {
            return Err(CalcError::domain("change: old value is zero"));
        }
        number::ensure_finite((new - old) / old * 100.0, "change").map(Value::Number)
    }
}
