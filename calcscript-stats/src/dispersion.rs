//! Dispersion: sample variance and standard deviation.

use calcscript_core::{ArgMeta, CalcError, FnContext, FunctionMeta, FunctionPlugin, Value};

use crate::helpers::{numbers_arg, require_min, sample_variance};

static VALUES_ARG: [ArgMeta; 1] = [ArgMeta::required("values", "list", "Numbers to summarize")];

/// variance(values) - sample variance, n-1 divisor
pub struct Variance;

impl FunctionPlugin for Variance {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "variance",
            namespace: "stats",
            usage: "variance(values)",
            description: "Sample variance (n-1 divisor)",
            args: &VALUES_ARG,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("variance", "1", args.len()));
        }
        let values = numbers_arg(args, 0, "variance", "values")?;
        require_min("variance", 2, values.len())?;
        Ok(Value::Number(sample_variance(&values)))
    }
}

/// stdev(values) - sample standard deviation
pub struct Stdev;

impl FunctionPlugin for Stdev {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "stdev",
            namespace: "stats",
            usage: "stdev(values)",
            description: "Sample standard deviation (n-1 divisor)",
            args: &VALUES_ARG,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("stdev", "1", args.len()));
        }
        let values = numbers_arg(args, 0, "stdev", "values")?;
        require_min("stdev", 2, values.len())?;
        Ok(Value::Number(sample_variance(&values).sqrt()))
    }
}
