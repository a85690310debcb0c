//! Central tendency: mean and median.

use calcscript_core::{ArgMeta, CalcError, FnContext, FunctionMeta, FunctionPlugin, Value};

use crate::helpers::{mean_of, numbers_arg, require_min};

static VALUES_ARG: [ArgMeta; 1] = [ArgMeta::required("values", "list", "Numbers to summarize")];

/// mean(values)
pub struct Mean;

impl FunctionPlugin for Mean {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "mean",
            namespace: "stats",
            usage: "mean(values)",
            description: "Arithmetic mean",
            args: &VALUES_ARG,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("mean", "1", args.len()));
        }
        let values = numbers_arg(args, 0, "mean", "values")?;
        require_min("mean", 1, values.len())?;
        Ok(Value::Number(mean_of(&values)))
    }
}

/// median(values) - middle value, averaging the two middles on even counts
pub struct Median;

impl FunctionPlugin for Median {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "median",
            namespace: "stats",
            usage: "median(values)",
            description: "Middle value; the mean of the two middles for even counts",
            args: &VALUES_ARG,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("median", "1", args.len()));
        }
        let mut values = numbers_arg(args, 0, "median", "values")?;
        require_min("median", 1, values.len())?;
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let n = values.len();
        let median = if n % 2 == 1 {
            values[n / 2]
        } else {
            (values[n / 2 - 1] + values[n / 2]) / 2.0
        };
        Ok(Value::Number(median))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(values: &[f64]) -> Value {
        Value::List(values.iter().map(|v| Value::Number(*v)).collect())
    }

    #[test]
    fn test_mean() {
        let out = Mean.call(&[list(&[1.0, 2.0, 3.0, 4.0])], &FnContext::fixed()).unwrap();
        assert_eq!(out, Value::Number(2.5));
    }

    #[test]
    fn test_median_odd_and_even() {
        let ctx = FnContext::fixed();
        assert_eq!(
            Median.call(&[list(&[3.0, 1.0, 2.0])], &ctx).unwrap(),
            Value::Number(2.0)
        );
        assert_eq!(
            Median.call(&[list(&[4.0, 1.0, 3.0, 2.0])], &ctx).unwrap(),
            Value::Number(2.5)
        );
    }

    #[test]
    fn test_empty_rejected() {
        let ctx = FnContext::fixed();
        assert!(Mean.call(&[list(&[])], &ctx).is_err());
        assert!(Median.call(&[list(&[])], &ctx).is_err());
    }
}
