//! Paired-series statistics: covariance and correlation.

use calcscript_core::{number, ArgMeta, CalcError, FnContext, FunctionMeta, FunctionPlugin, Value};

use crate::helpers::{mean_of, paired_lists_arg, require_min, sample_variance};

static PAIRED_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("xs", "list", "First series"),
    ArgMeta::required("ys", "list", "Second series, same length"),
];

/// Sample covariance (n-1 divisor). Caller guarantees equal lengths >= 2.
pub fn covariance_of(xs: &[f64], ys: &[f64]) -> f64 {
    let mx = mean_of(xs);
    let my = mean_of(ys);
    xs.iter()
        .zip(ys)
        .map(|(x, y)| (x - mx) * (y - my))
        .sum::<f64>()
        / (xs.len() - 1) as f64
}

/// covariance(xs, ys)
pub struct Covariance;

impl FunctionPlugin for Covariance {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "covariance",
            namespace: "stats",
            usage: "covariance(xs, ys)",
            description: "Sample covariance of two equally long series",
            args: &PAIRED_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        let (xs, ys) = paired_lists_arg(args, "covariance")?;
        require_min("covariance", 2, xs.len())?;
        Ok(Value::Number(covariance_of(&xs, &ys)))
    }
}

/// correlation(xs, ys) - Pearson's r
pub struct Correlation;

impl FunctionPlugin for Correlation {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "correlation",
            namespace: "stats",
            usage: "correlation(xs, ys)",
            description: "Pearson correlation coefficient",
            args: &PAIRED_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        let (xs, ys) = paired_lists_arg(args, "correlation")?;
        require_min("correlation", 2, xs.len())?;
        let var_x = sample_variance(&xs);
        let var_y = sample_variance(&ys);
        if var_x < number::NEAR_ZERO || var_y < number::NEAR_ZERO {
            return Err(CalcError::domain(
                "correlation is undefined when a series has near-zero variance",
            ));
        }
        let r = covariance_of(&xs, &ys) / (var_x.sqrt() * var_y.sqrt());
        Ok(Value::Number(r.clamp(-1.0, 1.0)))
    }
}
