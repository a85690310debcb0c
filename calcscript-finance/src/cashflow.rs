//! Cash-flow kernels: npv and irr.

use calcscript_core::{number, ArgMeta, CalcError, FnContext, FunctionMeta, FunctionPlugin, Value};

use crate::helpers::{cashflows_arg, number_arg, validate_rate};

/// npv(rate, values) - net present value, first flow discounted one period
pub struct Npv;

static NPV_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("rate", "number", "Discount rate per period as a decimal"),
    ArgMeta::required("values", "list", "Cash flows, one per period"),
];

impl FunctionPlugin for Npv {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "npv",
            namespace: "finance",
            usage: "npv(rate, values)",
            description: "Net present value of a series of periodic cash flows",
            args: &NPV_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 2 {
            return Err(CalcError::arg_count("npv", "2", args.len()));
        }
        let rate = number_arg(args, 0, "npv", "rate")?;
        let values = cashflows_arg(args, 1, "npv", "values")?;
        validate_rate(rate, "npv")?;
        let result = discounted_sum(rate, &values)
            .ok_or_else(|| CalcError::not_finite("npv result"))?;
        Ok(Value::Number(result))
    }
}

/// irr(values) - internal rate of return
pub struct Irr;

static IRR_ARGS: [ArgMeta; 1] = [ArgMeta::required(
    "values",
    "list",
    "Cash flows with at least one inflow and one outflow",
)];

/// Candidate rates scanned, in order, for a sign-change bracket. Fixed so
/// every run of the same document lands on the same root.
const IRR_CANDIDATES: [f64; 20] = [
    -0.99, -0.9, -0.75, -0.5, -0.3, -0.2, -0.1, -0.05, 0.0, 0.05, 0.1, 0.2, 0.3, 0.5, 1.0, 2.0,
    5.0, 10.0, 100.0, 1000.0,
];

const IRR_TOLERANCE: f64 = 1e-12;
const IRR_MAX_BISECTIONS: usize = 200;

impl FunctionPlugin for Irr {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "irr",
            namespace: "finance",
            usage: "irr(values)",
            description: "Rate at which the net present value of the flows is zero",
            args: &IRR_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("irr", "1", args.len()));
        }
        let values = cashflows_arg(args, 0, "irr", "values")?;
        calculate_irr(&values).map(Value::Number)
    }
}

/// Present value of the flows at `rate`, or None when the arithmetic
/// leaves finite range (used as the scan predicate, so it must not error).
fn discounted_sum(rate: f64, values: &[f64]) -> Option<f64> {
    if rate <= -1.0 {
        return None;
    }
    let base = 1.0 + rate;
    let mut sum = 0.0;
    let mut discount = 1.0;
    for value in values {
        discount *= base;
        if !discount.is_finite() || discount == 0.0 {
            return None;
        }
        sum += value / discount;
    }
    sum.is_finite().then_some(sum)
}

pub fn calculate_irr(values: &[f64]) -> Result<f64, CalcError> {
    if values.len() < 2 {
        return Err(CalcError::domain(
            "irr needs at least two cash flows",
        ));
    }
    let has_positive = values.iter().any(|v| *v > 0.0);
    let has_negative = values.iter().any(|v| *v < 0.0);
    if !has_positive || !has_negative {
        return Err(CalcError::domain(
            "irr needs at least one positive and one negative cash flow",
        ));
    }

    // Scan fixed candidates for an exact zero or a sign-change bracket.
    let mut prev: Option<(f64, f64)> = None;
    let mut bracket = None;
    for rate in IRR_CANDIDATES {
        let Some(value) = discounted_sum(rate, values) else {
            prev = None;
            continue;
        };
        if value == 0.0 {
            return Ok(rate);
        }
        if let Some((lo, lo_value)) = prev {
            if lo_value * value < 0.0 {
                bracket = Some((lo, rate));
                break;
            }
        }
        prev = Some((rate, value));
    }
    let (mut lo, mut hi) =
        bracket.ok_or_else(|| CalcError::domain("irr could not find a root"))?;

    // Bisection: slower than Newton but insensitive to the curve's shape.
    for _ in 0..IRR_MAX_BISECTIONS {
        let mid = (lo + hi) / 2.0;
        let Some(mid_value) = discounted_sum(mid, values) else {
            return Err(CalcError::domain("irr could not find a root"));
        };
        if mid_value == 0.0 || (hi - lo) / 2.0 < IRR_TOLERANCE {
            return Ok(mid);
        }
        let lo_value = discounted_sum(lo, values)
            .ok_or_else(|| CalcError::domain("irr could not find a root"))?;
        if lo_value * mid_value < 0.0 {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    Ok((lo + hi) / 2.0)
}
