//! The annuity family: pmt, ipmt, ppmt, pv, fv.
//!
//! Sign convention follows the spreadsheet tradition: money you pay out is
//! negative, money you receive is positive. `type` is 0 for payments at
//! period end (default) and 1 for period start.

use calcscript_core::{number, ArgMeta, CalcError, FnContext, FunctionMeta, FunctionPlugin, Value};

use crate::helpers::{
    annuity_type_arg, compound_factor, number_arg, optional_number_arg, validate_nper,
    validate_rate,
};

/// pmt(rate, nper, pv, fv?, type?) - periodic payment of an annuity
pub struct Pmt;

static PMT_ARGS: [ArgMeta; 5] = [
    ArgMeta::required("rate", "number", "Per-period interest rate as a decimal"),
    ArgMeta::required("nper", "number", "Number of payment periods"),
    ArgMeta::required("pv", "number", "Present value (loan principal)"),
    ArgMeta::optional("fv", "number", "Future value after the last payment (default 0)"),
    ArgMeta::optional("type", "number", "0 = end of period, 1 = beginning (default 0)"),
];

impl FunctionPlugin for Pmt {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "pmt",
            namespace: "finance",
            usage: "pmt(rate, nper, pv, fv?, type?)",
            description: "Constant periodic payment that amortizes a present value",
            args: &PMT_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() < 3 || args.len() > 5 {
            return Err(CalcError::arg_count("pmt", "3 to 5", args.len()));
        }
        let rate = number_arg(args, 0, "pmt", "rate")?;
        let nper = number_arg(args, 1, "pmt", "nper")?;
        let pv = number_arg(args, 2, "pmt", "pv")?;
        let fv = optional_number_arg(args, 3, 0.0, "pmt", "fv")?;
        let when = annuity_type_arg(args, 4, "pmt")?;
        calculate_pmt(rate, nper, pv, fv, when).map(Value::Number)
    }
}

/// ipmt(rate, per, nper, pv, fv?, type?) - interest portion of one payment
pub struct Ipmt;

static IPMT_ARGS: [ArgMeta; 6] = [
    ArgMeta::required("rate", "number", "Per-period interest rate as a decimal"),
    ArgMeta::required("per", "number", "Period to inspect, 1-based"),
    ArgMeta::required("nper", "number", "Number of payment periods"),
    ArgMeta::required("pv", "number", "Present value (loan principal)"),
    ArgMeta::optional("fv", "number", "Future value after the last payment (default 0)"),
    ArgMeta::optional("type", "number", "0 = end of period, 1 = beginning (default 0)"),
];

impl FunctionPlugin for Ipmt {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "ipmt",
            namespace: "finance",
            usage: "ipmt(rate, per, nper, pv, fv?, type?)",
            description: "Interest portion of the payment in a given period",
            args: &IPMT_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        let (interest, _) = split_payment("ipmt", args)?;
        Ok(Value::Number(interest))
    }
}

/// ppmt(rate, per, nper, pv, fv?, type?) - principal portion of one payment
pub struct Ppmt;

impl FunctionPlugin for Ppmt {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "ppmt",
            namespace: "finance",
            usage: "ppmt(rate, per, nper, pv, fv?, type?)",
            description: "Principal portion of the payment in a given period",
            args: &IPMT_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        let (_, principal) = split_payment("ppmt", args)?;
        Ok(Value::Number(principal))
    }
}

/// pv(rate, nper, pmt, fv?, type?) - present value of an annuity
pub struct Pv;

static PV_ARGS: [ArgMeta; 5] = [
    ArgMeta::required("rate", "number", "Per-period interest rate as a decimal"),
    ArgMeta::required("nper", "number", "Number of payment periods"),
    ArgMeta::required("pmt", "number", "Payment made each period"),
    ArgMeta::optional("fv", "number", "Future value after the last payment (default 0)"),
    ArgMeta::optional("type", "number", "0 = end of period, 1 = beginning (default 0)"),
];

impl FunctionPlugin for Pv {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "pv",
            namespace: "finance",
            usage: "pv(rate, nper, pmt, fv?, type?)",
            description: "Present value of a series of constant payments",
            args: &PV_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() < 3 || args.len() > 5 {
            return Err(CalcError::arg_count("pv", "3 to 5", args.len()));
        }
        let rate = number_arg(args, 0, "pv", "rate")?;
        let nper = number_arg(args, 1, "pv", "nper")?;
        let pmt = number_arg(args, 2, "pv", "pmt")?;
        let fv = optional_number_arg(args, 3, 0.0, "pv", "fv")?;
        let when = annuity_type_arg(args, 4, "pv")?;
        validate_rate(rate, "pv")?;
        validate_nper(nper, "pv")?;

        let result = if rate == 0.0 {
            -(pmt * nper + fv)
        } else {
            let factor = compound_factor(rate, nper, "pv")?;
            -(fv + pmt * (1.0 + rate * when) * (factor - 1.0) / rate) / factor
        };
        number::ensure_finite(result, "pv result").map(Value::Number)
    }
}

/// fv(rate, nper, pmt, pv?, type?) - future value of an annuity
pub struct Fv;

static FV_ARGS: [ArgMeta; 5] = [
    ArgMeta::required("rate", "number", "Per-period interest rate as a decimal"),
    ArgMeta::required("nper", "number", "Number of payment periods"),
    ArgMeta::required("pmt", "number", "Payment made each period"),
    ArgMeta::optional("pv", "number", "Present value (default 0)"),
    ArgMeta::optional("type", "number", "0 = end of period, 1 = beginning (default 0)"),
];

impl FunctionPlugin for Fv {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "fv",
            namespace: "finance",
            usage: "fv(rate, nper, pmt, pv?, type?)",
            description: "Future value of a series of constant payments",
            args: &FV_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() < 3 || args.len() > 5 {
            return Err(CalcError::arg_count("fv", "3 to 5", args.len()));
        }
        let rate = number_arg(args, 0, "fv", "rate")?;
        let nper = number_arg(args, 1, "fv", "nper")?;
        let pmt = number_arg(args, 2, "fv", "pmt")?;
        let pv = optional_number_arg(args, 3, 0.0, "fv", "pv")?;
        let when = annuity_type_arg(args, 4, "fv")?;
        validate_rate(rate, "fv")?;
        validate_nper(nper, "fv")?;

        let result = if rate == 0.0 {
            -(pv + pmt * nper)
        } else {
            let factor = compound_factor(rate, nper, "fv")?;
            -(pv * factor + pmt * (1.0 + rate * when) * (factor - 1.0) / rate)
        };
        number::ensure_finite(result, "fv result").map(Value::Number)
    }
}

/// The closed-form payment.
pub fn calculate_pmt(rate: f64, nper: f64, pv: f64, fv: f64, when: f64) -> Result<f64, CalcError> {
    validate_rate(rate, "pmt")?;
    validate_nper(nper, "pmt")?;

    let pmt = if rate == 0.0 {
        -(pv + fv) / nper
    } else {
        let factor = compound_factor(rate, nper, "pmt")?;
        -(pv * factor + fv) * rate / ((factor - 1.0) * (1.0 + rate * when))
    };
    number::ensure_finite(pmt, "pmt result")
}

/// Shared ipmt/ppmt argument handling plus the balance walk.
fn split_payment(func: &str, args: &[Value]) -> Result<(f64, f64), CalcError> {
    if args.len() < 4 || args.len() > 6 {
        return Err(CalcError::arg_count(func, "4 to 6", args.len()));
    }
    let rate = number_arg(args, 0, func, "rate")?;
    let per = number_arg(args, 1, func, "per")?;
    let nper = number_arg(args, 2, func, "nper")?;
    let pv = number_arg(args, 3, func, "pv")?;
    let fv = optional_number_arg(args, 4, 0.0, func, "fv")?;
    let when = annuity_type_arg(args, 5, func)?;

    let per_int = match number::as_exact_int(per) {
        Some(p) if p >= 1 && (p as f64) <= nper => p,
        _ => {
            return Err(CalcError::domain(format!(
                "{}: per must be an integer between 1 and nper, got {}",
                func, per
            )))
        }
    };

    let payment = calculate_pmt(rate, nper, pv, fv, when)?;

    // Walk the balance forward to the requested period. With payments at
    // the beginning of the period the first payment carries no interest.
    let mut balance = pv;
    let mut interest = 0.0;
    let mut principal = payment;
    for p in 1..=per_int {
        interest = if when == 1.0 && p == 1 {
            0.0
        } else {
            -(balance * rate)
        };
        principal = payment - interest;
        balance += principal;
    }
    Ok((
        number::ensure_finite(interest, "interest portion")?,
        number::ensure_finite(principal, "principal portion")?,
    ))
}
