//! Shared extraction and arithmetic for the stats kernels.

use calcscript_core::{number, CalcError, Value};

/// Extract a list of finite numbers. Nulls are rejected with their
/// position; clean data first with `data.fillNull`/`data.dropNull`.
pub fn numbers_arg(
    args: &[Value],
    index: usize,
    func: &str,
    name: &str,
) -> Result<Vec<f64>, CalcError> {
    let list = match args.get(index) {
        Some(Value::List(items)) => items,
        Some(other) => {
            return Err(CalcError::arg_type(
                func,
                name,
                "list of numbers",
                other.type_name(),
            ))
        }
        None => {
            return Err(CalcError::eval(format!(
                "{} is missing required argument '{}'",
                func, name
            )))
        }
    };
    let mut numbers = Vec::with_capacity(list.len());
    for (i, item) in list.iter().enumerate() {
        match item {
            Value::Number(n) => numbers.push(number::ensure_finite(*n, name)?),
            other => {
                return Err(CalcError::eval(format!(
                    "{} argument '{}'[{}]: expected number, got {}",
                    func,
                    name,
                    i,
                    other.type_name()
                )))
            }
        }
    }
    Ok(numbers)
}

/// Extract two equally long number lists (xs, ys).
pub fn paired_lists_arg(args: &[Value], func: &str) -> Result<(Vec<f64>, Vec<f64>), CalcError> {
    if args.len() != 2 {
        return Err(CalcError::arg_count(func, "2", args.len()));
    }
    let xs = numbers_arg(args, 0, func, "xs")?;
    let ys = numbers_arg(args, 1, func, "ys")?;
    if xs.len() != ys.len() {
        return Err(CalcError::domain(format!(
            "{}: xs and ys must have the same length ({} vs {})",
            func,
            xs.len(),
            ys.len()
        )));
    }
    Ok((xs, ys))
}

pub fn require_min(func: &str, min: usize, got: usize) -> Result<(), CalcError> {
    if got < min {
        return Err(CalcError::domain(format!(
            "{} needs at least {} values, got {}",
            func, min, got
        )));
    }
    Ok(())
}

pub fn mean_of(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n-1 divisor). Caller guarantees len >= 2.
pub fn sample_variance(values: &[f64]) -> f64 {
    let m = mean_of(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64
}
