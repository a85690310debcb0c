//! Common financial argument handling.

use calcscript_core::{number, CalcError, Value};

/// Extract a required finite number argument.
pub fn number_arg(args: &[Value], index: usize, func: &str, name: &str) -> Result<f64, CalcError> {
    match args.get(index) {
        Some(Value::Number(n)) => number::ensure_finite(*n, name),
        Some(other) => Err(CalcError::arg_type(func, name, "number", other.type_name())),
        None => Err(CalcError::eval(format!(
            "{} is missing required argument '{}'",
            func, name
        ))),
    }
}

/// Extract an optional number argument; missing or null falls back.
pub fn optional_number_arg(
    args: &[Value],
    index: usize,
    default: f64,
    func: &str,
    name: &str,
) -> Result<f64, CalcError> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => number::ensure_finite(*n, name),
        Some(other) => Err(CalcError::arg_type(func, name, "number", other.type_name())),
    }
}

/// Extract a cash-flow list: finite numbers only, nulls are rejected with
/// their position (use `data.fillNull`/`data.dropNull` to clean first).
pub fn cashflows_arg(
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
    let mut flows = Vec::with_capacity(list.len());
    for (i, item) in list.iter().enumerate() {
        match item {
            Value::Number(n) => flows.push(number::ensure_finite(*n, name)?),
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
    Ok(flows)
}

/// The `type` argument of the annuity family: 0 (end of period, default)
/// or 1 (beginning of period).
pub fn annuity_type_arg(args: &[Value], index: usize, func: &str) -> Result<f64, CalcError> {
    let when = optional_number_arg(args, index, 0.0, func, "type")?;
    if when == 0.0 || when == 1.0 {
        Ok(when)
    } else {
        Err(CalcError::domain(format!(
            "{} argument 'type' must be 0 or 1, got {}",
            func, when
        )))
    }
}

/// Rates below -100% have no meaning for compounding.
pub fn validate_rate(rate: f64, func: &str) -> Result<(), CalcError> {
    if rate <= -1.0 {
        return Err(CalcError::domain(format!(
            "{}: rate must be greater than -1, got {}",
            func, rate
        )));
    }
    Ok(())
}

pub fn validate_nper(nper: f64, func: &str) -> Result<(), CalcError> {
    if nper <= 0.0 {
        return Err(CalcError::domain(format!(
            "{}: nper must be positive, got {}",
            func, nper
        )));
    }
    Ok(())
}

/// `(1 + rate)^nper`, failing on overflow rather than returning infinity.
pub fn compound_factor(rate: f64, nper: f64, func: &str) -> Result<f64, CalcError> {
    number::ensure_finite((1.0 + rate).powf(nper), &format!("{} compound factor", func))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_arg() {
        let args = vec![Value::Number(42.0)];
        assert_eq!(number_arg(&args, 0, "f", "x").unwrap(), 42.0);
        assert!(number_arg(&args, 1, "f", "y").is_err());
        assert!(number_arg(&[Value::Null], 0, "f", "x").is_err());
    }

    #[test]
    fn test_optional_number_arg_defaults() {
        assert_eq!(optional_number_arg(&[], 0, 7.0, "f", "x").unwrap(), 7.0);
        assert_eq!(
            optional_number_arg(&[Value::Null], 0, 7.0, "f", "x").unwrap(),
            7.0
        );
        assert!(optional_number_arg(&[Value::from("no")], 0, 7.0, "f", "x").is_err());
    }

    #[test]
    fn test_cashflows_reject_nulls_with_position() {
        let args = vec![Value::List(vec![
            Value::Number(1.0),
            Value::Null,
        ])];
        let err = cashflows_arg(&args, 0, "irr", "values").unwrap_err();
        assert!(err.message.contains("'values'[1]"));
    }

    #[test]
    fn test_compound_factor_overflow() {
        assert!(compound_factor(10.0, 1e6, "pmt").is_err());
        assert!((compound_factor(0.1, 10.0, "pmt").unwrap() - 2.593742).abs() < 1e-5);
    }
}
