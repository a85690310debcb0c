//! Order statistics: percentile and quartiles.

use calcscript_core::{ArgMeta, CalcError, FnContext, FunctionMeta, FunctionPlugin, Record, Value};

use crate::helpers::{numbers_arg, require_min};

/// Linear interpolation between closest ranks; p in [0, 100].
pub fn percentile_of(sorted: &[f64], p: f64) -> Result<f64, CalcError> {
    if !(0.0..=100.0).contains(&p) {
        return Err(CalcError::domain(format!(
            "percentile must be between 0 and 100, got {}",
            p
        )));
    }
    let n = sorted.len();
    if n == 1 {
        return Ok(sorted[0]);
    }
    let rank = p / 100.0 * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64))
}

fn sorted_values(args: &[Value], func: &str) -> Result<Vec<f64>, CalcError> {
    let mut values = numbers_arg(args, 0, func, "values")?;
    require_min(func, 1, values.len())?;
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Ok(values)
}

/// percentile(values, p)
pub struct Percentile;

static PERCENTILE_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("values", "list", "Numbers to rank"),
    ArgMeta::required("p", "number", "Percentile between 0 and 100"),
];

impl FunctionPlugin for Percentile {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "percentile",
            namespace: "stats",
            usage: "percentile(values, p)",
            description: "P-th percentile with linear interpolation between ranks",
            args: &PERCENTILE_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 2 {
            return Err(CalcError::arg_count("percentile", "2", args.len()));
        }
        let values = sorted_values(args, "percentile")?;
        let p = match args[1] {
            Value::Number(p) => p,
            ref other => {
                return Err(CalcError::arg_type(
                    "percentile",
                    "p",
                    "number",
                    other.type_name(),
                ))
            }
        };
        percentile_of(&values, p).map(Value::Number)
    }
}

/// quartiles(values) - {q1, q2, q3}
pub struct Quartiles;

static QUARTILES_ARGS: [ArgMeta; 1] = [ArgMeta::required("values", "list", "Numbers to rank")];

impl FunctionPlugin for Quartiles {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "quartiles",
            namespace: "stats",
            usage: "quartiles(values)",
            description: "First, second and third quartile as a record",
            args: &QUARTILES_ARGS,
            returns: "record",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("quartiles", "1", args.len()));
        }
        let values = sorted_values(args, "quartiles")?;
        let rec = Record::from_entries([
            ("q1", Value::Number(percentile_of(&values, 25.0)?)),
            ("q2", Value::Number(percentile_of(&values, 50.0)?)),
            ("q3", Value::Number(percentile_of(&values, 75.0)?)),
        ])?;
        Ok(Value::Record(rec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(values: &[f64]) -> Value {
        Value::List(values.iter().map(|v| Value::Number(*v)).collect())
    }

    #[test]
    fn test_percentile_interpolates() {
        let ctx = FnContext::fixed();
        let out = Percentile
            .call(&[list(&[1.0, 2.0, 3.0, 4.0]), Value::Number(50.0)], &ctx)
            .unwrap();
        assert_eq!(out, Value::Number(2.5));
        let out = Percentile
            .call(&[list(&[1.0, 2.0, 3.0, 4.0]), Value::Number(25.0)], &ctx)
            .unwrap();
        assert_eq!(out, Value::Number(1.75));
    }

    #[test]
    fn test_percentile_bounds() {
        let ctx = FnContext::fixed();
        let values = list(&[3.0, 1.0, 2.0]);
        assert_eq!(
            Percentile.call(&[values.clone(), Value::Number(0.0)], &ctx).unwrap(),
            Value::Number(1.0)
        );
        assert_eq!(
            Percentile.call(&[values.clone(), Value::Number(100.0)], &ctx).unwrap(),
            Value::Number(3.0)
        );
        assert!(Percentile.call(&[values, Value::Number(101.0)], &ctx).is_err());
    }

    #[test]
    fn test_quartiles_record() {
        let out = Quartiles
            .call(&[list(&[1.0, 2.0, 3.0, 4.0, 5.0])], &FnContext::fixed())
            .unwrap();
        let rec = out.as_record().unwrap();
        assert_eq!(rec.get("q1"), Some(&Value::Number(2.0)));
        assert_eq!(rec.get("q2"), Some(&Value::Number(3.0)));
        assert_eq!(rec.get("q3"), Some(&Value::Number(4.0)));
    }
}
