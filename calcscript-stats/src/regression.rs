//! Ordinary least squares over one predictor: linearFit and predict.

use calcscript_core::{number, ArgMeta, CalcError, FnContext, FunctionMeta, FunctionPlugin, Record, Value};

use crate::helpers::{mean_of, paired_lists_arg, require_min};

/// Slope, intercept and r² of the least-squares line through (xs, ys).
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Result<(f64, f64, f64), CalcError> {
    let mx = mean_of(xs);
    let my = mean_of(ys);
    let ss_xx: f64 = xs.iter().map(|x| (x - mx) * (x - mx)).sum();
    if ss_xx < number::NEAR_ZERO {
        return Err(CalcError::domain(
            "linearFit needs x values with non-zero variance",
        ));
    }
    let ss_xy: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mx) * (y - my)).sum();
    let slope = ss_xy / ss_xx;
    let intercept = my - slope * mx;

    let ss_res: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| {
            let e = y - (slope * x + intercept);
            e * e
        })
        .sum();
    let ss_tot: f64 = ys.iter().map(|y| (y - my) * (y - my)).sum();
    // A flat series fit perfectly still deserves r² = 1.
    let r2 = if ss_tot < number::NEAR_ZERO {
        if ss_res < number::NEAR_ZERO {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    };
    Ok((slope, intercept, r2))
}

/// linearFit(xs, ys) - {slope, intercept, r2}
pub struct LinearFit;

static LINEAR_FIT_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("xs", "list", "Predictor values"),
    ArgMeta::required("ys", "list", "Observed values, same length"),
];

impl FunctionPlugin for LinearFit {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "linearFit",
            namespace: "stats",
            usage: "linearFit(xs, ys)",
            description: "Least-squares line as {slope, intercept, r2}",
            args: &LINEAR_FIT_ARGS,
            returns: "record",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        let (xs, ys) = paired_lists_arg(args, "linearFit")?;
        require_min("linearFit", 2, xs.len())?;
        let (slope, intercept, r2) = linear_fit(&xs, &ys)?;
        let rec = Record::from_entries([
            ("slope", Value::Number(slope)),
            ("intercept", Value::Number(intercept)),
            ("r2", Value::Number(r2)),
        ])?;
        Ok(Value::Record(rec))
    }
}

/// predict(fit, x) - apply a fit record to a new x
pub struct Predict;

static PREDICT_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("fit", "record", "A record with numeric slope and intercept"),
    ArgMeta::required("x", "number", "Predictor value"),
];

impl FunctionPlugin for Predict {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "predict",
            namespace: "stats",
            usage: "predict(fit, x)",
            description: "Evaluate a linear fit at a new x",
            args: &PREDICT_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 2 {
            return Err(CalcError::arg_count("predict", "2", args.len()));
        }
        let fit = args[0]
            .as_record()
            .ok_or_else(|| CalcError::arg_type("predict", "fit", "record", args[0].type_name()))?;
        let slope = fit
            .get("slope")
            .and_then(Value::as_number)
            .ok_or_else(|| CalcError::domain("predict: fit record needs a numeric 'slope'"))?;
        let intercept = fit
            .get("intercept")
            .and_then(Value::as_number)
            .ok_or_else(|| CalcError::domain("predict: fit record needs a numeric 'intercept'"))?;
        let x = args[1]
            .as_number()
            .ok_or_else(|| CalcError::arg_type("predict", "x", "number", args[1].type_name()))?;
        number::ensure_finite(slope * x + intercept, "prediction").map(Value::Number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(values: &[f64]) -> Value {
        Value::List(values.iter().map(|v| Value::Number(*v)).collect())
    }

    #[test]
    fn test_exact_line_has_r2_one() {
        let out = LinearFit
            .call(
                &[list(&[0.0, 1.0, 2.0]), list(&[0.0, 2.0, 4.0])],
                &FnContext::fixed(),
            )
            .unwrap();
        let rec = out.as_record().unwrap();
        assert_eq!(rec.get("slope"), Some(&Value::Number(2.0)));
        assert_eq!(rec.get("intercept"), Some(&Value::Number(0.0)));
        assert_eq!(rec.get("r2"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn test_flat_series_fit_perfectly_is_r2_one() {
        let (slope, intercept, r2) =
            linear_fit(&[0.0, 1.0, 2.0], &[5.0, 5.0, 5.0]).unwrap();
        assert_eq!(slope, 0.0);
        assert_eq!(intercept, 5.0);
        assert_eq!(r2, 1.0);
    }

    #[test]
    fn test_zero_x_variance_rejected() {
        assert!(linear_fit(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_predict_from_fit_and_from_hand_built_record() {
        let ctx = FnContext::fixed();
        let fit = LinearFit
            .call(&[list(&[0.0, 1.0, 2.0]), list(&[0.0, 2.0, 4.0])], &ctx)
            .unwrap();
        let out = Predict.call(&[fit, Value::Number(3.0)], &ctx).unwrap();
        assert_eq!(out, Value::Number(6.0));

        let hand = Record::from_entries([
            ("slope", Value::Number(1.5)),
            ("intercept", Value::Number(1.0)),
        ])
        .unwrap();
        let out = Predict
            .call(&[Value::Record(hand), Value::Number(2.0)], &ctx)
            .unwrap();
        assert_eq!(out, Value::Number(4.0));
    }

    #[test]
    fn test_predict_requires_fit_shape() {
        let bad = Record::from_entries([("slope", Value::from("2"))]).unwrap();
        assert!(Predict
            .call(&[Value::Record(bad), Value::Number(1.0)], &FnContext::fixed())
            .is_err());
    }
}
