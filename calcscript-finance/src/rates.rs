//! Rate conversions.

use calcscript_core::{ArgMeta, CalcError, FnContext, FunctionMeta, FunctionPlugin, Value};

use crate::helpers::number_arg;

/// toMonthlyRate(annualPercent) - annual percentage to monthly decimal rate
pub struct ToMonthlyRate;

static TO_MONTHLY_RATE_ARGS: [ArgMeta; 1] = [ArgMeta::required(
    "annualPercent",
    "number",
    "Annual rate in percent, e.g. 6 for 6%",
)];

impl FunctionPlugin for ToMonthlyRate {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "toMonthlyRate",
            namespace: "finance",
            usage: "toMonthlyRate(annualPercent)",
            description: "Convert an annual percentage to a monthly decimal rate",
            args: &TO_MONTHLY_RATE_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("toMonthlyRate", "1", args.len()));
        }
        let annual = number_arg(args, 0, "toMonthlyRate", "annualPercent")?;
        Ok(Value::Number(annual / 100.0 / 12.0))
    }
}
