//! Calendar functions, mounted as `date.*`.
//!
//! `today`/`now` read the pass's injected clock, never the wall clock,
//! so a document evaluates identically wherever and whenever it runs.

use calcscript_core::date::{format_temporal, parse_temporal};
use calcscript_core::{number, ArgMeta, CalcError, FnContext, FunctionMeta, FunctionPlugin, Value};
use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime};

use crate::helpers::{missing_arg, text_arg};

fn temporal_arg<'a>(
    args: &'a [Value],
    index: usize,
    func: &str,
    name: &str,
) -> Result<&'a Value, CalcError> {
    match args.get(index) {
        Some(v @ (Value::Date(_) | Value::DateTime(_))) => Ok(v),
        Some(other) => Err(CalcError::arg_type(
            func,
            name,
            "date or datetime",
            other.type_name(),
        )),
        None => Err(missing_arg(func, name)),
    }
}

fn int_arg(args: &[Value], index: usize, func: &str, name: &str) -> Result<i64, CalcError> {
    match args.get(index) {
        Some(Value::Number(n)) => number::as_exact_int(*n).ok_or_else(|| {
            CalcError::eval(format!("{}: {} must be an integer, got {}", func, name, n))
        }),
        Some(other) => Err(CalcError::arg_type(func, name, "integer", other.type_name())),
        None => Err(missing_arg(func, name)),
    }
}

fn date_part(value: &Value) -> NaiveDate {
    match value {
        Value::Date(d) => *d,
        Value::DateTime(dt) => dt.date(),
        // temporal_arg admits nothing else
        _ => NaiveDate::default(),
    }
}

fn as_datetime(value: &Value) -> Result<NaiveDateTime, CalcError> {
    match value {
        Value::Date(d) => d
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| CalcError::domain("date out of range")),
        Value::DateTime(dt) => Ok(*dt),
        other => Err(CalcError::type_error("date or datetime", other.type_name())),
    }
}

static ONE_TEMPORAL: [ArgMeta; 1] = [ArgMeta::required("d", "date | datetime", "Input date")];
static NO_ARGS: [ArgMeta; 0] = [];

/// parse(text) - ISO date or datetime
pub struct Parse;

static PARSE_ARGS: [ArgMeta; 1] = [ArgMeta::required(
    "text",
    "string",
    "YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS",
)];

impl FunctionPlugin for Parse {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "parse",
            namespace: "date",
            usage: "parse(text)",
            description: "Parse ISO text into a date or datetime",
            args: &PARSE_ARGS,
            returns: "date | datetime",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("parse", "1", args.len()));
        }
        let text = text_arg(args, 0, "parse", "text")?;
        parse_temporal(&text).ok_or_else(|| {
            CalcError::domain(format!(
                "unrecognized date '{}'; expected YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS",
                text
            ))
        })
    }
}

/// format(d, pattern) - strftime-style, validated
pub struct Format;

static FORMAT_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("d", "date | datetime", "Value to format"),
    ArgMeta::required("pattern", "string", "strftime pattern, e.g. \"%d/%m/%Y\""),
];

impl FunctionPlugin for Format {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "format",
            namespace: "date",
            usage: "format(d, pattern)",
            description: "Format a date with a strftime pattern",
            args: &FORMAT_ARGS,
            returns: "string",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 2 {
            return Err(CalcError::arg_count("format", "2", args.len()));
        }
        let d = temporal_arg(args, 0, "format", "d")?;
        let pattern = text_arg(args, 1, "format", "pattern")?;
        format_temporal(d, &pattern).map(Value::Text)
    }
}

/// today() - the injected clock's date
pub struct Today;

impl FunctionPlugin for Today {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "today",
            namespace: "date",
            usage: "today()",
            description: "The evaluation pass's current date",
            args: &NO_ARGS,
            returns: "date",
        }
    }

    fn call(&self, args: &[Value], ctx: &FnContext) -> Result<Value, CalcError> {
        if !args.is_empty() {
            return Err(CalcError::arg_count("today", "0", args.len()));
        }
        Ok(Value::Date(ctx.today()))
    }
}

/// now() - the injected clock
pub struct Now;

impl FunctionPlugin for Now {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "now",
            namespace: "date",
            usage: "now()",
            description: "The evaluation pass's current datetime",
            args: &NO_ARGS,
            returns: "datetime",
        }
    }

    fn call(&self, args: &[Value], ctx: &FnContext) -> Result<Value, CalcError> {
        if !args.is_empty() {
            return Err(CalcError::arg_count("now", "0", args.len()));
        }
        Ok(Value::DateTime(ctx.now))
    }
}

/// year(d)
pub struct Year;

impl FunctionPlugin for Year {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "year",
            namespace: "date",
            usage: "year(d)",
            description: "Calendar year",
            args: &ONE_TEMPORAL,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("year", "1", args.len()));
        }
        Ok(Value::Number(
            date_part(temporal_arg(args, 0, "year", "d")?).year() as f64,
        ))
    }
}

/// month(d) - 1 to 12
pub struct Month;

impl FunctionPlugin for Month {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "month",
            namespace: "date",
            usage: "month(d)",
            description: "Calendar month, 1 to 12",
            args: &ONE_TEMPORAL,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("month", "1", args.len()));
        }
        Ok(Value::Number(
            date_part(temporal_arg(args, 0, "month", "d")?).month() as f64,
        ))
    }
}

/// day(d) - day of month
pub struct Day;

impl FunctionPlugin for Day {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "day",
            namespace: "date",
            usage: "day(d)",
            description: "Day of the month",
            args: &ONE_TEMPORAL,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("day", "1", args.len()));
        }
        Ok(Value::Number(
            date_part(temporal_arg(args, 0, "day", "d")?).day() as f64,
        ))
    }
}

/// addDays(d, n) - n may be negative
pub struct AddDays;

static SHIFT_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("d", "date | datetime", "Starting point"),
    ArgMeta::required("n", "integer", "Offset, may be negative"),
];

impl FunctionPlugin for AddDays {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "addDays",
            namespace: "date",
            usage: "addDays(d, n)",
            description: "Shift by whole days; keeps the date/datetime kind",
            args: &SHIFT_ARGS,
            returns: "date | datetime",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 2 {
            return Err(CalcError::arg_count("addDays", "2", args.len()));
        }
        let d = temporal_arg(args, 0, "addDays", "d")?;
        let n = int_arg(args, 1, "addDays", "n")?;
        let delta = Duration::try_days(n)
            .ok_or_else(|| CalcError::domain("addDays: offset out of range"))?;
        let shifted = match d {
            Value::Date(date) => date.checked_add_signed(delta).map(Value::Date),
            Value::DateTime(dt) => dt.checked_add_signed(delta).map(Value::DateTime),
            _ => None,
        };
        shifted.ok_or_else(|| CalcError::domain("addDays: resulting date out of range"))
    }
}

/// addMonths(d, n) - clamps the day of month, so Jan 31 + 1 month = Feb 29/28
pub struct AddMonths;

impl FunctionPlugin for AddMonths {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "addMonths",
            namespace: "date",
            usage: "addMonths(d, n)",
            description: "Shift by whole months, clamping the day of month",
            args: &SHIFT_ARGS,
            returns: "date | datetime",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 2 {
            return Err(CalcError::arg_count("addMonths", "2", args.len()));
        }
        let d = temporal_arg(args, 0, "addMonths", "d")?;
        let n = int_arg(args, 1, "addMonths", "n")?;
        let months = u32::try_from(n.unsigned_abs())
            .map(Months::new)
            .map_err(|_| CalcError::domain("addMonths: offset out of range"))?;
        let shifted = match d {
            Value::Date(date) => if n >= 0 {
                date.checked_add_months(months)
            } else {
                date.checked_sub_months(months)
            }
            .map(Value::Date),
            Value::DateTime(dt) => if n >= 0 {
                dt.checked_add_months(months)
            } else {
                dt.checked_sub_months(months)
            }
            .map(Value::DateTime),
            _ => None,
        };
        shifted.ok_or_else(|| CalcError::domain("addMonths: resulting date out of range"))
    }
}

/// diffDays(a, b) - whole days in a minus b, truncated toward zero
pub struct DiffDays;

static DIFF_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("a", "date | datetime", "Later date (usually)"),
    ArgMeta::required("b", "date | datetime", "Earlier date (usually)"),
];

impl FunctionPlugin for DiffDays {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "diffDays",
            namespace: "date",
            usage: "diffDays(a, b)",
            description: "Whole days between two dates (a minus b)",
            args: &DIFF_ARGS,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 2 {
            return Err(CalcError::arg_count("diffDays", "2", args.len()));
        }
        let a = as_datetime(temporal_arg(args, 0, "diffDays", "a")?)?;
        let b = as_datetime(temporal_arg(args, 1, "diffDays", "b")?)?;
        Ok(Value::Number((a - b).num_days() as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calcscript_core::date::parse_date;

    fn ctx() -> FnContext {
        FnContext::fixed()
    }

    fn d(s: &str) -> Value {
        Value::Date(parse_date(s).unwrap())
    }

    #[test]
    fn test_parse_and_format_round() {
        let parsed = Parse.call(&[Value::from("2024-03-09")], &ctx()).unwrap();
        assert_eq!(parsed, d("2024-03-09"));
        let text = Format
            .call(&[parsed, Value::from("%d/%m/%Y")], &ctx())
            .unwrap();
        assert_eq!(text, Value::from("09/03/2024"));
        assert!(Parse.call(&[Value::from("9 March")], &ctx()).is_err());
    }

    #[test]
    fn test_today_and_now_read_the_injected_clock() {
        assert_eq!(Today.call(&[], &ctx()).unwrap(), d("2024-01-15"));
        let now = Now.call(&[], &ctx()).unwrap();
        assert_eq!(now.to_string(), "2024-01-15T12:00:00");
    }

    #[test]
    fn test_components() {
        let date = d("2024-03-09");
        assert_eq!(Year.call(&[date.clone()], &ctx()).unwrap(), Value::Number(2024.0));
        assert_eq!(Month.call(&[date.clone()], &ctx()).unwrap(), Value::Number(3.0));
        assert_eq!(Day.call(&[date], &ctx()).unwrap(), Value::Number(9.0));
    }

    #[test]
    fn test_add_days_crosses_month_and_goes_backward() {
        assert_eq!(
            AddDays
                .call(&[d("2024-01-30"), Value::Number(3.0)], &ctx())
                .unwrap(),
            d("2024-02-02")
        );
        assert_eq!(
            AddDays
                .call(&[d("2024-01-01"), Value::Number(-1.0)], &ctx())
                .unwrap(),
            d("2023-12-31")
        );
        assert!(AddDays
            .call(&[d("2024-01-01"), Value::Number(1.5)], &ctx())
            .is_err());
    }

    #[test]
    fn test_add_months_clamps_day() {
        assert_eq!(
            AddMonths
                .call(&[d("2024-01-31"), Value::Number(1.0)], &ctx())
                .unwrap(),
            d("2024-02-29")
        );
        assert_eq!(
            AddMonths
                .call(&[d("2024-03-31"), Value::Number(-1.0)], &ctx())
                .unwrap(),
            d("2024-02-29")
        );
    }

    #[test]
    fn test_diff_days_signs_and_mixed_kinds() {
        assert_eq!(
            DiffDays
                .call(&[d("2024-01-10"), d("2024-01-01")], &ctx())
                .unwrap(),
            Value::Number(9.0)
        );
        assert_eq!(
            DiffDays
                .call(&[d("2024-01-01"), d("2024-01-10")], &ctx())
                .unwrap(),
            Value::Number(-9.0)
        );
        let noon = Value::DateTime(
            parse_date("2024-01-02").unwrap().and_hms_opt(12, 0, 0).unwrap(),
        );
        // 36 hours truncates to 1 whole day
        assert_eq!(
            DiffDays.call(&[noon, d("2024-01-01")], &ctx()).unwrap(),
            Value::Number(1.0)
        );
    }
}
