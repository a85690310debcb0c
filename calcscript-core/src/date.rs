//! Date parsing, formatting and comparison helpers.
//!
//! Dates are timezone-free calendar values (`chrono::NaiveDate` /
//! `NaiveDateTime`). Accepted text forms are ISO: `YYYY-MM-DD` and
//! `YYYY-MM-DDTHH:MM:SS` (a space separator is tolerated on input).
//! Formatting validates the strftime pattern up front so a bad pattern is
//! an error, never a panic; timezone specifiers are rejected because the
//! values carry no zone.

use chrono::format::{Fixed, Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::CalcError;
use crate::value::Value;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

/// Parse text into `Value::Date` or `Value::DateTime`, date form first.
pub fn parse_temporal(s: &str) -> Option<Value> {
    if let Some(d) = parse_date(s) {
        return Some(Value::Date(d));
    }
    parse_datetime(s).map(Value::DateTime)
}

/// Seconds since the Unix epoch, for ordering dates against datetimes.
pub fn timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Date(d) => d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp()),
        Value::DateTime(dt) => Some(dt.and_utc().timestamp()),
        _ => None,
    }
}

/// Format a date or datetime with a validated strftime pattern.
pub fn format_temporal(value: &Value, pattern: &str) -> Result<String, CalcError> {
    let items = validated_items(pattern)?;
    let dt = match value {
        Value::Date(d) => d
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| CalcError::domain("date out of range"))?,
        Value::DateTime(dt) => *dt,
        other => return Err(CalcError::type_error("date or datetime", other.type_name())),
    };
    Ok(dt.format_with_items(items.iter()).to_string())
}

fn validated_items(pattern: &str) -> Result<Vec<Item<'_>>, CalcError> {
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    for item in &items {
        match item {
            Item::Error => {
                return Err(CalcError::domain(format!(
                    "unrecognized specifier in date format '{}'",
                    pattern
                )))
            }
            Item::Fixed(fixed) if is_zone_specifier(fixed) => {
                return Err(CalcError::domain(format!(
                    "date format '{}' uses a timezone specifier, but dates carry no zone",
                    pattern
                )))
            }
            _ => {}
        }
    }
    Ok(items)
}

fn is_zone_specifier(fixed: &Fixed) -> bool {
    matches!(
        fixed,
        Fixed::TimezoneName
            | Fixed::TimezoneOffset
            | Fixed::TimezoneOffsetColon
            | Fixed::TimezoneOffsetColonZ
            | Fixed::TimezoneOffsetDoubleColon
            | Fixed::TimezoneOffsetTripleColon
            | Fixed::TimezoneOffsetZ
            | Fixed::RFC2822
            | Fixed::RFC3339
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_and_datetime() {
        assert_eq!(parse_date("2024-03-09").unwrap().to_string(), "2024-03-09");
        assert!(parse_date("03/09/2024").is_none());
        assert!(parse_datetime("2024-03-09T10:30:00").is_some());
        assert!(parse_datetime("2024-03-09 10:30:00").is_some());
    }

    #[test]
    fn test_parse_temporal_prefers_date() {
        assert!(matches!(parse_temporal("2024-01-01"), Some(Value::Date(_))));
        assert!(matches!(
            parse_temporal("2024-01-01T08:00:00"),
            Some(Value::DateTime(_))
        ));
        assert_eq!(parse_temporal("yesterday"), None);
    }

    #[test]
    fn test_format_with_valid_pattern() {
        let d = Value::Date(parse_date("2024-03-09").unwrap());
        assert_eq!(format_temporal(&d, "%d/%m/%Y").unwrap(), "09/03/2024");
        assert_eq!(format_temporal(&d, "%Y").unwrap(), "2024");
    }

    #[test]
    fn test_format_rejects_bad_patterns() {
        let d = Value::Date(parse_date("2024-03-09").unwrap());
        assert!(format_temporal(&d, "%Q").is_err());
        assert!(format_temporal(&d, "%Y %Z").is_err());
        assert!(format_temporal(&Value::Number(1.0), "%Y").is_err());
    }

    #[test]
    fn test_timestamp_orders_date_against_datetime() {
        let d = timestamp(&parse_temporal("2024-01-02").unwrap()).unwrap();
        let dt = timestamp(&parse_temporal("2024-01-01T23:00:00").unwrap()).unwrap();
        assert!(dt < d);
    }
}
