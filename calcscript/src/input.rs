//! Typed input declarations.
//!
//! An inputs block holds one declaration per line:
//!
//! ```text
//! name : type[(args)] = literal [ [min: n, max: n] ]  # comment
//! ```
//!
//! A bad line rejects only itself. [`coerce_value`] and
//! [`check_constraints`] are shared with table-cell validation and
//! input overrides, so a document and an edit obey the same rules.

use calcscript_core::number::as_exact_int;
use calcscript_core::{codes, date, CalcError, Diagnostic, InputType, Value};

#[derive(Debug, Clone)]
pub struct InputDefinition {
    pub name: String,
    pub ty: InputType,
    pub default: Value,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// 1-based line within the inputs block.
    pub line: u32,
}

pub fn parse_block(source: &str) -> (Vec<InputDefinition>, Vec<Diagnostic>) {
    let mut defs = Vec::new();
    let mut diags = Vec::new();
    for (i, raw) in source.lines().enumerate() {
        let line = i as u32 + 1;
        let text = strip_comment(raw).trim();
        if text.is_empty() {
            continue;
        }
        match parse_line(text, line) {
            Ok(def) => defs.push(def),
            Err(diag) => diags.push(diag),
        }
    }
    (defs, diags)
}

fn parse_line(text: &str, line: u32) -> Result<InputDefinition, Diagnostic> {
    let fail = |code: &str, message: String| Diagnostic::error(code, message).at_line(line);

    let Some((name_part, rest)) = text.split_once(':') else {
        return Err(fail(
            codes::PARSE_ERROR,
            format!("input line must look like 'name : type = default', got '{}'", text),
        ));
    };
    let name = name_part.trim();
    if !valid_name(name) {
        return Err(fail(
            codes::PARSE_ERROR,
            format!("invalid input name '{}'", name),
        ));
    }
    let Some((ty_part, value_part)) = rest.split_once('=') else {
        return Err(fail(
            codes::PARSE_ERROR,
            format!("input '{}' is missing '= default'", name),
        ));
    };
    let ty = InputType::parse(ty_part)
        .map_err(|err| fail(codes::INVALID_TYPE, format!("input '{}': {}", name, err)))?;
    let (literal, tail) = split_literal(value_part.trim())
        .map_err(|msg| fail(codes::PARSE_ERROR, format!("input '{}': {}", name, msg)))?;
    let default = coerce_value(&ty, &literal).map_err(|err| {
        fail(
            codes::INVALID_TYPE,
            format!("input '{}': default {}", name, err.message),
        )
    })?;
    let (min, max) = parse_constraints(tail.trim())
        .map_err(|msg| fail(codes::INVALID_CONSTRAINT, format!("input '{}': {}", name, msg)))?;

    if min.is_some() || max.is_some() {
        let numeric = ty.is_numeric()
            || (matches!(ty, InputType::Custom(_)) && matches!(default, Value::Number(_)));
        if !numeric {
            return Err(fail(
                codes::INVALID_CONSTRAINT,
                format!("input '{}': min/max apply to numeric inputs only", name),
            ));
        }
    }
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            return Err(fail(
                codes::INVALID_CONSTRAINT,
                format!("input '{}': min {} exceeds max {}", name, lo, hi),
            ));
        }
    }
    let def = InputDefinition {
        name: name.to_string(),
        ty,
        default,
        min,
        max,
        line,
    };
    if let Err(err) = check_constraints(&def, &def.default) {
        return Err(fail(
            codes::INVALID_CONSTRAINT,
            format!("input '{}': default {}", name, err.message),
        ));
    }
    Ok(def)
}

/// Check a concrete value against a declared kind. Text promotes to
/// date/datetime and a date promotes to midnight-datetime; nothing else
/// coerces, and null never passes.
pub fn coerce_value(ty: &InputType, value: &Value) -> Result<Value, CalcError> {
    let mismatch = || CalcError::type_error(&ty.to_string(), value.type_name());
    match ty {
        InputType::String => match value {
            Value::Text(_) => Ok(value.clone()),
            _ => Err(mismatch()),
        },
        InputType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            _ => Err(mismatch()),
        },
        InputType::Number | InputType::Decimal | InputType::Percent | InputType::Currency(_) => {
            match value {
                Value::Number(_) => Ok(value.clone()),
                _ => Err(mismatch()),
            }
        }
        InputType::Integer => match value {
            Value::Number(n) if as_exact_int(*n).is_some() => Ok(value.clone()),
            Value::Number(n) => Err(CalcError::domain(format!("{} is not an integer", n))),
            _ => Err(mismatch()),
        },
        InputType::Date => match value {
            Value::Date(_) => Ok(value.clone()),
            Value::Text(s) => date::parse_date(s).map(Value::Date).ok_or_else(|| {
                CalcError::domain(format!("'{}' is not a date (expected YYYY-MM-DD)", s))
            }),
            _ => Err(mismatch()),
        },
        InputType::DateTime => match value {
            Value::DateTime(_) => Ok(value.clone()),
            Value::Date(d) => d
                .and_hms_opt(0, 0, 0)
                .map(Value::DateTime)
                .ok_or_else(|| CalcError::domain("datetime out of range".to_string())),
            Value::Text(s) => date::parse_temporal(s)
                .ok_or_else(|| {
                    CalcError::domain(format!("'{}' is not a datetime", s))
                })
                .and_then(|v| coerce_value(&InputType::DateTime, &v)),
            _ => Err(mismatch()),
        },
        InputType::Custom(_) => Ok(value.clone()),
    }
}

/// Range-check a numeric value; non-numbers pass untouched.
pub fn check_constraints(def: &InputDefinition, value: &Value) -> Result<(), CalcError> {
    let Value::Number(n) = value else {
        return Ok(());
    };
    if let Some(lo) = def.min {
        if *n < lo {
            return Err(CalcError::domain(format!(
                "value {} is below the minimum {}",
                n, lo
            )));
        }
    }
    if let Some(hi) = def.max {
        if *n > hi {
            return Err(CalcError::domain(format!(
                "value {} is above the maximum {}",
                n, hi
            )));
        }
    }
    Ok(())
}

/// Cut a trailing `#` comment, honoring quotes so `"a#b"` survives.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (Some(_), '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '#') => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Identifier rule shared by inputs, table names and columns.
pub(crate) fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Read one literal off the front of `text`; return it and the rest.
fn split_literal(text: &str) -> Result<(Value, &str), String> {
    if text.is_empty() {
        return Err("missing default value".to_string());
    }
    let first = match text.chars().next() {
        Some(c) => c,
        None => return Err("missing default value".to_string()),
    };
    if first == '"' || first == '\'' {
        let mut value = String::new();
        let mut escaped = false;
        for (i, c) in text.char_indices().skip(1) {
            if escaped {
                match c {
                    '\\' | '"' | '\'' => value.push(c),
                    other => {
                        value.push('\\');
                        value.push(other);
                    }
                }
                escaped = false;
                continue;
            }
            if c == '\\' {
                escaped = true;
            } else if c == first {
                return Ok((Value::Text(value), &text[i + c.len_utf8()..]));
            } else {
                value.push(c);
            }
        }
        return Err("unterminated string default".to_string());
    }
    let end = text
        .find(|c: char| c.is_whitespace() || c == '[')
        .unwrap_or(text.len());
    let token = &text[..end];
    let value = if token == "true" {
        Value::Bool(true)
    } else if token == "false" {
        Value::Bool(false)
    } else if let Ok(n) = token.parse::<f64>() {
        if !n.is_finite() {
            return Err(format!("non-finite number '{}'", token));
        }
        Value::Number(n)
    } else if let Some(temporal) = date::parse_temporal(token) {
        temporal
    } else {
        return Err(format!("unrecognized literal '{}'", token));
    };
    Ok((value, &text[end..]))
}

fn parse_constraints(text: &str) -> Result<(Option<f64>, Option<f64>), String> {
    if text.is_empty() {
        return Ok((None, None));
    }
    let inner = text
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .ok_or_else(|| format!("unexpected text after default: '{}'", text))?;
    let mut min = None;
    let mut max = None;
    for part in inner.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let Some((key, value)) = part.split_once(':') else {
            return Err(format!("constraint '{}' must look like 'min: n'", part));
        };
        let n: f64 = value
            .trim()
            .parse()
            .map_err(|_| format!("constraint '{}' is not a number", part))?;
        if !n.is_finite() {
            return Err(format!("constraint '{}' is not finite", part));
        }
        match key.trim() {
            "min" => min = Some(n),
            "max" => max = Some(n),
            other => return Err(format!("unknown constraint '{}'", other)),
        }
    }
    Ok((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn block(source: &str) -> (Vec<InputDefinition>, Vec<Diagnostic>) {
        parse_block(source)
    }

    #[test]
    fn test_parses_typed_lines() {
        let (defs, diags) = block(
            "rate : percent = 5 [min: 0, max: 100]\n\
             price : currency(usd) = 10.5\n\
             start : date = 2024-01-05\n\
             label : string = \"Acme\"  # display name\n",
        );
        assert!(diags.is_empty(), "{:?}", diags);
        assert_eq!(defs.len(), 4);

        assert_eq!(defs[0].ty, InputType::Percent);
        assert_eq!(defs[0].default, Value::Number(5.0));
        assert_eq!((defs[0].min, defs[0].max), (Some(0.0), Some(100.0)));
        assert_eq!(defs[0].line, 1);

        assert_eq!(defs[1].ty, InputType::Currency(Some("USD".to_string())));

        let day = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(defs[2].default, Value::Date(day));

        assert_eq!(defs[3].default, Value::from("Acme"));
    }

    #[test]
    fn test_bad_line_rejects_only_itself() {
        let (defs, diags) = block("a : number = 1\nwhat even is this\nb : number = 2\n");
        assert_eq!(defs.len(), 2);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, codes::PARSE_ERROR);
        assert_eq!(diags[0].line, Some(2));
    }

    #[test]
    fn test_type_and_default_must_agree() {
        let (defs, diags) = block("flag : boolean = 12\ncount : integer = 2.5\n");
        assert!(defs.is_empty());
        assert_eq!(diags.len(), 2);
        assert!(diags.iter().all(|d| d.code == codes::INVALID_TYPE));
        assert!(diags[1].message.contains("not an integer"));
    }

    #[test]
    fn test_invalid_currency_code() {
        let (_, diags) = block("price : currency(u5d) = 1\n");
        assert_eq!(diags[0].code, codes::INVALID_TYPE);
    }

    #[test]
    fn test_constraint_violations() {
        let (defs, diags) = block(
            "a : number = 50 [min: 0, max: 10]\n\
             b : number = 1 [min: 9, max: 2]\n\
             c : string = \"x\" [min: 0]\n",
        );
        assert!(defs.is_empty());
        assert_eq!(diags.len(), 3);
        assert!(diags.iter().all(|d| d.code == codes::INVALID_CONSTRAINT));
        assert!(diags[0].message.contains("above the maximum"));
    }

    #[test]
    fn test_custom_type_follows_default_shape() {
        let (defs, diags) = block("widgets : thing = 4 [min: 0]\n");
        assert!(diags.is_empty());
        assert_eq!(defs[0].ty, InputType::Custom("thing".to_string()));
        assert_eq!(defs[0].default, Value::Number(4.0));
    }

    #[test]
    fn test_hash_inside_quotes_is_not_a_comment() {
        let (defs, diags) = block("tag : string = \"a#b\" # real comment\n");
        assert!(diags.is_empty());
        assert_eq!(defs[0].default, Value::from("a#b"));
    }

    #[test]
    fn test_datetime_accepts_date_default() {
        let (defs, diags) = block("t : datetime = 2024-01-05\n");
        assert!(diags.is_empty());
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(defs[0].default, Value::DateTime(expected));
    }

    #[test]
    fn test_coerce_value_for_overrides() {
        let ty = InputType::Date;
        let coerced = coerce_value(&ty, &Value::from("2024-02-29")).unwrap();
        assert!(matches!(coerced, Value::Date(_)));
        assert!(coerce_value(&ty, &Value::Number(1.0)).is_err());
        assert!(coerce_value(&InputType::Number, &Value::Null).is_err());
    }

    #[test]
    fn test_check_constraints_bounds() {
        let def = InputDefinition {
            name: "a".to_string(),
            ty: InputType::Number,
            default: Value::Number(5.0),
            min: Some(0.0),
            max: Some(10.0),
            line: 1,
        };
        assert!(check_constraints(&def, &Value::Number(0.0)).is_ok());
        assert!(check_constraints(&def, &Value::Number(10.0)).is_ok());
        assert!(check_constraints(&def, &Value::Number(-0.1)).is_err());
        assert!(check_constraints(&def, &Value::Number(10.1)).is_err());
    }
}
