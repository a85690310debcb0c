//! Declared value kinds.
//!
//! Inputs and table columns carry an [`InputType`] such as `number`,
//! `percent` or `currency(USD)`. Kinds never change runtime representation
//! (a currency is still a plain f64); they drive coercion of defaults,
//! constraint checking and static inference. Unrecognized names pass
//! through as custom kinds so documents can label domain concepts.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Parse failures for type annotations like `currency(USD)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeParseError {
    #[error("empty type annotation")]
    Empty,
    #[error("malformed type annotation '{0}'")]
    Malformed(String),
    #[error("currency code '{0}' must be alphabetic")]
    BadCurrencyCode(String),
}

/// A declared kind for an input or a table column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InputType {
    String,
    Boolean,
    Number,
    Integer,
    Decimal,
    Percent,
    /// `currency` or `currency(CODE)`; codes normalize to uppercase.
    Currency(Option<String>),
    Date,
    DateTime,
    /// Any unrecognized type name, carried through verbatim.
    Custom(String),
}

impl InputType {
    /// Parse an annotation like `number`, `currency(usd)` or `widget`.
    pub fn parse(s: &str) -> Result<Self, TypeParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TypeParseError::Empty);
        }
        let (name, arg) = match s.split_once('(') {
            None => (s, None),
            Some((name, rest)) => {
                let inner = rest
                    .strip_suffix(')')
                    .ok_or_else(|| TypeParseError::Malformed(s.to_string()))?;
                (name.trim(), Some(inner.trim()))
            }
        };
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(TypeParseError::Malformed(s.to_string()));
        }
        Ok(match name {
            "string" => InputType::String,
            "boolean" => InputType::Boolean,
            "number" => InputType::Number,
            "integer" => InputType::Integer,
            "decimal" => InputType::Decimal,
            "percent" => InputType::Percent,
            "currency" => match arg {
                None | Some("") => InputType::Currency(None),
                Some(code) => {
                    if !code.chars().all(|c| c.is_ascii_alphabetic()) {
                        return Err(TypeParseError::BadCurrencyCode(code.to_string()));
                    }
                    InputType::Currency(Some(code.to_ascii_uppercase()))
                }
            },
            "date" => InputType::Date,
            "datetime" => InputType::DateTime,
            other => InputType::Custom(other.to_string()),
        })
    }

    /// True for kinds whose runtime value is a number.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            InputType::Number
                | InputType::Integer
                | InputType::Decimal
                | InputType::Percent
                | InputType::Currency(_)
        )
    }

    /// A plain (unlabelled) numeric kind: number, integer or decimal.
    fn is_plain_numeric(&self) -> bool {
        matches!(
            self,
            InputType::Number | InputType::Integer | InputType::Decimal
        )
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputType::String => write!(f, "string"),
            InputType::Boolean => write!(f, "boolean"),
            InputType::Number => write!(f, "number"),
            InputType::Integer => write!(f, "integer"),
            InputType::Decimal => write!(f, "decimal"),
            InputType::Percent => write!(f, "percent"),
            InputType::Currency(None) => write!(f, "currency"),
            InputType::Currency(Some(code)) => write!(f, "currency({})", code),
            InputType::Date => write!(f, "date"),
            InputType::DateTime => write!(f, "datetime"),
            InputType::Custom(name) => write!(f, "{}", name),
        }
    }
}

impl Serialize for InputType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for InputType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        InputType::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Arithmetic operator shape, as far as kind combination cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Combine two numeric kinds under an arithmetic operator.
///
/// `None` means a non-numeric kind was involved and the result kind is
/// unknown. Addition and subtraction preserve a currency against a plain
/// number; multiplying two currencies cancels the label; division keeps
/// the numerator's label. Everything unlabelled lands on plain `number`.
pub fn combine_numeric(op: NumericOp, left: &InputType, right: &InputType) -> Option<InputType> {
    use InputType::*;

    if !left.is_numeric() || !right.is_numeric() {
        return None;
    }

    let combined = match op {
        NumericOp::Add | NumericOp::Sub => match (left, right) {
            (Currency(a), Currency(b)) if a == b => Currency(a.clone()),
            (Currency(_), Currency(_)) => Number,
            (Currency(code), other) | (other, Currency(code)) if other.is_plain_numeric() => {
                Currency(code.clone())
            }
            (Percent, Percent) => Percent,
            _ => Number,
        },
        NumericOp::Mul => match (left, right) {
            (Currency(_), Currency(_)) => Number,
            (Currency(code), other) | (other, Currency(code)) if other.is_plain_numeric() => {
                Currency(code.clone())
            }
            _ => Number,
        },
        NumericOp::Div => match (left, right) {
            (Currency(_), Currency(_)) => Number,
            (Currency(code), other) if other.is_plain_numeric() => Currency(code.clone()),
            (Percent, Percent) => Percent,
            _ => Number,
        },
    };
    Some(combined)
}
