//! Structured errors and diagnostics.
//!
//! Failures never crash a pass. Runtime failures travel as [`CalcError`]
//! until they reach an entity boundary (a node, an input, a table row),
//! where they become [`Diagnostic`] records in the pass output. Codes are a
//! stable machine-readable contract; messages are for humans and may change.

use serde::{Deserialize, Serialize};

/// Stable diagnostic codes. Kebab-case strings, part of the public contract.
pub mod codes {
    pub const PARSE_ERROR: &str = "parse-error";
    pub const DUPLICATE_NAME: &str = "duplicate-name";
    pub const RESERVED_NAME_USED: &str = "reserved-name-used";
    pub const MISSING_REQUIRED_KEY: &str = "missing-required-key";
    pub const INVALID_CONSTRAINT: &str = "invalid-constraint";
    pub const INVALID_TYPE: &str = "invalid-type";
    pub const INVALID_ROW: &str = "invalid-row";
    pub const DUPLICATE_PRIMARY_KEY: &str = "duplicate-primary-key";
    pub const UNKNOWN_COLUMN: &str = "unknown-column";
    pub const INVALID_SOURCE: &str = "invalid-source";
    pub const MISSING_SOURCE_DATA: &str = "missing-source-data";
    pub const INVALID_OVERRIDE: &str = "invalid-override";
    pub const INVALID_PATCH: &str = "invalid-patch";
    pub const EVAL_ERROR: &str = "eval-error";
    pub const DEPENDENCY_UNRESOLVED: &str = "dependency-unresolved";
    pub const CYCLE: &str = "cycle";
    pub const DUPLICATE_KEY: &str = "duplicate-key";
    pub const RESERVED_KEY: &str = "reserved-key";
}

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The affected entity was skipped or produced no value.
    Error,
    /// The pass continued; the entity may be degraded.
    Warning,
}

/// A runtime failure inside one computation.
///
/// The code is one of [`codes`]; most value-level failures carry
/// [`codes::EVAL_ERROR`] and a message naming the operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalcError {
    pub code: String,
    pub message: String,
}

impl CalcError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// An evaluation failure with the generic `eval-error` code.
    pub fn eval(message: impl Into<String>) -> Self {
        Self::new(codes::EVAL_ERROR, message)
    }

    pub fn undefined_var(name: &str) -> Self {
        Self::eval(format!("undefined variable '{}'", name))
    }

    pub fn undefined_field(field: &str, on: &str) -> Self {
        Self::eval(format!("no field '{}' on {}", field, on))
    }

    pub fn type_error(expected: &str, got: &str) -> Self {
        Self::eval(format!("expected {}, got {}", expected, got))
    }

    pub fn arg_count(func: &str, expected: &str, got: usize) -> Self {
        Self::eval(format!(
            "{} expects {} arguments, got {}",
            func, expected, got
        ))
    }

    pub fn arg_type(func: &str, arg: &str, expected: &str, got: &str) -> Self {
        Self::eval(format!(
            "{} argument '{}': expected {}, got {}",
            func, arg, expected, got
        ))
    }

    pub fn domain(message: impl Into<String>) -> Self {
        Self::eval(message)
    }

    pub fn div_zero() -> Self {
        Self::eval("division by zero")
    }

    pub fn not_finite(what: &str) -> Self {
        Self::eval(format!("{} is not a finite number", what))
    }

    pub fn length_mismatch(left: usize, right: usize) -> Self {
        Self::eval(format!(
            "elementwise operation over lists of different lengths ({} vs {})",
            left, right
        ))
    }

    pub fn key_not_found(key: &str) -> Self {
        Self::eval(format!("key not found: {}", key))
    }

    pub fn duplicate_record_key(key: &str) -> Self {
        Self::new(
            codes::DUPLICATE_KEY,
            format!("key '{}' written twice in the same literal", key),
        )
    }

    pub fn reserved_record_key(key: &str) -> Self {
        Self::new(
            codes::RESERVED_KEY,
            format!("reserved key '{}' may not be used in a record", key),
        )
    }
}

impl std::fmt::Display for CalcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for CalcError {}

/// One entry in a pass's diagnostics list.
///
/// Serialized camelCase; optional location fields are omitted when unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub message: String,

    /// 1-based line in the source document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_lang: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Diagnostic {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code: code.into(),
            message: message.into(),
            line: None,
            block_lang: None,
            node_name: None,
            file: None,
        }
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, message)
        }
    }

    /// Builder: set the source line.
    pub fn at_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    /// Builder: set the fenced-block language.
    pub fn in_block(mut self, lang: impl Into<String>) -> Self {
        self.block_lang = Some(lang.into());
        self
    }

    /// Builder: set the node this diagnostic belongs to.
    pub fn for_node(mut self, name: impl Into<String>) -> Self {
        self.node_name = Some(name.into());
        self
    }

    /// Builder: set the originating file.
    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

impl From<CalcError> for Diagnostic {
    fn from(err: CalcError) -> Self {
        Diagnostic::error(err.code, err.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CalcError::undefined_var("profit");
        assert_eq!(err.to_string(), "[eval-error] undefined variable 'profit'");
    }

    #[test]
    fn test_codes_are_kebab_case() {
        for code in [
            codes::PARSE_ERROR,
            codes::DUPLICATE_NAME,
            codes::RESERVED_NAME_USED,
            codes::MISSING_REQUIRED_KEY,
            codes::INVALID_CONSTRAINT,
            codes::DEPENDENCY_UNRESOLVED,
            codes::CYCLE,
        ] {
            assert!(code
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == '-'));
        }
    }

    #[test]
    fn test_diagnostic_builders() {
        let diag = Diagnostic::error(codes::EVAL_ERROR, "boom")
            .at_line(12)
            .in_block("calc")
            .for_node("profit");
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.line, Some(12));
        assert_eq!(diag.block_lang.as_deref(), Some("calc"));
        assert_eq!(diag.node_name.as_deref(), Some("profit"));
    }

    #[test]
    fn test_diagnostic_serializes_camel_case() {
        let diag = Diagnostic::warning(codes::MISSING_SOURCE_DATA, "no rows supplied")
            .at_line(3)
            .in_block("data");
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["code"], "missing-source-data");
        assert_eq!(json["blockLang"], "data");
        assert!(json.get("nodeName").is_none());
    }

    #[test]
    fn test_error_to_diagnostic_keeps_code() {
        let diag: Diagnostic = CalcError::duplicate_record_key("total").into();
        assert_eq!(diag.code, codes::DUPLICATE_KEY);
        assert_eq!(diag.severity, Severity::Error);
    }
}
