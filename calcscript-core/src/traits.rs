//! The function plugin trait.
//!
//! Every standard-library function is a unit struct implementing
//! [`FunctionPlugin`]. The trait lives here rather than in the registry
//! crate because [`crate::Value`] holds functions first-class
//! (`Value::Function`), including closures built by the evaluator.
//!
//! Calls are pure and synchronous. The only ambient state a function may
//! read is the injected clock in [`FnContext`]; two calls with equal
//! arguments and equal context return equal results.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;

use crate::error::CalcError;
use crate::value::Value;

/// Metadata about a function argument.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ArgMeta {
    pub name: &'static str,
    pub typ: &'static str,
    pub description: &'static str,
    pub optional: bool,
}

impl ArgMeta {
    pub const fn required(
        name: &'static str,
        typ: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            typ,
            description,
            optional: false,
        }
    }

    pub const fn optional(
        name: &'static str,
        typ: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            typ,
            description,
            optional: true,
        }
    }
}

/// Metadata for a function plugin.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FunctionMeta {
    pub name: &'static str,
    /// The namespace the function mounts under, e.g. `finance`.
    pub namespace: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
    pub args: &'static [ArgMeta],
    pub returns: &'static str,
}

/// Ambient context for a call: the pass's injected clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FnContext {
    /// "Now" for this pass. The core never reads the wall clock; the
    /// embedder decides what time it is.
    pub now: NaiveDateTime,
}

impl FnContext {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now }
    }

    /// A fixed context for tests: 2024-01-15T12:00:00.
    pub fn fixed() -> Self {
        let now = NaiveDate::from_ymd_opt(2024, 1, 15)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap_or_default();
        Self { now }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date()
    }
}

/// A pure, deterministic function.
pub trait FunctionPlugin: Send + Sync {
    fn meta(&self) -> FunctionMeta;
    fn call(&self, args: &[Value], ctx: &FnContext) -> Result<Value, CalcError>;
}

impl fmt::Debug for dyn FunctionPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.meta().name)
    }
}
