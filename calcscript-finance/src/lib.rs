//! Financial functions for CalcScript.
//!
//! Mounted as `finance.*`. Deterministic by construction: the only
//! iterative kernel (irr) brackets on a fixed candidate ladder and refines
//! by bisection, so the same document always reports the same rate.

pub mod annuity;
pub mod cashflow;
pub mod helpers;
pub mod rates;

use calcscript_plugin::PluginRegistry;

/// Register the finance library.
pub fn load_finance_library(registry: PluginRegistry) -> PluginRegistry {
    registry
        // Rates
        .with_function(rates::ToMonthlyRate)
        // Annuities
        .with_function(annuity::Pmt)
        .with_function(annuity::Ipmt)
        .with_function(annuity::Ppmt)
        .with_function(annuity::Pv)
        .with_function(annuity::Fv)
        // Cash flows
        .with_function(cashflow::Npv)
        .with_function(cashflow::Irr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calcscript_core::{FnContext, Value};

    #[test]
    fn test_library_registers_under_finance() {
        let registry = load_finance_library(PluginRegistry::new());
        assert_eq!(registry.len(), 8);
        for name in ["toMonthlyRate", "pmt", "ipmt", "ppmt", "pv", "fv", "npv", "irr"] {
            assert!(registry.get("finance", name).is_some(), "{} missing", name);
        }
    }

    #[test]
    fn test_call_through_registry() {
        let registry = load_finance_library(PluginRegistry::new());
        let pmt = registry.get("finance", "pmt").unwrap();
        let out = pmt
            .call(
                &[Value::Number(0.0), Value::Number(10.0), Value::Number(-1000.0)],
                &FnContext::fixed(),
            )
            .unwrap();
        assert_eq!(out, Value::Number(100.0));
    }
}
