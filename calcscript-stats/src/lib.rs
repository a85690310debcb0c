//! Statistical functions for CalcScript, mounted as `stats.*`.
//!
//! All sample statistics use the n-1 divisor and insist on at least two
//! values; order statistics interpolate linearly between closest ranks.

pub mod bivariate;
pub mod central;
pub mod dispersion;
pub mod helpers;
pub mod position;
pub mod regression;

use calcscript_plugin::PluginRegistry;

/// Register the stats library.
pub fn load_stats_library(registry: PluginRegistry) -> PluginRegistry {
    registry
        // Central tendency
        .with_function(central::Mean)
        .with_function(central::Median)
        // Dispersion
        .with_function(dispersion::Variance)
        .with_function(dispersion::Stdev)
        // Order statistics
        .with_function(position::Percentile)
        .with_function(position::Quartiles)
        // Paired series
        .with_function(bivariate::Covariance)
        .with_function(bivariate::Correlation)
        // Regression
        .with_function(regression::LinearFit)
        .with_function(regression::Predict)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_registers_under_stats() {
        let registry = load_stats_library(PluginRegistry::new());
        assert_eq!(registry.len(), 10);
        for name in [
            "mean",
            "median",
            "variance",
            "stdev",
            "percentile",
            "quartiles",
            "covariance",
            "correlation",
            "linearFit",
            "predict",
        ] {
            assert!(registry.get("stats", name).is_some(), "{} missing", name);
        }
    }
}
