//! Table algebra and keyed lookups for CalcScript.
//!
//! `table.*` reshapes lists of records (group, aggregate, join, sort);
//! `lookup.*` probes them by key, either through a prebuilt index or a
//! linear scan. All operations preserve first-seen / document order and
//! never mutate their inputs.

pub mod group;
pub mod helpers;
pub mod join;
pub mod lookup;
pub mod sort;

use calcscript_plugin::PluginRegistry;

/// Register the table and lookup libraries.
pub fn load_table_library(registry: PluginRegistry) -> PluginRegistry {
    registry
        // Reshaping
        .with_function(group::GroupBy)
        .with_function(group::Agg)
        .with_function(join::Join)
        .with_function(sort::SortBy)
        // Keyed access
        .with_function(lookup::Index)
        .with_function(lookup::Get)
        .with_function(lookup::Xlookup)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_registers_both_namespaces() {
        let registry = load_table_library(PluginRegistry::new());
        assert_eq!(registry.len(), 7);
        for name in ["groupBy", "agg", "join", "sortBy"] {
            assert!(registry.get("table", name).is_some(), "{} missing", name);
        }
        for name in ["index", "get", "xlookup"] {
            assert!(registry.get("lookup", name).is_some(), "{} missing", name);
        }
    }
}
