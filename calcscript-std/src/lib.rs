//! The CalcScript standard library.
//!
//! General-purpose namespaces (`math`, `text`, `logic`, `array`, `data`,
//! `date`, `percent`, `assert`); the finance, stats and table namespaces
//! live in their own crates.

pub mod array;
pub mod assert;
pub mod data;
pub mod date;
pub mod helpers;
pub mod logic;
pub mod math;
pub mod percent;
pub mod text;

use calcscript_plugin::PluginRegistry;

/// Register the general-purpose standard library.
pub fn load_standard_library(registry: PluginRegistry) -> PluginRegistry {
    registry
        // Numbers
        .with_function(math::Abs)
        .with_function(math::Round)
        .with_function(math::Floor)
        .with_function(math::Ceil)
        .with_function(math::Sqrt)
        .with_function(math::Min)
        .with_function(math::Max)
        .with_function(math::Sum)
        .with_function(math::Clamp)
        // Text
        .with_function(text::Upper)
        .with_function(text::Lower)
        .with_function(text::Trim)
        .with_function(text::Len)
        .with_function(text::Join)
        .with_function(text::Replace)
        .with_function(text::Contains)
        // Logic
        .with_function(logic::Not)
        .with_function(logic::All)
        .with_function(logic::Any)
        // Lists
        .with_function(array::Len)
        .with_function(array::First)
        .with_function(array::Last)
        .with_function(array::Map)
        .with_function(array::Filter)
        .with_function(array::Unique)
        .with_function(array::Range)
        // Null handling
        .with_function(data::Coalesce)
        .with_function(data::FillNull)
        .with_function(data::DropNull)
        .with_function(data::IsNull)
        .with_function(data::Count)
        // Calendar
        .with_function(date::Parse)
        .with_function(date::Format)
        .with_function(date::Today)
        .with_function(date::Now)
        .with_function(date::Year)
        .with_function(date::Month)
        .with_function(date::Day)
        .with_function(date::AddDays)
        .with_function(date::AddMonths)
        .with_function(date::DiffDays)
        // Percentages
        .with_function(percent::Of)
        .with_function(percent::Ratio)
        .with_function(percent::FromRatio)
        .with_function(percent::Change)
        // Assertions
        .with_function(assert::That)
        .with_function(assert::Equal)
        .with_function(assert::Near)
}
