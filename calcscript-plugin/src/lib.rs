//! Plugin registry for CalcScript.
//!
//! The [`FunctionPlugin`] trait itself lives in `calcscript-core` (values
//! hold functions); this crate owns registration and the frozen namespace
//! tree the evaluator mounts at the reserved root.

pub mod registry;

pub use registry::PluginRegistry;

/// Common imports for kernel crates.
pub mod prelude {
    pub use crate::registry::PluginRegistry;
    pub use calcscript_core::prelude::*;
}
