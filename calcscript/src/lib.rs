//! CalcScript - reactive calculation documents.
//!
//! A document is a stream of fenced blocks: typed `inputs`, tabular `data`,
//! and `calc` declarations. [`assemble`] parses the known kinds into a
//! [`Program`], [`evaluate`] runs its nodes in dependency order against the
//! standard library, and [`infer`] classifies each name's result shape for
//! renderers. [`CalcScript`] bundles the three passes behind one registry.

pub mod ast;
pub mod compile;
pub mod datablock;
pub mod eval;
pub mod extract;
pub mod infer;
pub mod input;
pub mod lexer;
pub mod parser;
pub mod program;

pub use eval::{evaluate, CellPatch, EvalOptions, Evaluation};
pub use infer::{infer, Inferred};
pub use program::{assemble, Block, Program};

use std::collections::BTreeMap;
use std::sync::Arc;

use calcscript_core::{Diagnostic, Severity, Value};
use calcscript_plugin::PluginRegistry;

/// The frozen namespace root every document sees the library under.
pub const ROOT_NAME: &str = "calc";

/// All three passes over one document.
#[derive(Debug, Clone)]
pub struct DocumentResult {
    pub program: Program,
    pub values: BTreeMap<String, Value>,
    pub types: BTreeMap<String, Inferred>,
    pub diagnostics: Vec<Diagnostic>,
}

impl DocumentResult {
    /// True when any diagnostic is an error, meaning at least one entity
    /// was dropped or produced no value.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

/// Main CalcScript engine.
pub struct CalcScript {
    registry: Arc<PluginRegistry>,
}

impl CalcScript {
    pub fn new(registry: PluginRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn with_standard_library() -> Self {
        let mut registry = PluginRegistry::new();
        registry = calcscript_std::load_standard_library(registry);
        registry = calcscript_finance::load_finance_library(registry);
        registry = calcscript_stats::load_stats_library(registry);
        registry = calcscript_table::load_table_library(registry);
        Self::new(registry)
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Assemble, evaluate and infer in one pass. Diagnostics from assembly
    /// and evaluation come back merged, in that order.
    pub fn run(
        &self,
        front_matter: Option<String>,
        blocks: Vec<Block>,
        options: &EvalOptions,
    ) -> DocumentResult {
        let (program, mut diagnostics) = program::assemble(front_matter, blocks);
        let evaluation = eval::evaluate(&program, &self.registry, options);
        diagnostics.extend(evaluation.diagnostics);
        let types = infer::infer(&program);
        DocumentResult {
            program,
            values: evaluation.values,
            types,
            diagnostics,
        }
    }
}

impl Default for CalcScript {
    fn default() -> Self {
        Self::with_standard_library()
    }
}
