//! doctree engine data compiler
//!
//! Walks a built forest in lockstep with per-entity-type record collections,
//! attaches formulas to the heads of the entity types they update and finally
//! replaces every path (structural fields and dotted tokens in formula text)
//! by a compact reference code.

pub mod compiler;
pub mod context;
pub mod formulas;
pub mod output;
pub mod pipeline;
pub mod references;

pub use compiler::{compile, Compilation, CompileOptions, EngineCompiler, PlaceholderPolicy};
pub use context::CompilationContext;
pub use formulas::{formula_paths, path_tokens};
pub use output::{
    ChildKey, CompiledDocument, DocumentKey, EngineHead, EngineItem, FieldValue, FormulaRef,
    FormulaUpdate, OutputKeys,
};
pub use pipeline::{run, run_from_sources, Artifacts, PipelineError, PipelineInputs, RunSummary, SourceInputs};
pub use references::{compile_references, reference_code, ReferenceTable, Substitution};
