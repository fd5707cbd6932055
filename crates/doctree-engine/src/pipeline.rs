//! Build → compile → substitute, with progress reporting.

use std::collections::HashSet;

use doctree_catalog::{
    assemble_catalogue, collect_records, CatalogError, CatalogueOptions, EntityCatalogue,
    FormulaGroup, MandatoryMapping, MetadataSource, ProgressSink, RecordSource, RecordStore,
    Translations,
};
use doctree_tree::{build_forest, BuildError, Forest};
use serde::Serialize;

use crate::compiler::{CompileOptions, EngineCompiler};
use crate::formulas::formula_paths;
use crate::output::CompiledDocument;
use crate::references::compile_references;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Build(#[from] BuildError),
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineInputs<'a> {
    pub catalogue: &'a EntityCatalogue,
    pub mappings: &'a [MandatoryMapping],
    pub translations: &'a Translations,
    pub formulas: &'a [FormulaGroup],
    pub records: &'a RecordStore,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub entity_types: usize,
    pub roots: usize,
    pub entity_nodes: usize,
    pub field_nodes: usize,
    pub heads: usize,
    pub items: usize,
    pub references: usize,
    pub formulas_attached: usize,
    pub unresolved_formula_targets: usize,
    /// Dotted formula tokens that are not paths of the forest.
    pub unresolved_formula_tokens: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Artifacts {
    pub forest: Forest,
    pub document: CompiledDocument,
    pub summary: RunSummary,
}

pub fn run(
    inputs: &PipelineInputs<'_>,
    options: CompileOptions,
    progress: &mut dyn ProgressSink,
) -> Result<Artifacts, PipelineError> {
    progress.emit(&format!(
        "building forest from {} entity types",
        inputs.catalogue.len()
    ));
    let forest = build_forest(inputs.catalogue, inputs.mappings, inputs.translations)?;
    let mut summary = RunSummary {
        entity_types: inputs.catalogue.len(),
        roots: forest.roots().len(),
        entity_nodes: forest.entity_count(),
        field_nodes: forest.field_count(),
        ..RunSummary::default()
    };
    progress.emit(&format!(
        "forest built: {} roots, {} entity nodes, {} field nodes",
        summary.roots, summary.entity_nodes, summary.field_nodes
    ));

    progress.emit(&format!(
        "compiling engine data from {} records",
        inputs.records.record_count()
    ));
    let compiler = EngineCompiler::new(&forest, inputs.formulas, inputs.records, options);
    let compilation = compiler.compile();
    summary.unresolved_formula_targets = compiler.unresolved_targets().len();

    let paths: HashSet<&str> = forest
        .preorder()
        .map(|id| forest.node(id).path.as_str())
        .collect();
    for token in formula_paths(inputs.formulas) {
        if !paths.contains(token.as_str()) {
            tracing::warn!(token = %token, "unresolved formula reference");
            progress.emit(&format!("unresolved formula reference: {token}"));
            summary.unresolved_formula_tokens.push(token);
        }
    }

    let document = compile_references(compilation.heads, &compilation.references);
    for head in document.data.iter().flat_map(|h| h.walk()) {
        summary.heads += 1;
        summary.items += head.data.len();
        summary.formulas_attached += head.formulas.len();
    }
    summary.references = document.references.len();
    progress.emit(&format!(
        "compiled {} heads, {} items, {} references",
        summary.heads, summary.items, summary.references
    ));

    Ok(Artifacts {
        forest,
        document,
        summary,
    })
}

/// Inputs of a run whose catalogue and records still have to be fetched.
pub struct SourceInputs<'a> {
    pub metadata: &'a dyn MetadataSource,
    pub records: &'a dyn RecordSource,
    pub catalogue: &'a CatalogueOptions,
    pub mappings: &'a [MandatoryMapping],
    pub translations: &'a Translations,
    pub formulas: &'a [FormulaGroup],
}

/// Fetch the catalogue and records, then `run`.
pub fn run_from_sources(
    inputs: &SourceInputs<'_>,
    options: CompileOptions,
    progress: &mut dyn ProgressSink,
) -> Result<Artifacts, PipelineError> {
    let catalogue = assemble_catalogue(inputs.metadata, inputs.catalogue, progress)?;
    let records = collect_records(inputs.records, &catalogue, inputs.mappings, progress)?;
    run(
        &PipelineInputs {
            catalogue: &catalogue,
            mappings: inputs.mappings,
            translations: inputs.translations,
            formulas: inputs.formulas,
            records: &records,
        },
        options,
        progress,
    )
}
