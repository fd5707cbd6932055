//! doctree CLI
//!
//! - `tree`: build the entity forest and write `forest.json`
//! - `compile`: compile a forest plus records and formulas into `engine.json`
//! - `run`: snapshot directory → both artifacts in one pass
//! - `inspect`: print the outline of a built forest

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use doctree_catalog::load::{
    load_catalogue, load_formulas, load_mappings, load_records, load_translations, read_json,
    write_json,
};
use doctree_catalog::{assemble_catalogue, LogProgress, SnapshotSource};
use doctree_engine::{
    compile, compile_references, run_from_sources, ChildKey, DocumentKey, PlaceholderPolicy,
    RunSummary, SourceInputs,
};
use doctree_tree::{build_forest, Forest};

mod config;
mod logging;

use config::{Overrides, RunConfig, ENGINE_FILE, FOREST_FILE};

#[derive(Parser)]
#[command(name = "doctree")]
#[command(
    author,
    version,
    about = "doctree: entity-type forests and engine data for formula evaluation"
)]
struct Cli {
    /// JSON run configuration; environment variables and flags override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the entity forest and write it as JSON.
    Tree {
        /// Catalogue file (`{"all_doctypes": {...}}` or a bare entity map).
        #[arg(long, conflicts_with = "snapshot")]
        catalogue: Option<PathBuf>,
        /// Snapshot directory to assemble the catalogue from.
        #[arg(long)]
        snapshot: Option<PathBuf>,
        #[command(flatten)]
        inputs: InputArgs,
        /// Output file (default: <output_dir>/forest.json).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Compile a built forest and a record store into engine data.
    Compile {
        #[arg(long)]
        forest: PathBuf,
        #[arg(long)]
        records: PathBuf,
        #[arg(long)]
        formulas: Option<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
        /// Output file (default: <output_dir>/engine.json).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Read a snapshot directory and write both the forest and the engine data.
    Run {
        #[arg(long)]
        snapshot: Option<PathBuf>,
        #[command(flatten)]
        inputs: InputArgs,
        #[arg(long)]
        formulas: Option<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
        /// Directory receiving forest.json and engine.json.
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Print an indented outline of a forest file.
    Inspect {
        forest: PathBuf,
        /// Hide field nodes.
        #[arg(long)]
        entities_only: bool,
    },
}

#[derive(Args, Default)]
struct InputArgs {
    /// Mandatory mappings file (`[{child, parent, filters}]`).
    #[arg(long)]
    mappings: Option<PathBuf>,
    /// Translations file (`{term: translation}`).
    #[arg(long)]
    translations: Option<PathBuf>,
    /// Restrict snapshot listing to one module.
    #[arg(long)]
    module: Option<String>,
    /// Entity types to leave out (repeatable).
    #[arg(long = "ignore")]
    ignored: Vec<String>,
}

#[derive(Args, Default)]
struct OutputArgs {
    /// Key holding nested heads inside items: childs | data.
    #[arg(long)]
    children_key: Option<ChildKey>,
    /// Key holding the top-level heads: data | dados.
    #[arg(long)]
    data_key: Option<DocumentKey>,
    /// Placeholder scalars: null | typed-defaults.
    #[arg(long)]
    placeholder: Option<PlaceholderPolicy>,
}

impl InputArgs {
    fn overrides(self) -> Overrides {
        Overrides {
            mappings: self.mappings,
            translations: self.translations,
            module: self.module,
            ignored_entity_types: self.ignored,
            ..Overrides::default()
        }
    }
}

impl OutputArgs {
    fn apply(self, overrides: &mut Overrides) {
        overrides.children_key = self.children_key;
        overrides.document_key = self.data_key;
        overrides.placeholder = self.placeholder;
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let mut config = RunConfig::load(cli.config.as_deref())
        .with_context(|| "failed to load run configuration")?;
    config.apply_env();

    match cli.command {
        Commands::Tree {
            catalogue,
            snapshot,
            inputs,
            out,
        } => {
            let mut overrides = inputs.overrides();
            overrides.snapshot_dir = snapshot;
            config.apply_overrides(overrides);
            let out = out.unwrap_or_else(|| config.output_dir().join(FOREST_FILE));
            cmd_tree(&config, catalogue.as_deref(), &out)?;
        }
        Commands::Compile {
            forest,
            records,
            formulas,
            output,
            out,
        } => {
            let mut overrides = Overrides {
                formulas,
                ..Overrides::default()
            };
            output.apply(&mut overrides);
            config.apply_overrides(overrides);
            let out = out.unwrap_or_else(|| config.output_dir().join(ENGINE_FILE));
            cmd_compile(&config, &forest, &records, &out)?;
        }
        Commands::Run {
            snapshot,
            inputs,
            formulas,
            output,
            out_dir,
        } => {
            let mut overrides = inputs.overrides();
            overrides.snapshot_dir = snapshot;
            overrides.formulas = formulas;
            overrides.output_dir = out_dir;
            output.apply(&mut overrides);
            config.apply_overrides(overrides);
            cmd_run(&config)?;
        }
        Commands::Inspect {
            forest,
            entities_only,
        } => cmd_inspect(&forest, entities_only)?,
    }

    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_tree(config: &RunConfig, catalogue: Option<&Path>, out: &Path) -> Result<()> {
    let catalogue = match catalogue {
        Some(path) => {
            println!("{} catalogue {}", "Loading".green().bold(), path.display());
            load_catalogue(path)?
        }
        None => {
            let dir = config.require_snapshot()?;
            println!("{} snapshot {}", "Reading".green().bold(), dir.display());
            let snapshot = SnapshotSource::open(dir)?;
            assemble_catalogue(&snapshot, &config.catalogue_options(), &mut LogProgress)?
        }
    };
    let mappings = load_mappings(config.mappings.as_deref())?;
    let translations = load_translations(config.translations.as_deref())?;

    let forest = build_forest(&catalogue, &mappings, &translations)?;
    write_json(out, &forest)?;

    println!(
        "{} {} entity types → {} roots, {} nodes",
        "Built".green().bold(),
        catalogue.len(),
        forest.roots().len(),
        forest.len()
    );
    println!("  {} {}", "→".cyan(), out.display());
    Ok(())
}

fn cmd_compile(config: &RunConfig, forest: &Path, records: &Path, out: &Path) -> Result<()> {
    println!("{} forest {}", "Loading".green().bold(), forest.display());
    let forest: Forest =
        read_json(forest).with_context(|| format!("failed to read forest {}", forest.display()))?;
    let store = load_records(records)?;
    let formulas = load_formulas(config.formulas.as_deref())?;

    let compilation = compile(&forest, &formulas, &store, config.compile_options());
    let document = compile_references(compilation.heads, &compilation.references);
    write_json(out, &document.to_json(config.output_keys()))?;

    println!(
        "{} {} heads, {} references",
        "Compiled".green().bold(),
        document.head_count(),
        document.references.len()
    );
    println!("  {} {}", "→".cyan(), out.display());
    Ok(())
}

fn cmd_run(config: &RunConfig) -> Result<()> {
    let dir = config.require_snapshot()?;
    println!("{} snapshot {}", "Reading".green().bold(), dir.display());
    let snapshot = SnapshotSource::open(dir)?;
    let mappings = load_mappings(config.mappings.as_deref())?;
    let translations = load_translations(config.translations.as_deref())?;
    let formulas = load_formulas(config.formulas.as_deref())?;
    let catalogue = config.catalogue_options();

    let inputs = SourceInputs {
        metadata: &snapshot,
        records: &snapshot,
        catalogue: &catalogue,
        mappings: &mappings,
        translations: &translations,
        formulas: &formulas,
    };
    let artifacts = run_from_sources(&inputs, config.compile_options(), &mut LogProgress)?;

    let out_dir = config.output_dir();
    let forest_path = out_dir.join(FOREST_FILE);
    let engine_path = out_dir.join(ENGINE_FILE);
    write_json(&forest_path, &artifacts.forest)?;
    write_json(&engine_path, &artifacts.document.to_json(config.output_keys()))?;

    print_summary(&artifacts.summary);
    println!("  {} {}", "→".cyan(), forest_path.display());
    println!("  {} {}", "→".cyan(), engine_path.display());
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!(
        "{} {} entity types, {} roots, {} entity nodes, {} field nodes",
        "Forest".green().bold(),
        summary.entity_types,
        summary.roots,
        summary.entity_nodes,
        summary.field_nodes
    );
    println!(
        "{} {} heads, {} items, {} references, {} formulas",
        "Engine".green().bold(),
        summary.heads,
        summary.items,
        summary.references,
        summary.formulas_attached
    );
    if summary.unresolved_formula_targets > 0 {
        println!(
            "{} {} formula rows target fields absent from the forest",
            "warning:".yellow().bold(),
            summary.unresolved_formula_targets
        );
    }
    for token in &summary.unresolved_formula_tokens {
        println!("{} unresolved formula reference {}", "warning:".yellow().bold(), token);
    }
}

fn cmd_inspect(path: &Path, entities_only: bool) -> Result<()> {
    let forest: Forest =
        read_json(path).with_context(|| format!("failed to read forest {}", path.display()))?;

    for id in forest.preorder() {
        let node = forest.node(id);
        if entities_only && node.is_field() {
            continue;
        }
        let indent = "  ".repeat(forest.depth(id));
        if node.is_entity() {
            println!(
                "{indent}{} {}",
                node.description.bold(),
                format!("({})", node.path).dimmed()
            );
        } else {
            println!(
                "{indent}{} {} {}",
                "-".dimmed(),
                node.description,
                format!("[{}]", node.node_type).cyan()
            );
        }
    }
    println!(
        "{} roots, {} entity nodes, {} field nodes",
        forest.roots().len(),
        forest.entity_count(),
        forest.field_count()
    );
    Ok(())
}
