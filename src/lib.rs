//! Labelcraft: labeling configuration compiler and annotation model.
//!
//! A labeling interface is declared as an XML-like configuration. Labelcraft
//! compiles it into a typed element tree (expanding repeaters, resolving
//! task data, validating attributes and binding controls to the objects
//! they annotate), then maintains annotations against that tree: areas,
//! results, relations, suggestions, drafts and undo history, serialized to
//! and from the wire format hosts store.
//!
//! # Modules
//!
//! - [`config`]: Element registry and configuration compiler
//! - [`validation`]: Configuration validation and issue reporting
//! - [`tree`]: Bound element tree and name binding
//! - [`model`]: Areas, results, relations, regions and annotations
//! - [`history`]: Snapshot-based undo/redo
//! - [`store`]: Annotation lists for one task
//! - [`events`]: Notification sink and draft persistence boundary
//! - [`settings`]: Session settings
//! - [`error`]: Error types for labelcraft operations

pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod logging;
pub mod model;
pub mod settings;
pub mod store;
pub mod tree;
pub mod validation;

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

pub use error::LabelcraftError;

use config::ElementRegistry;
use events::NoopEvents;
use model::{Area, DeserializeOptions, RegionNode};
use settings::Settings;
use store::AnnotationStore;

/// The labelcraft CLI application.
#[derive(Parser)]
#[command(name = "labelcraft")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Compile and validate a labeling configuration.
    Validate(ValidateArgs),
    /// Load a results payload, repair it and print it back in canonical form.
    Normalize(NormalizeArgs),
    /// Print the regions of a results payload.
    Regions(RegionsArgs),
}

/// Arguments for the validate subcommand.
#[derive(clap::Args)]
struct ValidateArgs {
    /// Configuration file to validate.
    config: PathBuf,

    /// Task data (JSON) used to resolve `$variables` and repeaters.
    #[arg(long)]
    task: Option<PathBuf>,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    output: ReportFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

/// Arguments for the normalize subcommand.
#[derive(clap::Args)]
struct NormalizeArgs {
    /// Results file: a result array or an object with a `result` array.
    results: PathBuf,

    /// Labeling configuration the results were made with.
    #[arg(long)]
    config: PathBuf,

    /// Task data (JSON).
    #[arg(long)]
    task: Option<PathBuf>,

    /// Session settings (JSON or YAML).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Write the normalized results here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Arguments for the regions subcommand.
#[derive(clap::Args)]
struct RegionsArgs {
    /// Results file.
    results: PathBuf,

    /// Labeling configuration the results were made with.
    #[arg(long)]
    config: PathBuf,

    /// Task data (JSON).
    #[arg(long)]
    task: Option<PathBuf>,

    /// How to group the regions.
    #[arg(long, value_enum, default_value_t = Grouping::Parent)]
    group: Grouping,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Grouping {
    Parent,
    Labels,
}

/// Run the labelcraft CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), LabelcraftError> {
    let cli = Cli::parse();
    logging::init_logging(&logging::LogConfig::from_verbosity(cli.verbose));

    match cli.command {
        Some(Commands::Validate(args)) => run_validate(args),
        Some(Commands::Normalize(args)) => run_normalize(args),
        Some(Commands::Regions(args)) => run_regions(args),
        None => {
            println!("labelcraft {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Labeling configuration compiler and annotation model.");
            println!();
            println!("Run 'labelcraft --help' for usage information.");
            Ok(())
        }
    }
}

fn read_task(path: Option<&Path>) -> Result<Option<Value>, LabelcraftError> {
    let Some(path) = path else {
        return Ok(None);
    };
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| LabelcraftError::TaskJsonParse {
            path: path.to_path_buf(),
            source,
        })
}

fn open_store(
    config: &Path,
    task: Option<&Path>,
    settings: Settings,
) -> Result<AnnotationStore, LabelcraftError> {
    let text = fs::read_to_string(config)?;
    let task = read_task(task)?;
    AnnotationStore::new(
        &text,
        task.as_ref(),
        &ElementRegistry::standard(),
        settings,
        Rc::new(NoopEvents),
    )
}

/// Execute the validate subcommand.
fn run_validate(args: ValidateArgs) -> Result<(), LabelcraftError> {
    let store = open_store(&args.config, args.task.as_deref(), Settings::default())?;
    let report = store.report().clone();

    match args.output {
        ReportFormat::Json => {
            let body = serde_json::json!({
                "error_count": report.error_count(),
                "warning_count": report.warning_count(),
                "issues": report.issues,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        ReportFormat::Text => print!("{}", report),
    }

    let has_errors = report.error_count() > 0;
    let has_warnings = report.warning_count() > 0;

    if has_errors || (args.strict && has_warnings) {
        Err(LabelcraftError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

/// Execute the normalize subcommand.
fn run_normalize(args: NormalizeArgs) -> Result<(), LabelcraftError> {
    let settings = match &args.settings {
        Some(path) => Settings::from_path(path)?,
        None => Settings::default(),
    };
    let mut store = open_store(&args.config, args.task.as_deref(), settings)?;
    let raw = model::wire::read_results_json(&args.results)?;

    let id = store.create_annotation();
    let annotation = store
        .annotation_mut(&id)
        .ok_or_else(|| LabelcraftError::UnknownAnnotation { id: id.to_string() })?;
    if !annotation.deserialize_results(&raw, DeserializeOptions::default()) {
        for issue in &annotation.issues().issues {
            eprintln!("{}", issue);
        }
        return Err(LabelcraftError::Deserialization {
            message: format!("could not load {}", args.results.display()),
        });
    }

    let items = annotation.serialize();
    match &args.output {
        Some(path) => model::wire::write_results_json(path, &items)?,
        None => println!("{}", serde_json::to_string_pretty(&items)?),
    }
    Ok(())
}

/// Execute the regions subcommand.
fn run_regions(args: RegionsArgs) -> Result<(), LabelcraftError> {
    let mut store = open_store(&args.config, args.task.as_deref(), Settings::default())?;
    let raw = model::wire::read_results_json(&args.results)?;
    let id = store.add_annotation(&raw, None);
    let annotation = store
        .annotation(&id)
        .ok_or_else(|| LabelcraftError::UnknownAnnotation { id: id.to_string() })?;
    for issue in &annotation.issues().issues {
        eprintln!("{}", issue);
    }

    let tree = annotation.tree();
    let describe = |area: &Area| {
        let labels: Vec<&str> = area
            .selected_labels(tree)
            .into_iter()
            .map(|(_, label)| label)
            .collect();
        if labels.is_empty() {
            format!("{} [{}] {}", area.raw_id(), area.object, area.shape.kind.name())
        } else {
            format!(
                "{} [{}] {} {}",
                area.raw_id(),
                area.object,
                area.shape.kind.name(),
                labels.join(", ")
            )
        }
    };

    let regions = annotation.regions();
    match args.group {
        Grouping::Parent => {
            for node in regions.as_tree(describe) {
                print_node(&node, 0);
            }
        }
        Grouping::Labels => {
            for group in regions.as_labels_tree(describe) {
                println!("{}", group.label.as_deref().unwrap_or("(no label)"));
                for line in group.regions {
                    println!("  {}", line);
                }
            }
        }
    }
    Ok(())
}

fn print_node(node: &RegionNode<String>, depth: usize) {
    println!("{}{}", "  ".repeat(depth), node.item);
    for child in &node.children {
        print_node(child, depth + 1);
    }
}
