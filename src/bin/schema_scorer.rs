//! schema-scorer - temporal order scoring CLI
//!
//! ```bash
//! # Extract and close order relations (one output table per schema file)
//! schema-scorer extract --task task1 -s cmu_ce1001.json -e cmu_ce1001.events.tsv -o orders/
//!
//! # Turn a Graph G document into a gold edge table
//! schema-scorer graph --graph ce1001_graph_g.json --output ce1001_gold.tsv
//!
//! # Task 1: precision / recall / F against temporal annotations
//! schema-scorer task1 --orders orders/cmu_ce1001.tsv --mapping cmu_ce1001.map.tsv \
//!     --annotations ce1001_temporal.tsv --team cmu
//!
//! # Task 2: recall against Graph G
//! schema-scorer task2 --orders orders/cmu_ce1001.tsv --gold ce1001_gold.tsv --team cmu
//! ```
//!
//! Logging goes to stderr and honours `RUST_LOG`.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use is_terminal::IsTerminal;
use tracing_subscriber::EnvFilter;

use schema_scorer::order::{
    ClosureStats, GoldGraph, Task, Task1Result, Task1Stats, Task2Result, Task2Stats,
};
use schema_scorer::pipeline::{self, file_id_of, BatchReport};
use schema_scorer::table::Table;
use schema_scorer::ScorerConfig;

/// Temporal order extraction and scoring for event schema evaluations
#[derive(Parser)]
#[command(name = "schema-scorer", author, version, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML config file (default: <config dir>/schema-scorer/config.toml if present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log closure rounds and other details
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract order pairs from schema documents and close them transitively
    #[command(visible_alias = "x")]
    Extract(ExtractArgs),

    /// Convert a Graph G document into a gold edge table
    Graph(GraphArgs),

    /// Score order tables against temporal annotations (precision/recall/F)
    Task1(Task1Args),

    /// Score order tables against Graph G (recall)
    Task2(Task2Args),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct ExtractArgs {
    /// Task the submissions belong to (task1 or task2)
    #[arg(long, default_value = "task1")]
    task: String,

    /// Schema JSON documents (repeatable)
    #[arg(short, long = "schema", value_name = "PATH", required = true)]
    schemas: Vec<PathBuf>,

    /// Event tables, one per schema document, in the same order
    #[arg(short, long = "events", value_name = "PATH", required = true)]
    events: Vec<PathBuf>,

    /// Directory for the closed order tables
    #[arg(short, long, value_name = "DIR")]
    output_dir: PathBuf,
}

#[derive(Parser, Debug)]
struct GraphArgs {
    /// Graph G JSON document
    #[arg(short, long, value_name = "PATH")]
    graph: PathBuf,

    /// Gold edge table to write
    #[arg(short, long, value_name = "PATH")]
    output: PathBuf,
}

#[derive(Parser, Debug)]
struct Task1Args {
    /// Closed order tables (repeatable)
    #[arg(long = "orders", value_name = "PATH", required = true)]
    orders: Vec<PathBuf>,

    /// Event-to-reference mappings, one per order table, in the same order
    #[arg(long = "mapping", value_name = "PATH", required = true)]
    mappings: Vec<PathBuf>,

    /// Temporal annotation table for the complex event
    #[arg(long, value_name = "PATH")]
    annotations: PathBuf,

    #[command(flatten)]
    report: ReportArgs,
}

#[derive(Parser, Debug)]
struct Task2Args {
    /// Closed order tables (repeatable)
    #[arg(long = "orders", value_name = "PATH", required = true)]
    orders: Vec<PathBuf>,

    /// Gold edge table for the complex event
    #[arg(long, value_name = "PATH", conflicts_with = "graph", required_unless_present = "graph")]
    gold: Option<PathBuf>,

    /// Graph G JSON document, instead of --gold
    #[arg(long, value_name = "PATH")]
    graph: Option<PathBuf>,

    #[command(flatten)]
    report: ReportArgs,
}

#[derive(clap::Args, Debug)]
struct ReportArgs {
    /// Directory for assessed order tables
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Stats table to write (default: stdout)
    #[arg(long, value_name = "PATH")]
    stats: Option<PathBuf>,

    /// Team name for the aggregate row
    #[arg(long, default_value = "all")]
    team: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Extract(args) => cmd_extract(args, &config),
        Commands::Graph(args) => cmd_graph(args),
        Commands::Task1(args) => cmd_task1(args, &config),
        Commands::Task2(args) => cmd_task2(args, &config),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "schema-scorer", &mut io::stdout());
            Ok(())
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", color("31", "error:"), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(quiet: bool, verbose: bool) {
    let filter = if quiet {
        EnvFilter::new("warn")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // A second init (tests driving main twice) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<ScorerConfig, String> {
    if let Some(path) = path {
        return ScorerConfig::load(path).map_err(|e| e.to_string());
    }
    let default_path = dirs::config_dir().map(|d| d.join("schema-scorer").join("config.toml"));
    match default_path {
        Some(p) if p.exists() => {
            log::debug!("using config {}", p.display());
            ScorerConfig::load(&p).map_err(|e| e.to_string())
        }
        _ => Ok(ScorerConfig::default()),
    }
}

fn cmd_extract(args: ExtractArgs, config: &ScorerConfig) -> Result<(), String> {
    let task: Task = args.task.parse().map_err(|e| format!("{}", e))?;
    if args.schemas.len() != args.events.len() {
        return Err(format!(
            "got {} --schema files but {} --events tables",
            args.schemas.len(),
            args.events.len()
        ));
    }
    std::fs::create_dir_all(&args.output_dir)
        .map_err(|e| format!("Failed to create {}: {}", args.output_dir.display(), e))?;

    let output_dir = args.output_dir.as_path();
    let units = args.schemas.iter().zip(&args.events).map(|(schema, events)| {
        let file_id = file_id_of(schema);
        let unit = {
            let file_id = file_id.clone();
            move || -> schema_scorer::Result<ClosureStats> {
                let (relation, stats) =
                    pipeline::extract_file(&file_id, task, schema, events, config)?;
                relation
                    .to_table()?
                    .write(output_dir.join(format!("{}.tsv", file_id)))?;
                Ok(stats)
            }
        };
        (file_id, unit)
    });
    let report = pipeline::run_batch(units);

    let mut summary = Table::new(["file_id", "asserted", "inferred", "rounds"]);
    for (file_id, stats) in &report.succeeded {
        summary
            .push_row([
                file_id.clone(),
                stats.asserted.to_string(),
                stats.inferred.to_string(),
                stats.rounds.to_string(),
            ])
            .map_err(|e| e.to_string())?;
    }
    print!("{}", summary.to_tsv());
    finish(&report)
}

fn cmd_graph(args: GraphArgs) -> Result<(), String> {
    let gold = pipeline::extract_graph_file(&file_id_of(&args.graph), &args.graph)
        .map_err(|e| e.to_string())?;
    gold.to_table()
        .and_then(|t| t.write(&args.output))
        .map_err(|e| format!("Failed to write {}: {}", args.output.display(), e))?;
    eprintln!(
        "{} wrote {} gold edges to {}",
        color("32", "✓"),
        gold.len(),
        args.output.display()
    );
    Ok(())
}

fn cmd_task1(args: Task1Args, config: &ScorerConfig) -> Result<(), String> {
    if args.orders.len() != args.mappings.len() {
        return Err(format!(
            "got {} --orders tables but {} --mapping tables",
            args.orders.len(),
            args.mappings.len()
        ));
    }
    let reference =
        pipeline::load_task1_reference(&args.annotations).map_err(|e| e.to_string())?;
    let output_dir = prepare_output_dir(args.report.output_dir.as_deref())?;

    let reference = &reference;
    let units = args.orders.iter().zip(&args.mappings).map(|(orders, mapping)| {
        let file_id = file_id_of(orders);
        let unit = {
            let file_id = file_id.clone();
            move || -> schema_scorer::Result<Task1Result> {
                let result =
                    pipeline::score_task1_file(&file_id, orders, mapping, reference, config)?;
                if let Some(dir) = output_dir {
                    result
                        .order_table()?
                        .write(dir.join(format!("{}.task1.tsv", file_id)))?;
                }
                Ok(result)
            }
        };
        (file_id, unit)
    });
    let report = pipeline::run_batch(units);

    let files: Vec<Task1Stats> = report.succeeded.iter().map(|(_, r)| r.file.clone()).collect();
    let mut rows = vec![Task1Stats::aggregate_team(&args.report.team, &files)];
    for (_, result) in &report.succeeded {
        rows.extend(result.stats_rows().into_iter().map(|mut s| {
            s.scope = s.scope.with_team(args.report.team.as_str());
            s
        }));
    }
    let table = Task1Stats::to_table(&rows).map_err(|e| e.to_string())?;
    emit_stats(&table, args.report.stats.as_deref())?;
    finish(&report)
}

fn cmd_task2(args: Task2Args, config: &ScorerConfig) -> Result<(), String> {
    let gold = match (&args.gold, &args.graph) {
        (Some(path), _) => GoldGraph::read(path),
        (None, Some(path)) => pipeline::extract_graph_file(&file_id_of(path), path),
        (None, None) => return Err("one of --gold or --graph is required".to_string()),
    }
    .map_err(|e| e.to_string())?;
    let output_dir = prepare_output_dir(args.report.output_dir.as_deref())?;

    let gold = &gold;
    let units = args.orders.iter().map(|orders| {
        let file_id = file_id_of(orders);
        let unit = {
            let file_id = file_id.clone();
            move || -> schema_scorer::Result<Task2Result> {
                let result = pipeline::score_task2_file(&file_id, orders, gold, config)?;
                if let Some(dir) = output_dir {
                    result
                        .order_table()?
                        .write(dir.join(format!("{}.task2.tsv", file_id)))?;
                }
                Ok(result)
            }
        };
        (file_id, unit)
    });
    let report = pipeline::run_batch(units);

    let files: Vec<Task2Stats> = report.succeeded.iter().map(|(_, r)| r.file.clone()).collect();
    let mut rows = vec![Task2Stats::aggregate_team(&args.report.team, &files)];
    for (_, result) in &report.succeeded {
        rows.extend(result.stats_rows().into_iter().map(|mut s| {
            s.scope = s.scope.with_team(args.report.team.as_str());
            s
        }));
    }
    let table = Task2Stats::to_table(&rows).map_err(|e| e.to_string())?;
    emit_stats(&table, args.report.stats.as_deref())?;
    finish(&report)
}

fn prepare_output_dir(dir: Option<&Path>) -> Result<Option<&Path>, String> {
    if let Some(dir) = dir {
        std::fs::create_dir_all(dir)
            .map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;
    }
    Ok(dir)
}

fn emit_stats(table: &Table, path: Option<&Path>) -> Result<(), String> {
    match path {
        Some(path) => table
            .write(path)
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e)),
        None => {
            print!("{}", table.to_tsv());
            Ok(())
        }
    }
}

fn finish<T>(report: &BatchReport<T>) -> Result<(), String> {
    for (name, reason) in &report.skipped {
        eprintln!("{} skipped {}: {}", color("33", "warning:"), name, reason);
    }
    if report.failed.is_empty() {
        return Ok(());
    }
    let names: Vec<&str> = report.failed.iter().map(|(n, _)| n.as_str()).collect();
    Err(format!("{} file(s) failed: {}", names.len(), names.join(", ")))
}

fn color(code: &str, text: &str) -> String {
    if io::stderr().is_terminal() {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}
