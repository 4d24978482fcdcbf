//! retailhub CLI: centralise retail data into one PostgreSQL star schema.
//!
//! Commands:
//! - `run` — extract, clean and load every entity, then apply the constraint plan
//! - `clean` — extract and clean one entity without loading; optionally write CSV
//! - `ddl` — print the constraint plan
//! - `tables` — list tables present in the destination database

mod logging;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use retailhub_core::schema::constraint_plan;
use retailhub_core::EntityKind;
use retailhub_runner::{
    build_sources, extract_and_clean, Destination, MemoryDestination, Orchestrator, PipelineConfig,
    PostgresDestination, RunOptions, RunReport, SourceSet,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::logging::{init_logging, LogConfig};

#[derive(Parser)]
#[command(
    name = "retailhub",
    about = "retailhub: retail data centralisation pipeline"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, default_value_t = false, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the whole pipeline.
    Run {
        /// Path to the TOML config file.
        #[arg(long, default_value = "retailhub.toml")]
        config: PathBuf,

        /// Load into an in-memory store instead of the destination database.
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Write the JSON run report here (overrides `run.report_path`).
        #[arg(long)]
        report: Option<PathBuf>,

        /// Extract dimensions one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Write the executed DDL here (overrides `run.ddl_path`).
        #[arg(long)]
        ddl_out: Option<PathBuf>,

        /// Print the report as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Extract and clean one entity without loading it.
    Clean {
        #[arg(long, default_value = "retailhub.toml")]
        config: PathBuf,

        /// users, cards, stores, products, date_times or orders.
        #[arg(long)]
        entity: EntityKind,

        /// Write the cleaned table as CSV; `-` for stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the constraint plan as SQL.
    Ddl,
    /// List tables in the destination database.
    Tables {
        #[arg(long, default_value = "retailhub.toml")]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_verbosity(cli.verbose, cli.log_json))?;

    match cli.command {
        Commands::Run {
            config,
            dry_run,
            report,
            sequential,
            ddl_out,
            json,
        } => run_pipeline(&config, dry_run, report, sequential, ddl_out, json),
        Commands::Clean {
            config,
            entity,
            output,
        } => run_clean(&config, entity, output.as_deref()),
        Commands::Ddl => run_ddl(),
        Commands::Tables { config } => run_tables(&config),
    }
}

fn load_config(path: &Path) -> Result<PipelineConfig> {
    PipelineConfig::from_file(path).with_context(|| format!("loading {}", path.display()))
}

fn execute<D: Destination>(sources: SourceSet, destination: D, options: RunOptions) -> Result<RunReport> {
    let mut orchestrator = Orchestrator::new(sources, destination, options);
    Ok(orchestrator.run()?)
}

fn run_pipeline(
    config_path: &Path,
    dry_run: bool,
    report_path: Option<PathBuf>,
    sequential: bool,
    ddl_out: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let sources = build_sources(&config)?;
    let options = RunOptions {
        parallel_dimensions: config.run.parallel_dimensions && !sequential,
    };

    let report = if dry_run {
        info!("dry run: loading into memory");
        execute(sources, MemoryDestination::new(), options)?
    } else {
        info!(destination = %config.destination.redacted(), "connecting");
        let destination = PostgresDestination::connect(&config.destination.connection_string())?;
        execute(sources, destination, options)?
    };

    if json {
        println!("{}", report.to_json_pretty()?);
    } else {
        print!("{}", report.render_text());
    }

    if let Some(path) = report_path.or(config.run.report_path) {
        report
            .write_json(&path)
            .with_context(|| format!("writing report {}", path.display()))?;
        println!("Report written to: {}", path.display());
    }
    if let Some(path) = ddl_out.or(config.run.ddl_path) {
        let statements = report.statements();
        if statements.is_empty() {
            println!("No DDL executed; {} not written.", path.display());
        } else {
            let mut sql = statements.join(";\n");
            sql.push_str(";\n");
            std::fs::write(&path, sql).with_context(|| format!("writing {}", path.display()))?;
            println!("DDL written to: {}", path.display());
        }
    }

    if !report.succeeded() {
        let failed: Vec<_> = report.failed().map(|e| e.entity.to_string()).collect();
        if failed.is_empty() {
            bail!("run {} did not complete: constraints not applied", report.run_id);
        }
        bail!("run {} failed for: {}", report.run_id, failed.join(", "));
    }
    Ok(())
}

fn run_clean(config_path: &Path, entity: EntityKind, output: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let sources = build_sources(&config)?;
    let cleaned = extract_and_clean(&sources, entity)?;

    eprintln!(
        "{}: {} input rows, {} kept, {} discarded",
        entity,
        cleaned.input_rows,
        cleaned.table.len(),
        cleaned.discarded()
    );
    for (reason, count) in cleaned.rejection_counts() {
        eprintln!("  {reason:<16} {count}");
    }

    match output {
        Some(path) if path == Path::new("-") => {
            let stdout = io::stdout();
            cleaned.table.write_csv(stdout.lock())?;
        }
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            cleaned.table.write_csv(&mut writer)?;
            writer.flush()?;
            eprintln!("Cleaned table written to: {}", path.display());
        }
        None => {}
    }
    Ok(())
}

fn run_ddl() -> Result<()> {
    for step in constraint_plan() {
        println!("{step};");
    }
    Ok(())
}

fn run_tables(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let mut destination = PostgresDestination::connect(&config.destination.connection_string())?;
    let tables = destination.list_tables()?;
    if tables.is_empty() {
        println!("No tables in {}.", config.destination.database);
    }
    for table in tables {
        println!("{table}");
    }
    Ok(())
}
