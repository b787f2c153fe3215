//! paddock - results pipeline CLI
//!
//! Discovers sessions from the results API, fetches their classifications
//! into a DuckDB warehouse, and exports the joined results to Parquet.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use paddock_core::ProgressContext;

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "paddock")]
#[command(about = "Results ingestion pipeline: discover, fetch, warehouse, export")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./paddock.toml or ~/.config/paddock/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Number of consumer workers (default: workers.count from config)
    #[arg(short, long, global = true)]
    workers: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Discover new sessions and create tasks
    Produce(cmd::produce::ProduceArgs),
    /// Process pending tasks, then export
    Consume(cmd::consume::ConsumeArgs),
    /// Discover and process concurrently, then export
    Run(cmd::run::RunArgs),
    /// Export the results view to Parquet
    Export(cmd::export::ExportArgs),
    /// Show task and warehouse counts
    Status,
    /// Create both stores (optionally resetting them)
    Init(cmd::init::InitArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = ProgressContext::new();

    // On a terminal the bars show activity, so only warnings are logged
    let level = paddock_core::level_for(cli.debug, progress.is_tty());
    paddock_core::init_logging(level, progress.bars());

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };
    let workers = cli.workers.unwrap_or(config.workers.count).max(1);

    if let Err(e) = paddock_core::install_signal_handlers() {
        log::warn!("Failed to install signal handlers: {e}");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    match cli.command {
        Command::Produce(args) => runtime.block_on(cmd::produce::run(args, &config, &progress)),
        Command::Consume(args) => {
            runtime.block_on(cmd::consume::run(args, &config, workers, &progress))
        }
        Command::Run(args) => runtime.block_on(cmd::run::run(args, &config, workers, &progress)),
        Command::Export(args) => cmd::export::run(args, &config),
        Command::Status => runtime.block_on(cmd::status::run(&config)),
        Command::Init(args) => cmd::init::run(args, &config),
        Command::Config => {
            show_config(&config, workers);
            Ok(())
        }
    }
}

fn show_config(config: &Config, workers: usize) {
    let mut table = cmd::table(&["Setting", "Value"]);
    table.add_row(vec!["API base URL", &config.api.base_url]);
    table.add_row(vec![
        "API timeout",
        &format!("{}s", config.api.timeout_secs),
    ]);
    table.add_row(vec![
        "Task store",
        &config.storage.task_db.display().to_string(),
    ]);
    table.add_row(vec![
        "Warehouse",
        &config.storage.warehouse.display().to_string(),
    ]);
    table.add_row(vec![
        "Export path",
        &config.export.path.display().to_string(),
    ]);
    table.add_row(vec!["Workers", &workers.to_string()]);
    eprintln!("\n{table}");
}
