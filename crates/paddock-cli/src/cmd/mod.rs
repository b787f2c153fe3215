//! Subcommands and the plumbing they share

pub mod consume;
pub mod export;
pub mod init;
pub mod produce;
pub mod run;
pub mod status;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ValueEnum;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use paddock_core::{HttpResultsApi, fmt_num};
use paddock_pipeline::{DiscoveryConfig, PipelineContext, RunSummary};
use paddock_store::{DuckDbWarehouse, SqliteTaskStore};

use crate::config::Config;

/// Discovery mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LoadMode {
    /// Skip seasons and events older than the warehouse watermark
    Inc,
    /// Walk the whole results tree
    Full,
}

/// `0` means no limit
pub fn limit_arg(limit: usize) -> Option<usize> {
    (limit > 0).then_some(limit)
}

pub fn discovery_config(limit: usize, mode: LoadMode) -> DiscoveryConfig {
    DiscoveryConfig {
        limit: limit_arg(limit),
        incremental: mode == LoadMode::Inc,
    }
}

/// Both stores, opened and bootstrapped
pub struct Stores {
    pub tasks: Arc<SqliteTaskStore>,
    pub warehouse: Arc<DuckDbWarehouse>,
}

impl Stores {
    pub fn open(config: &Config) -> Result<Self> {
        let tasks = SqliteTaskStore::open(&config.storage.task_db).with_context(|| {
            format!(
                "Failed to open task store {}",
                config.storage.task_db.display()
            )
        })?;
        let warehouse = DuckDbWarehouse::open(&config.storage.warehouse).with_context(|| {
            format!(
                "Failed to open warehouse {}",
                config.storage.warehouse.display()
            )
        })?;
        Ok(Self {
            tasks: Arc::new(tasks),
            warehouse: Arc::new(warehouse),
        })
    }

    /// Pipeline context over these stores and the configured results API
    pub fn context(&self, config: &Config) -> Result<PipelineContext> {
        let api = HttpResultsApi::new(&config.api.client_config())
            .context("Failed to build results API client")?;
        Ok(PipelineContext::new(
            Arc::new(api),
            self.tasks.clone(),
            self.warehouse.clone(),
        ))
    }
}

pub fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    table
}

/// Completed/failed table printed after `consume` and `run`
pub fn print_run_summary(summary: &RunSummary) {
    let mut table = table(&["Metric", "Value"]);
    if let Some(discovery) = &summary.discovery {
        table.add_row(vec!["Sessions discovered", &fmt_num(discovery.sessions as u64)]);
        table.add_row(vec!["Tasks created", &fmt_num(discovery.tasks_created as u64)]);
    }
    table.add_row(vec!["Tasks enqueued", &fmt_num(summary.enqueued as u64)]);
    table.add_row(vec![
        Cell::new("Completed"),
        Cell::new(summary.completed).fg(Color::Green),
    ]);
    let failed = Cell::new(summary.failed);
    table.add_row(vec![
        Cell::new("Failed"),
        if summary.failed > 0 {
            failed.fg(Color::Red)
        } else {
            failed
        },
    ]);
    table.add_row(vec![
        "Elapsed",
        &format!("{:.1}s", summary.elapsed.as_secs_f64()),
    ]);
    eprintln!("\n{table}");
}
