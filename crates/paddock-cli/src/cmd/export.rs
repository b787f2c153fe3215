//! `paddock export` - write the results view to Parquet

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use paddock_export::{ExportConfig, ExportSummary};

use super::Stores;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output file (default: export.path from config)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: ExportArgs, config: &Config) -> Result<()> {
    let stores = Stores::open(config)?;
    let output = args.output.unwrap_or_else(|| config.export.path.clone());
    export(&stores, &output)?;
    Ok(())
}

pub fn export(stores: &Stores, output: &Path) -> Result<ExportSummary> {
    let conn = stores
        .warehouse
        .connection()
        .context("Failed to open warehouse connection for export")?;
    let summary = paddock_export::run(&conn, &ExportConfig::new(output))?;
    eprintln!(
        "Exported {} rows to {} ({} bytes)",
        summary.file_rows,
        output.display(),
        summary.bytes
    );
    Ok(summary)
}
