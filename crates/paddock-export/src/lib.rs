//! paddock-export: materialize the warehouse results view to Parquet
//!
//! The file is written next to its destination and renamed into place, then
//! its footer is read back to confirm the row count.

mod config;
mod sql;

pub use config::{Compression, ExportConfig};

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use duckdb::Connection;
use parquet::file::reader::{FileReader, SerializedFileReader};

/// Summary of one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Rows in the results view at export time
    pub rows: u64,
    /// Rows recorded in the written file's footer
    pub file_rows: u64,
    pub bytes: u64,
}

/// Export `dwh.vw_results` to `config.output`, overwriting it.
///
/// `conn` must be a connection to a warehouse with the `dwh` schema.
pub fn run(conn: &Connection, config: &ExportConfig) -> Result<ExportSummary> {
    if let Some(parent) = config.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output dir: {}", parent.display()))?;
    }

    let rows: i64 = conn
        .query_row(&sql::count_results(), [], |row| row.get(0))
        .context("Failed to count results")?;
    log::info!("Exporting {rows} result rows");

    let staging = config.staging_path();
    conn.execute_batch(&sql::export_results(&staging, config.compression))
        .with_context(|| format!("Failed to write {}", staging.display()))?;
    std::fs::rename(&staging, &config.output).with_context(|| {
        format!(
            "Failed to move {} to {}",
            staging.display(),
            config.output.display()
        )
    })?;

    let file_rows = parquet_rows(&config.output)?;
    ensure!(
        file_rows == rows as u64,
        "{} holds {file_rows} rows, expected {rows}",
        config.output.display()
    );

    let bytes = std::fs::metadata(&config.output)?.len();
    log::info!(
        "Done. Output: {} ({file_rows} rows, {bytes} bytes)",
        config.output.display()
    );
    Ok(ExportSummary {
        rows: rows as u64,
        file_rows,
        bytes,
    })
}

/// Row count from a Parquet file's footer.
pub fn parquet_rows(path: &Path) -> Result<u64> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader = SerializedFileReader::new(file)
        .with_context(|| format!("Not a valid parquet file: {}", path.display()))?;
    Ok(reader.metadata().file_metadata().num_rows() as u64)
}
