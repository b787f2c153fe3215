//! SQL for the results export

use std::path::Path;

use crate::config::Compression;

/// Joined view every export materializes
pub const RESULTS_VIEW: &str = "dwh.vw_results";

/// Quote a path as a SQL string literal.
fn literal(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', "''"))
}

/// COPY of the results view to a single Parquet file.
pub fn export_results(target: &Path, compression: Compression) -> String {
    format!(
        "COPY (SELECT * FROM {RESULTS_VIEW}) TO {} (FORMAT PARQUET, COMPRESSION {})",
        literal(target),
        compression.as_sql()
    )
}

pub fn count_results() -> String {
    format!("SELECT COUNT(*) FROM {RESULTS_VIEW}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_statement() {
        let sql = export_results(Path::new("/data/motogp.parquet.tmp"), Compression::Zstd);
        assert_eq!(
            sql,
            "COPY (SELECT * FROM dwh.vw_results) TO '/data/motogp.parquet.tmp' \
             (FORMAT PARQUET, COMPRESSION ZSTD)"
        );
    }

    #[test]
    fn codec_comes_from_the_enum() {
        let sql = export_results(Path::new("out.parquet"), Compression::Uncompressed);
        assert!(sql.ends_with("(FORMAT PARQUET, COMPRESSION UNCOMPRESSED)"), "{sql}");
        assert_eq!(Compression::default(), Compression::Zstd);
    }

    #[test]
    fn quotes_are_escaped() {
        let sql = export_results(Path::new("/tmp/o'neil.parquet"), Compression::Zstd);
        assert!(sql.contains("'/tmp/o''neil.parquet'"));
    }
}
