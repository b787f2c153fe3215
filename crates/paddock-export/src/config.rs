use std::path::PathBuf;

/// Parquet codecs DuckDB's `COPY` accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compression {
    #[default]
    Zstd,
    Snappy,
    Gzip,
    Uncompressed,
}

impl Compression {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Zstd => "ZSTD",
            Self::Snappy => "SNAPPY",
            Self::Gzip => "GZIP",
            Self::Uncompressed => "UNCOMPRESSED",
        }
    }
}

/// Configuration for the Parquet export.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Output file, overwritten on every export
    pub output: PathBuf,
    pub compression: Compression,
}

impl ExportConfig {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            compression: Compression::default(),
        }
    }

    /// Sibling path the file is written to before the final rename
    pub fn staging_path(&self) -> PathBuf {
        let mut name = self.output.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}
