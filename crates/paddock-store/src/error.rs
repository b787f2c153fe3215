//! Store error type shared by the task store and the warehouse

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database could not be opened or bootstrapped
    #[error("store unavailable at {path}: {message}")]
    Unavailable { path: String, message: String },
    #[error("task store: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("warehouse: {0}")]
    DuckDb(#[from] duckdb::Error),
    #[error("task {0} not found")]
    TaskNotFound(String),
    /// A stored value that cannot be mapped back to the domain
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("blocking store task failed: {0}")]
    Join(String),
}

impl StoreError {
    pub(crate) fn unavailable(path: &std::path::Path, e: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            path: path.display().to_string(),
            message: e.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Join(e.to_string())
    }
}
