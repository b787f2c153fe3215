//! Pipeline error types

use paddock_core::{ApiError, CategoryParseError};
use paddock_store::StoreError;

/// Failure that aborts a discovery run
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The API returned an empty list where at least one item is expected
    #[error("no {resource} returned for {parent}")]
    EmptyResource {
        resource: &'static str,
        parent: String,
    },
    #[error(transparent)]
    Category(CategoryParseError),
    #[error("discovery request failed: {0}")]
    Api(ApiError),
    #[error("discovery store write failed: {0}")]
    Store(#[from] StoreError),
}

impl From<ApiError> for DiscoveryError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Category(e) => Self::Category(e),
            other => Self::Api(other),
        }
    }
}

/// Why a single task ended in ERROR. Never escapes its worker.
#[derive(Debug, thiserror::Error)]
pub enum TaskFailure {
    #[error("transport: {0}")]
    Transport(#[from] ApiError),
    #[error("sync: {0}")]
    Sync(#[from] StoreError),
}
