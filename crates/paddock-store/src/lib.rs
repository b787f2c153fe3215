//! paddock-store: durable state for the results pipeline
//!
//! Two stores behind two repository traits: the SQLite task store, which
//! records every unit of fetch-work and its attempts, and the DuckDB
//! warehouse, which holds the synced dimensions and classification facts.

pub mod error;
pub mod schema;
pub mod task_store;
pub mod warehouse;

pub use error::StoreError;
pub use task_store::{SqliteTaskStore, TaskFilter, TaskRepository};
pub use warehouse::{Dimension, DuckDbWarehouse, WarehouseRepository};
