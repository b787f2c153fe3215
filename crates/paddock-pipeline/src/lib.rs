//! paddock-pipeline: the producer/consumer task pipeline
//!
//! Discovery walks the results tree and creates tasks, the loader moves
//! pending tasks into the work queue, and the consumer pool drains it. The
//! runner wires these together for the `produce`, `consume` and `run` modes.

pub mod category_cache;
pub mod consumer;
pub mod context;
pub mod discovery;
pub mod error;
pub mod loader;
pub mod runner;
pub mod watermark;

pub use category_cache::CategoryCache;
pub use consumer::{ConsumerPool, PoolSummary, WorkerStats, handle, process_task};
pub use context::PipelineContext;
pub use discovery::{Discovery, DiscoveryConfig, DiscoverySummary, TaskBudget};
pub use error::{DiscoveryError, TaskFailure};
pub use loader::load_queue;
pub use runner::{RunSummary, consume, produce, run};
pub use watermark::Watermark;
