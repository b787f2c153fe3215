//! Paddock Core - shared infrastructure for the results pipeline
//!
//! Domain model, the results API client, the async work queue, and the
//! process-wide logging/progress/shutdown plumbing used by the other crates.

pub mod api;
pub mod logging;
pub mod model;
pub mod progress;
pub mod shutdown;
pub mod work_queue;

// Re-exports for convenience
pub use api::{ApiConfig, ApiError, HttpResultsApi, ResultsApi};
pub use logging::{BarLogger, init_logging, level_for};
pub use model::{
    Category, CategoryParseError, Classification, Event, Rider, RiderResult, Season, Session,
    Task, TaskPath, TaskQueue, TaskStatus,
};
pub use progress::{ProgressContext, fmt_num};
pub use shutdown::{FORCED_EXIT_CODE, install_signal_handlers, is_shutdown_requested, request_shutdown};
pub use work_queue::{QueueError, WorkQueue};
