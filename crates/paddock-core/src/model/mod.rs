//! Domain model for the results hierarchy and the task pipeline

pub mod classification;
pub mod dimension;
pub mod task;

pub use classification::{Classification, RiderResult};
pub use dimension::{Category, CategoryParseError, Event, Rider, Season, Session};
pub use task::{Task, TaskPath, TaskQueue, TaskStatus};
