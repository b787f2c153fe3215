//! Shared handles passed to every pipeline stage

use std::sync::Arc;

use paddock_core::ResultsApi;
use paddock_store::{TaskRepository, WarehouseRepository};

/// The remote API and both stores, behind their traits.
///
/// Cheap to clone; every worker holds its own copy.
#[derive(Clone)]
pub struct PipelineContext {
    pub api: Arc<dyn ResultsApi>,
    pub tasks: Arc<dyn TaskRepository>,
    pub warehouse: Arc<dyn WarehouseRepository>,
}

impl PipelineContext {
    pub fn new(
        api: Arc<dyn ResultsApi>,
        tasks: Arc<dyn TaskRepository>,
        warehouse: Arc<dyn WarehouseRepository>,
    ) -> Self {
        Self {
            api,
            tasks,
            warehouse,
        }
    }
}
