//! Shutdown requests stop discovery cleanly. Lives in its own test binary
//! because the shutdown flag is process-wide.

mod common;

use common::{FakeApi, Harness};
use paddock_core::request_shutdown;
use paddock_pipeline::{Discovery, DiscoveryConfig};
use paddock_store::{TaskFilter, TaskRepository};

#[tokio::test]
async fn discovery_stops_creating_tasks_after_shutdown() {
    let h = Harness::new(FakeApi::tree(&[2023], 2, 2, 2));
    request_shutdown();

    let summary = Discovery::new(
        h.ctx(),
        DiscoveryConfig {
            limit: None,
            incremental: false,
        },
    )
    .run()
    .await
    .unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.tasks_created, 0);
    let tasks = h.tasks.query_tasks(TaskFilter::All).await.unwrap();
    assert!(tasks.is_empty());
}
