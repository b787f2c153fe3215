//! Load pending tasks from the task store into the work queue

use paddock_core::{Task, TaskStatus, WorkQueue};
use paddock_store::{StoreError, TaskFilter};

use crate::context::PipelineContext;

/// Enqueue up to `limit` non-terminal tasks (NEW, and QUEUED ones stranded by
/// an interrupted run), in insertion order, marking each QUEUED.
///
/// Returns the number of tasks enqueued.
pub async fn load_queue(
    ctx: &PipelineContext,
    queue: &WorkQueue<Task>,
    limit: Option<usize>,
) -> Result<usize, StoreError> {
    let pending = ctx.tasks.query_tasks(TaskFilter::NonTerminal).await?;
    log::info!("{} pending tasks in store", pending.size());

    let mut loaded = 0;
    for mut task in pending.into_iter().take(limit.unwrap_or(usize::MAX)) {
        let (status, attempt) = ctx.tasks.upsert_status(&task, TaskStatus::Queued).await?;
        task.adopt(status, attempt);
        queue.enqueue(task);
        loaded += 1;
    }
    Ok(loaded)
}
