//! Consumer pool: workers that drain the work queue
//!
//! Each task gets exactly one fetch-and-sync attempt. Fetch and warehouse
//! failures are task-scoped: the task is marked ERROR and the worker moves
//! on. A status write that the task store rejects is fatal: the pool stops
//! taking tasks and the error is handed back to the runner. The queue item
//! is acknowledged after the status write whatever the outcome.

use std::sync::Arc;

use indicatif::ProgressBar;
use paddock_core::{Classification, Task, TaskStatus, WorkQueue};
use paddock_store::StoreError;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::context::PipelineContext;
use crate::error::TaskFailure;

/// Fetch the task's classification and persist it. Returns the rows written.
pub async fn process_task(ctx: &PipelineContext, task: &Task) -> Result<usize, TaskFailure> {
    let results = ctx.api.classification(&task.session_id).await?;
    let classification = Classification::for_task(task, results);
    Ok(ctx.warehouse.sync_classification(&classification).await?)
}

/// Run one task to a terminal status and record it.
///
/// Returns the task holding its stored status and attempt, or the task store
/// error when the status could not be recorded.
pub async fn handle(ctx: &PipelineContext, mut task: Task) -> Result<Task, StoreError> {
    let status = match process_task(ctx, &task).await {
        Ok(rows) => {
            log::debug!("{}: {rows} results stored", task.path());
            TaskStatus::Completed
        }
        Err(e) => {
            log::error!("{}: {e}", task.path());
            TaskStatus::Error
        }
    };

    match ctx.tasks.upsert_status(&task, status).await {
        Ok((stored, attempt)) => {
            task.adopt(stored, attempt);
            Ok(task)
        }
        Err(e) => {
            log::error!("{}: failed to record status {status}: {e}", task.path());
            Err(e)
        }
    }
}

/// Per-worker outcome counts. Only tasks whose status was recorded count.
#[derive(Debug, Default)]
pub struct WorkerStats {
    pub completed: usize,
    pub failed: usize,
    /// Ids of every task this worker recorded, in handling order
    pub processed: Vec<String>,
    /// Task store error that stopped this worker
    pub fatal: Option<StoreError>,
}

async fn worker(
    id: usize,
    ctx: PipelineContext,
    queue: Arc<WorkQueue<Task>>,
    cancel: CancellationToken,
    pb: ProgressBar,
) -> WorkerStats {
    let mut stats = WorkerStats::default();
    loop {
        // Cancellation is only observed between tasks
        let task = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            task = queue.dequeue() => task,
        };

        let outcome = handle(&ctx, task).await;
        if let Err(e) = queue.ack() {
            log::error!("worker {id}: {e}");
        }
        pb.set_length(queue.total_enqueued() as u64);
        pb.inc(1);

        match outcome {
            Ok(task) => {
                match task.status {
                    TaskStatus::Completed => stats.completed += 1,
                    _ => stats.failed += 1,
                }
                stats.processed.push(task.id);
            }
            Err(e) => {
                log::error!("worker {id}: task store unavailable, aborting the pool");
                stats.fatal = Some(e);
                cancel.cancel();
                break;
            }
        }
    }
    log::debug!(
        "worker {id} stopped: {} completed, {} failed",
        stats.completed,
        stats.failed
    );
    stats
}

/// Aggregate of all workers' stats
#[derive(Debug, Default)]
pub struct PoolSummary {
    pub workers: usize,
    pub completed: usize,
    pub failed: usize,
    pub processed: Vec<String>,
    /// First task store error any worker hit
    pub fatal: Option<StoreError>,
}

impl PoolSummary {
    pub fn total(&self) -> usize {
        self.completed + self.failed
    }

    fn absorb(&mut self, stats: WorkerStats) {
        self.completed += stats.completed;
        self.failed += stats.failed;
        self.processed.extend(stats.processed);
        if self.fatal.is_none() {
            self.fatal = stats.fatal;
        }
    }
}

/// N workers sharing one queue
pub struct ConsumerPool {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<WorkerStats>>,
}

impl ConsumerPool {
    /// Spawn `workers` (at least one) onto the current runtime.
    pub fn spawn(
        ctx: &PipelineContext,
        queue: &Arc<WorkQueue<Task>>,
        workers: usize,
        pb: &ProgressBar,
    ) -> Self {
        let cancel = CancellationToken::new();
        let handles = (0..workers.max(1))
            .map(|id| {
                tokio::spawn(worker(
                    id,
                    ctx.clone(),
                    Arc::clone(queue),
                    cancel.clone(),
                    pb.clone(),
                ))
            })
            .collect();
        Self { cancel, handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Resolves once a worker has hit a fatal task store error.
    ///
    /// Only meaningful before [`shutdown`](Self::shutdown), which cancels too.
    pub fn aborted(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Cancel idle workers and collect their stats.
    ///
    /// Call after the queue has drained or the pool aborted; a worker
    /// mid-task finishes it first.
    pub async fn shutdown(self) -> PoolSummary {
        self.cancel.cancel();
        let mut summary = PoolSummary {
            workers: self.handles.len(),
            ..PoolSummary::default()
        };
        for handle in self.handles {
            match handle.await {
                Ok(stats) => summary.absorb(stats),
                Err(e) => log::error!("worker task failed: {e}"),
            }
        }
        summary
    }
}
