//! Pipeline orchestration: produce, consume, or both at once

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use paddock_core::{ProgressContext, Task, WorkQueue};

use crate::consumer::{ConsumerPool, PoolSummary};
use crate::context::PipelineContext;
use crate::discovery::{Discovery, DiscoveryConfig, DiscoverySummary};
use crate::loader::load_queue;

/// Discovery only: create NEW tasks, fetch nothing.
pub async fn produce(
    ctx: &PipelineContext,
    config: DiscoveryConfig,
    progress: &ProgressContext,
) -> Result<DiscoverySummary> {
    let line = progress.stage_line("discovery");
    line.set_message(if config.incremental {
        "incremental"
    } else {
        "full"
    });
    let summary = Discovery::new(ctx.clone(), config).run().await;
    line.finish_and_clear();

    let summary = summary.context("discovery failed")?;
    summary.log();
    Ok(summary)
}

/// Load pending tasks and drain them with `workers` consumers.
pub async fn consume(
    ctx: &PipelineContext,
    limit: Option<usize>,
    workers: usize,
    progress: &ProgressContext,
) -> Result<RunSummary> {
    let start = Instant::now();
    let queue = Arc::new(WorkQueue::<Task>::new());
    let loaded = load_queue(ctx, &queue, limit)
        .await
        .context("failed to load pending tasks")?;
    if loaded == 0 {
        log::warn!("No pending tasks to process");
        return Ok(RunSummary::empty());
    }
    log::info!("Processing {loaded} tasks with {workers} workers");

    let pb = progress.task_bar("sessions");
    pb.set_length(loaded as u64);
    let pool = ConsumerPool::spawn(ctx, &queue, workers, &pb);
    tokio::select! {
        _ = queue.join() => {}
        _ = pool.aborted() => {}
    }
    let mut pool = pool.shutdown().await;
    pb.finish_and_clear();
    if let Some(e) = pool.fatal.take() {
        return Err(e).context("task store write failed, run aborted");
    }

    let summary = RunSummary::from_pool(None, loaded, pool, start.elapsed());
    summary.log();
    Ok(summary)
}

/// Discovery feeding the consumer pool directly.
///
/// Workers start before discovery and drain whatever it enqueues. A discovery
/// failure is reported only after the enqueued work has drained. A task store
/// write failure in a worker stops discovery and the pool and is returned.
pub async fn run(
    ctx: &PipelineContext,
    config: DiscoveryConfig,
    workers: usize,
    progress: &ProgressContext,
) -> Result<RunSummary> {
    let start = Instant::now();
    let queue = Arc::new(WorkQueue::<Task>::new());
    let pb = progress.task_bar("sessions");
    let pool = ConsumerPool::spawn(ctx, &queue, workers, &pb);
    log::info!("Started {} workers", pool.size());

    let line = progress.stage_line("discovery");
    line.set_message("walking results tree");
    let discovery = Discovery::new(ctx.clone(), config).with_sink(Arc::clone(&queue));
    let discovered = tokio::select! {
        biased;
        _ = pool.aborted() => None,
        result = discovery.run() => Some(result),
    };
    line.finish_and_clear();

    tokio::select! {
        _ = queue.join() => {}
        _ = pool.aborted() => {}
    }
    let mut pool = pool.shutdown().await;
    pb.finish_and_clear();
    if let Some(e) = pool.fatal.take() {
        return Err(e).context("task store write failed, run aborted");
    }

    let Some(discovered) = discovered else {
        bail!("discovery stopped without a result");
    };
    let discovered = discovered.context("discovery failed")?;
    discovered.log();
    let loaded = queue.total_enqueued();
    let summary = RunSummary::from_pool(Some(discovered), loaded, pool, start.elapsed());
    summary.log();
    Ok(summary)
}

/// Summary of a consume or run invocation
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub discovery: Option<DiscoverySummary>,
    pub enqueued: usize,
    pub workers: usize,
    pub completed: usize,
    pub failed: usize,
    pub processed: Vec<String>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn empty() -> Self {
        Self {
            discovery: None,
            enqueued: 0,
            workers: 0,
            completed: 0,
            failed: 0,
            processed: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    fn from_pool(
        discovery: Option<DiscoverySummary>,
        enqueued: usize,
        pool: PoolSummary,
        elapsed: Duration,
    ) -> Self {
        Self {
            discovery,
            enqueued,
            workers: pool.workers,
            completed: pool.completed,
            failed: pool.failed,
            processed: pool.processed,
            elapsed,
        }
    }

    pub fn log(&self) {
        log::info!("=== Pipeline Summary ===");
        log::info!(
            "Tasks: {}/{} completed ({} failed) with {} workers",
            self.completed,
            self.enqueued,
            self.failed,
            self.workers
        );
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());
        let secs = self.elapsed.as_secs_f64();
        if self.completed > 0 && secs > 0.0 {
            log::info!("Throughput: {:.1} tasks/sec", self.completed as f64 / secs);
        }
        if self.failed > 0 {
            log::warn!("{} tasks failed; re-run to retry them", self.failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_summary_empty() {
        let summary = RunSummary::empty();
        assert_eq!(summary.enqueued, 0);
        assert_eq!(summary.completed + summary.failed, 0);
        assert!(summary.discovery.is_none());
        summary.log();
    }

    #[test]
    fn from_pool_carries_counts() {
        let pool = PoolSummary {
            workers: 3,
            completed: 4,
            failed: 1,
            processed: vec!["a".into(); 5],
            fatal: None,
        };
        let summary = RunSummary::from_pool(None, 5, pool, Duration::from_secs(2));
        assert_eq!((summary.completed, summary.failed, summary.workers), (4, 1, 3));
        assert_eq!(summary.processed.len(), summary.enqueued);
        summary.log();
    }
}
