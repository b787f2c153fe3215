//! Discovery: walk season → event → category → session and create tasks
//!
//! Every retained session gets its four ancestor dimensions synced
//! (insert-if-absent) and one new task in status NEW. With a sink attached,
//! tasks are also marked QUEUED and handed straight to the work queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::future::try_join_all;
use paddock_core::{
    Category, Event, Season, Session, Task, TaskStatus, WorkQueue, is_shutdown_requested,
};
use paddock_store::Dimension;

use crate::category_cache::CategoryCache;
use crate::context::PipelineContext;
use crate::error::DiscoveryError;
use crate::watermark::{Watermark, event_watermark, season_watermark};

#[derive(Debug, Clone, Copy, Default)]
pub struct DiscoveryConfig {
    /// Maximum number of tasks created in one run
    pub limit: Option<usize>,
    /// Skip seasons and events older than what the warehouse already holds
    pub incremental: bool,
}

/// Strict cap on task creation shared by concurrent session fan-outs.
///
/// A slot is reserved before a task is created, so the cap is never exceeded.
#[derive(Debug)]
pub struct TaskBudget {
    limit: Option<usize>,
    used: AtomicUsize,
}

impl TaskBudget {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            used: AtomicUsize::new(0),
        }
    }

    /// Claim one slot; `false` once the limit is reached.
    pub fn try_reserve(&self) -> bool {
        match self.limit {
            None => {
                self.used.fetch_add(1, Ordering::SeqCst);
                true
            }
            Some(max) => self
                .used
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                    (n < max).then_some(n + 1)
                })
                .is_ok(),
        }
    }

    /// Return a slot whose task was never created.
    fn release(&self) {
        self.used.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn exhausted(&self) -> bool {
        self.limit
            .is_some_and(|max| self.used.load(Ordering::SeqCst) >= max)
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::SeqCst)
    }
}

/// Counts of what one discovery run walked and created
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverySummary {
    pub seasons: usize,
    pub events: usize,
    pub categories: usize,
    pub sessions: usize,
    pub tasks_created: usize,
    pub limit_reached: bool,
    pub interrupted: bool,
}

impl DiscoverySummary {
    pub fn log(&self) {
        log::info!(
            "Discovered {} seasons, {} events, {} categories, {} sessions",
            self.seasons,
            self.events,
            self.categories,
            self.sessions
        );
        log::info!("Created {} tasks", self.tasks_created);
        if self.limit_reached {
            log::info!("Task limit reached, discovery stopped early");
        }
        if self.interrupted {
            log::warn!("Discovery interrupted by shutdown request");
        }
    }
}

pub struct Discovery {
    ctx: PipelineContext,
    config: DiscoveryConfig,
    categories: CategoryCache,
    budget: TaskBudget,
    sink: Option<Arc<WorkQueue<Task>>>,
}

impl Discovery {
    pub fn new(ctx: PipelineContext, config: DiscoveryConfig) -> Self {
        Self {
            ctx,
            config,
            categories: CategoryCache::new(),
            budget: TaskBudget::new(config.limit),
            sink: None,
        }
    }

    /// Enqueue created tasks (marked QUEUED) instead of leaving them NEW.
    pub fn with_sink(mut self, queue: Arc<WorkQueue<Task>>) -> Self {
        self.sink = Some(queue);
        self
    }

    pub fn category_cache(&self) -> &CategoryCache {
        &self.categories
    }

    pub async fn run(&self) -> Result<DiscoverySummary, DiscoveryError> {
        let api = self.ctx.api.as_ref();
        let mut summary = DiscoverySummary::default();

        // Both marks are read before this run syncs anything
        let (season_mark, event_mark) = if self.config.incremental {
            let wh = &self.ctx.warehouse;
            (
                season_watermark(wh.last_synced(Dimension::Season).await?),
                event_watermark(wh.last_synced(Dimension::Event).await?),
            )
        } else {
            (Watermark::Unbounded, Watermark::Unbounded)
        };
        log::debug!("watermarks: season {season_mark:?}, event {event_mark:?}");

        let seasons = non_empty(api.seasons().await?, "seasons", "the results API")?;
        let seasons = season_mark.apply(seasons, |s| s.year);
        log::info!("{} seasons to scan", seasons.len());

        'walk: for season in &seasons {
            summary.seasons += 1;
            let events = non_empty(
                api.events(&season.id).await?,
                "events",
                format!("season {}", season.year),
            )?;
            let events = event_mark.apply(events, |e| e.start_date);
            log::info!("season {}: {} events to scan", season.year, events.len());

            for event in &events {
                summary.events += 1;
                let categories = self.categories.get_or_fetch(api, &event.id).await?;
                if categories.is_empty() {
                    return Err(DiscoveryError::EmptyResource {
                        resource: "categories",
                        parent: format!("event {}", event.short_name),
                    });
                }

                for category in categories.iter() {
                    if self.budget.exhausted() {
                        summary.limit_reached = true;
                        break 'walk;
                    }
                    if is_shutdown_requested() {
                        summary.interrupted = true;
                        break 'walk;
                    }
                    summary.categories += 1;

                    let sessions = non_empty(
                        api.sessions(&event.id, &category.id).await?,
                        "sessions",
                        format!("{}/{}", event.short_name, category.name),
                    )?;
                    summary.sessions += sessions.len();

                    let created = try_join_all(
                        sessions
                            .iter()
                            .map(|session| self.create_task(season, event, category, session)),
                    )
                    .await?;
                    summary.tasks_created += created.into_iter().filter(|c| *c).count();
                }
            }
        }

        if self.budget.exhausted() {
            summary.limit_reached = true;
        }
        log::debug!(
            "category cache: {} hits, {} misses",
            self.categories.hits(),
            self.categories.misses()
        );
        Ok(summary)
    }

    /// Sync the session's ancestors and create its task.
    ///
    /// Returns `false` when no task was created (limit reached or shutdown).
    async fn create_task(
        &self,
        season: &Season,
        event: &Event,
        category: &Category,
        session: &Session,
    ) -> Result<bool, DiscoveryError> {
        if is_shutdown_requested() || !self.budget.try_reserve() {
            return Ok(false);
        }
        match self.persist_task(season, event, category, session).await {
            Ok(()) => Ok(true),
            Err(e) => {
                self.budget.release();
                Err(e)
            }
        }
    }

    async fn persist_task(
        &self,
        season: &Season,
        event: &Event,
        category: &Category,
        session: &Session,
    ) -> Result<(), DiscoveryError> {
        let wh = &self.ctx.warehouse;
        wh.sync_season(season).await?;
        wh.sync_event(event).await?;
        wh.sync_category(category).await?;
        wh.sync_session(session).await?;

        let mut task = Task::new(&season.id, &event.id, &category.id, &session.id);
        let (status, attempt) = self.ctx.tasks.upsert_status(&task, TaskStatus::New).await?;
        task.adopt(status, attempt);
        log::debug!(
            "task {} created for {}/{}/{}/{}",
            task.id,
            season.year,
            event.short_name,
            category.name,
            session.name
        );

        if let Some(queue) = &self.sink {
            let (status, attempt) = self
                .ctx
                .tasks
                .upsert_status(&task, TaskStatus::Queued)
                .await?;
            task.adopt(status, attempt);
            queue.enqueue(task);
        }
        Ok(())
    }
}

fn non_empty<T>(
    items: Vec<T>,
    resource: &'static str,
    parent: impl std::fmt::Display,
) -> Result<Vec<T>, DiscoveryError> {
    if items.is_empty() {
        return Err(DiscoveryError::EmptyResource {
            resource,
            parent: parent.to_string(),
        });
    }
    Ok(items)
}
