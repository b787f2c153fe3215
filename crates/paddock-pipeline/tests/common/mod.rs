//! In-memory results API and store harness shared by the pipeline tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use paddock_core::{
    ApiError, Category, CategoryParseError, Classification, Event, ResultsApi, Rider,
    RiderResult, Season, Session, Task, TaskQueue, TaskStatus,
};
use paddock_pipeline::PipelineContext;
use paddock_store::{
    Dimension, DuckDbWarehouse, SqliteTaskStore, StoreError, TaskFilter, TaskRepository,
    WarehouseRepository,
};
use tempfile::TempDir;

/// A fixed results tree served from memory
#[derive(Default)]
pub struct FakeApi {
    pub seasons: Vec<Season>,
    pub events: HashMap<String, Vec<Event>>,
    pub categories: HashMap<String, Vec<Category>>,
    pub sessions: HashMap<(String, String), Vec<Session>>,
    /// Events whose category list contains an unparsable label
    pub bad_category_labels: HashSet<String>,
    /// Sessions whose classification body is empty
    pub empty_classifications: HashSet<String>,
    /// Sessions whose classification request fails with this status
    pub failing_sessions: HashMap<String, u16>,
    classification_calls: Mutex<Vec<String>>,
}

impl FakeApi {
    /// `years` seasons, each with `events` events, `categories` categories
    /// per event and `sessions` sessions per category.
    pub fn tree(years: &[i32], events: usize, categories: usize, sessions: usize) -> Self {
        let mut api = Self::default();
        // API order is newest first
        for &year in years.iter().rev() {
            let season_id = format!("s{year}");
            api.seasons.push(Season { id: season_id.clone(), year });
            let mut season_events = Vec::new();
            for e in (0..events).rev() {
                let event_id = format!("{season_id}-e{e}");
                let day = u32::try_from(e).unwrap() + 1;
                season_events.push(Event {
                    id: event_id.clone(),
                    name: format!("Grand Prix {e}"),
                    short_name: format!("gp{e}"),
                    start_date: NaiveDate::from_ymd_opt(year, 3, day).unwrap(),
                    end_date: NaiveDate::from_ymd_opt(year, 3, day + 2).unwrap(),
                });
                let mut event_categories = Vec::new();
                for c in 0..categories {
                    let category_id = format!("{event_id}-c{c}");
                    event_categories.push(Category {
                        id: category_id.clone(),
                        name: format!("moto{c}"),
                    });
                    let list = (0..sessions)
                        .map(|x| Session {
                            id: format!("{category_id}-x{x}"),
                            name: format!("fp{x}"),
                        })
                        .collect();
                    api.sessions.insert((event_id.clone(), category_id), list);
                }
                api.categories.insert(event_id, event_categories);
            }
            api.events.insert(season_id, season_events);
        }
        api
    }

    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .sessions
            .values()
            .flatten()
            .map(|s| s.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn classification_calls(&self) -> Vec<String> {
        self.classification_calls.lock().unwrap().clone()
    }
}

pub fn result_for(rider: usize) -> RiderResult {
    RiderResult {
        rider: Rider {
            id: format!("r{rider}"),
            name: format!("Rider {rider}"),
            country: "Spain".into(),
            team: format!("Team {}", rider % 2),
            number: Some(rider as i32),
        },
        position: Some(rider as i32 + 1),
        points: 25.0 - rider as f64,
    }
}

#[async_trait]
impl ResultsApi for FakeApi {
    async fn seasons(&self) -> Result<Vec<Season>, ApiError> {
        Ok(self.seasons.clone())
    }

    async fn events(&self, season_id: &str) -> Result<Vec<Event>, ApiError> {
        Ok(self.events.get(season_id).cloned().unwrap_or_default())
    }

    async fn categories(&self, event_id: &str) -> Result<Vec<Category>, ApiError> {
        if self.bad_category_labels.contains(event_id) {
            return Err(ApiError::Category(CategoryParseError {
                label: "™".into(),
            }));
        }
        Ok(self.categories.get(event_id).cloned().unwrap_or_default())
    }

    async fn sessions(&self, event_id: &str, category_id: &str) -> Result<Vec<Session>, ApiError> {
        let key = (event_id.to_string(), category_id.to_string());
        Ok(self.sessions.get(&key).cloned().unwrap_or_default())
    }

    async fn classification(&self, session_id: &str) -> Result<Vec<RiderResult>, ApiError> {
        self.classification_calls
            .lock()
            .unwrap()
            .push(session_id.to_string());
        if let Some(&status) = self.failing_sessions.get(session_id) {
            return Err(ApiError::Status {
                url: format!("fake://session/{session_id}/classification"),
                status,
            });
        }
        if self.empty_classifications.contains(session_id) {
            return Err(ApiError::EmptyClassification {
                session_id: session_id.to_string(),
            });
        }
        Ok((0..3).map(result_for).collect())
    }
}

/// Real stores in a temp directory around a fake API
pub struct Harness {
    pub dir: TempDir,
    pub api: Arc<FakeApi>,
    pub tasks: Arc<SqliteTaskStore>,
    pub warehouse: Arc<DuckDbWarehouse>,
}

impl Harness {
    pub fn new(api: FakeApi) -> Self {
        let dir = TempDir::new().unwrap();
        let tasks = SqliteTaskStore::open(dir.path().join("processing.db")).unwrap();
        let warehouse = DuckDbWarehouse::open(dir.path().join("motogp.db")).unwrap();
        Self {
            dir,
            api: Arc::new(api),
            tasks: Arc::new(tasks),
            warehouse: Arc::new(warehouse),
        }
    }

    pub fn ctx(&self) -> PipelineContext {
        PipelineContext::new(self.api.clone(), self.tasks.clone(), self.warehouse.clone())
    }

    pub async fn fact_rows(&self) -> u64 {
        self.warehouse
            .table_counts()
            .await
            .unwrap()
            .into_iter()
            .find(|(table, _)| *table == "dwh.fct_classification")
            .map(|(_, n)| n)
            .unwrap()
    }
}

fn unavailable(path: &str, message: &str) -> StoreError {
    StoreError::Unavailable {
        path: path.to_string(),
        message: message.to_string(),
    }
}

/// Task store that accepts NEW/QUEUED writes but rejects terminal statuses
pub struct RejectTerminalWrites {
    inner: Arc<SqliteTaskStore>,
}

impl RejectTerminalWrites {
    pub fn new(inner: Arc<SqliteTaskStore>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl TaskRepository for RejectTerminalWrites {
    async fn upsert_status(
        &self,
        task: &Task,
        status: TaskStatus,
    ) -> Result<(TaskStatus, u32), StoreError> {
        if status.is_terminal() {
            return Err(unavailable("processing.db", "database is locked"));
        }
        self.inner.upsert_status(task, status).await
    }

    async fn query_tasks(&self, filter: TaskFilter) -> Result<TaskQueue, StoreError> {
        self.inner.query_tasks(filter).await
    }

    async fn get_task(&self, id: &str) -> Result<Task, StoreError> {
        self.inner.get_task(id).await
    }

    async fn status_counts(&self) -> Result<Vec<(TaskStatus, u64)>, StoreError> {
        self.inner.status_counts().await
    }
}

/// Warehouse whose classification sync fails for the given sessions
pub struct RejectClassification {
    inner: Arc<DuckDbWarehouse>,
    sessions: HashSet<String>,
}

impl RejectClassification {
    pub fn new(inner: Arc<DuckDbWarehouse>, sessions: &[&str]) -> Self {
        Self {
            inner,
            sessions: sessions.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl WarehouseRepository for RejectClassification {
    async fn last_synced(&self, dimension: Dimension) -> Result<Option<NaiveDateTime>, StoreError> {
        self.inner.last_synced(dimension).await
    }

    async fn sync_season(&self, season: &Season) -> Result<(), StoreError> {
        self.inner.sync_season(season).await
    }

    async fn sync_event(&self, event: &Event) -> Result<(), StoreError> {
        self.inner.sync_event(event).await
    }

    async fn sync_category(&self, category: &Category) -> Result<(), StoreError> {
        self.inner.sync_category(category).await
    }

    async fn sync_session(&self, session: &Session) -> Result<(), StoreError> {
        self.inner.sync_session(session).await
    }

    async fn sync_rider(&self, rider: &Rider) -> Result<(), StoreError> {
        self.inner.sync_rider(rider).await
    }

    async fn sync_classification(
        &self,
        classification: &Classification,
    ) -> Result<usize, StoreError> {
        if self.sessions.contains(&classification.session_id) {
            return Err(unavailable("motogp.db", "disk full"));
        }
        self.inner.sync_classification(classification).await
    }

    async fn season(&self, id: &str) -> Result<Option<Season>, StoreError> {
        self.inner.season(id).await
    }

    async fn event(&self, id: &str) -> Result<Option<Event>, StoreError> {
        self.inner.event(id).await
    }

    async fn category(&self, id: &str) -> Result<Option<Category>, StoreError> {
        self.inner.category(id).await
    }

    async fn session(&self, id: &str) -> Result<Option<Session>, StoreError> {
        self.inner.session(id).await
    }

    async fn rider(&self, id: &str) -> Result<Option<Rider>, StoreError> {
        self.inner.rider(id).await
    }

    async fn classification(&self, session_id: &str) -> Result<Vec<RiderResult>, StoreError> {
        self.inner.classification(session_id).await
    }
}
