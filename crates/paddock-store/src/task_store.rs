//! Durable task store: the source of truth for retry and resume.
//!
//! [`SqliteTaskStore`] opens a fresh connection for every operation and runs
//! it on a blocking thread, so no connection outlives a single unit of work.
//! Concurrent writers serialize through SQLite's own locking.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use paddock_core::{Task, TaskQueue, TaskStatus};
use rusqlite::{Connection, OpenFlags, params};

use crate::error::StoreError;
use crate::schema;

/// How long a writer waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Which tasks a query returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFilter {
    All,
    Status(TaskStatus),
    /// NEW and QUEUED
    NonTerminal,
}

impl TaskFilter {
    fn statuses(self) -> Vec<TaskStatus> {
        match self {
            Self::All => TaskStatus::ALL.to_vec(),
            Self::Status(s) => vec![s],
            Self::NonTerminal => TaskStatus::ALL
                .into_iter()
                .filter(|s| !s.is_terminal())
                .collect(),
        }
    }

    fn where_clause(self) -> String {
        let codes: Vec<String> = self.statuses().iter().map(|s| s.code().to_string()).collect();
        format!("WHERE status IN ({})", codes.join(", "))
    }
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Create the task row (attempt 0) or set its status and bump its attempt.
    ///
    /// Returns the stored `(status, attempt)`; callers must adopt these rather
    /// than assume their input round-tripped.
    async fn upsert_status(
        &self,
        task: &Task,
        status: TaskStatus,
    ) -> Result<(TaskStatus, u32), StoreError>;

    /// Tasks matching `filter`, in insertion order
    async fn query_tasks(&self, filter: TaskFilter) -> Result<TaskQueue, StoreError>;

    async fn get_task(&self, id: &str) -> Result<Task, StoreError>;

    /// Number of tasks per status (statuses without tasks are omitted)
    async fn status_counts(&self) -> Result<Vec<(TaskStatus, u64)>, StoreError>;
}

const UPSERT_STATUS: &str = "
INSERT INTO tasks (id, season_id, event_id, category_id, session_id, status, attempt, added_timestamp)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, CURRENT_TIMESTAMP)
ON CONFLICT (id) DO UPDATE
SET status = excluded.status,
    attempt = attempt + 1,
    updated_timestamp = CURRENT_TIMESTAMP
RETURNING status, attempt";

const SELECT_TASK: &str =
    "SELECT id, season_id, event_id, category_id, session_id, status, attempt FROM tasks";

/// SQLite-backed [`TaskRepository`]
#[derive(Debug, Clone)]
pub struct SqliteTaskStore {
    path: PathBuf,
}

impl SqliteTaskStore {
    /// Open (creating if needed) the task database and bootstrap its schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };
        let conn = store.connect()?;
        schema::init_task_schema(&conn).map_err(|e| StoreError::unavailable(&store.path, e))?;
        log::debug!("task store ready at {}", store.path.display());
        Ok(store)
    }

    /// Drop and recreate the task table.
    pub fn reset(&self) -> Result<(), StoreError> {
        let conn = self.connect()?;
        schema::reset_task_schema(&conn).map_err(|e| StoreError::unavailable(&self.path, e))?;
        log::warn!("task store reset: {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
        let conn = Connection::open_with_flags(&self.path, flags)
            .map_err(|e| StoreError::unavailable(&self.path, e))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| StoreError::unavailable(&self.path, e))?;
        Ok(conn)
    }

    /// Run one unit of work on its own connection, off the async executor.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = store.connect()?;
            f(&mut conn)
        })
        .await?
    }
}

fn status_from_code(code: i64) -> Result<TaskStatus, StoreError> {
    TaskStatus::from_code(code).ok_or_else(|| StoreError::Corrupt(format!("task status {code}")))
}

fn attempt_from(value: i64) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("task attempt {value}")))
}

fn task_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Task, i64, i64)> {
    let task = Task::with_id(
        row.get::<_, String>(0)?,
        row.get::<_, String>(1)?,
        row.get::<_, String>(2)?,
        row.get::<_, String>(3)?,
        row.get::<_, String>(4)?,
    );
    Ok((task, row.get(5)?, row.get(6)?))
}

fn finish_task((mut task, status, attempt): (Task, i64, i64)) -> Result<Task, StoreError> {
    task.adopt(status_from_code(status)?, attempt_from(attempt)?);
    Ok(task)
}

#[async_trait]
impl TaskRepository for SqliteTaskStore {
    async fn upsert_status(
        &self,
        task: &Task,
        status: TaskStatus,
    ) -> Result<(TaskStatus, u32), StoreError> {
        let task = task.clone();
        self.with_conn(move |conn| {
            let (code, attempt): (i64, i64) = conn.query_row(
                UPSERT_STATUS,
                params![
                    task.id,
                    task.season_id,
                    task.event_id,
                    task.category_id,
                    task.session_id,
                    status.code(),
                ],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok((status_from_code(code)?, attempt_from(attempt)?))
        })
        .await
    }

    async fn query_tasks(&self, filter: TaskFilter) -> Result<TaskQueue, StoreError> {
        self.with_conn(move |conn| {
            let sql = format!("{SELECT_TASK} {} ORDER BY rowid", filter.where_clause());
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], task_from_row)?;
            let mut tasks = Vec::new();
            for row in rows {
                tasks.push(finish_task(row?)?);
            }
            Ok(TaskQueue::from_list(tasks))
        })
        .await
    }

    async fn get_task(&self, id: &str) -> Result<Task, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let sql = format!("{SELECT_TASK} WHERE id = ?1");
            match conn.query_row(&sql, params![id], task_from_row) {
                Ok(row) => finish_task(row),
                Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::TaskNotFound(id)),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn status_counts(&self) -> Result<Vec<(TaskStatus, u64)>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT status, COUNT(*) FROM tasks GROUP BY status ORDER BY status")?;
            let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?;
            let mut counts = Vec::new();
            for row in rows {
                let (code, count) = row?;
                counts.push((status_from_code(code)?, count as u64));
            }
            Ok(counts)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, SqliteTaskStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteTaskStore::open(dir.path().join("processing.db")).unwrap();
        (dir, store)
    }

    fn task(id: &str) -> Task {
        Task::with_id(id, "s1", "e1", "c1", format!("x-{id}"))
    }

    #[test]
    fn filter_clauses() {
        assert_eq!(TaskFilter::NonTerminal.where_clause(), "WHERE status IN (0, 1)");
        assert_eq!(
            TaskFilter::Status(TaskStatus::Error).where_clause(),
            "WHERE status IN (3)"
        );
        assert_eq!(TaskFilter::All.where_clause(), "WHERE status IN (0, 1, 2, 3)");
    }

    #[tokio::test]
    async fn first_upsert_inserts_at_attempt_zero() {
        let (_dir, store) = store();
        let (status, attempt) = store.upsert_status(&task("t1"), TaskStatus::New).await.unwrap();
        assert_eq!((status, attempt), (TaskStatus::New, 0));
    }

    #[tokio::test]
    async fn status_sequence_ends_completed_at_attempt_two() {
        let (_dir, store) = store();
        let t1 = task("t1");
        store.upsert_status(&t1, TaskStatus::New).await.unwrap();
        store.upsert_status(&t1, TaskStatus::Error).await.unwrap();
        let returned = store.upsert_status(&t1, TaskStatus::Completed).await.unwrap();
        assert_eq!(returned, (TaskStatus::Completed, 2));

        let stored = store.get_task("t1").await.unwrap();
        assert_eq!(stored.status, TaskStatus::Completed);
        assert_eq!(stored.attempt, 2);
    }

    #[tokio::test]
    async fn attempt_counts_every_write() {
        let (_dir, store) = store();
        let t = task("t");
        let sequence = [
            TaskStatus::Error,
            TaskStatus::Queued,
            TaskStatus::New,
            TaskStatus::Error,
            TaskStatus::Queued,
        ];
        for status in sequence {
            store.upsert_status(&t, status).await.unwrap();
        }
        let stored = store.get_task("t").await.unwrap();
        assert_eq!(stored.attempt as usize, sequence.len() - 1);
        assert_eq!(stored.status, TaskStatus::Queued);
    }

    #[tokio::test]
    async fn get_missing_task() {
        let (_dir, store) = store();
        let err = store.get_task("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::TaskNotFound(ref id) if id == "nope"));
    }

    #[tokio::test]
    async fn query_preserves_insertion_order_and_filters() {
        let (_dir, store) = store();
        for id in ["c", "a", "b"] {
            store.upsert_status(&task(id), TaskStatus::New).await.unwrap();
        }
        store.upsert_status(&task("a"), TaskStatus::Completed).await.unwrap();
        store.upsert_status(&task("b"), TaskStatus::Queued).await.unwrap();

        let all = store.query_tasks(TaskFilter::All).await.unwrap();
        assert_eq!(all.ids().collect::<Vec<_>>(), vec!["c", "a", "b"]);

        let pending = store.query_tasks(TaskFilter::NonTerminal).await.unwrap();
        assert_eq!(pending.ids().collect::<Vec<_>>(), vec!["c", "b"]);

        let new = store
            .query_tasks(TaskFilter::Status(TaskStatus::New))
            .await
            .unwrap();
        assert_eq!(new.size(), 1);
        assert_eq!(new.tasks[0].session_id, "x-c");
    }

    #[tokio::test]
    async fn counts_by_status() {
        let (_dir, store) = store();
        for id in ["a", "b", "c"] {
            store.upsert_status(&task(id), TaskStatus::New).await.unwrap();
        }
        store.upsert_status(&task("c"), TaskStatus::Error).await.unwrap();
        let counts = store.status_counts().await.unwrap();
        assert_eq!(counts, vec![(TaskStatus::New, 2), (TaskStatus::Error, 1)]);
    }

    #[tokio::test]
    async fn reset_clears_tasks() {
        let (_dir, store) = store();
        store.upsert_status(&task("a"), TaskStatus::New).await.unwrap();
        store.reset().unwrap();
        assert!(store.query_tasks(TaskFilter::All).await.unwrap().is_empty());
    }

    #[test]
    fn open_in_missing_directory_is_unavailable() {
        let err = SqliteTaskStore::open("/nonexistent/dir/processing.db").unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { .. }), "{err}");
    }
}
