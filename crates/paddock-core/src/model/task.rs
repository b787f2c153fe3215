//! Task state machine
//!
//! A [`Task`] is one unit of fetch-work: "fetch and persist the classification
//! for one session". Its status moves NEW → QUEUED → COMPLETED | ERROR and is
//! persisted by the task store, which also counts attempts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a [`Task`].
///
/// Stored as a small integer code, but never compared by code: use
/// [`is_terminal`](TaskStatus::is_terminal) instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    New,
    Queued,
    Completed,
    Error,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [Self::New, Self::Queued, Self::Completed, Self::Error];

    /// COMPLETED and ERROR end a task's current attempt
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Storage code (0 NEW, 1 QUEUED, 2 COMPLETED, 3 ERROR)
    pub fn code(self) -> i64 {
        match self {
            Self::New => 0,
            Self::Queued => 1,
            Self::Completed => 2,
            Self::Error => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::New),
            1 => Some(Self::Queued),
            2 => Some(Self::Completed),
            3 => Some(Self::Error),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Queued => "QUEUED",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub season_id: String,
    pub event_id: String,
    pub category_id: String,
    pub session_id: String,
    pub status: TaskStatus,
    pub attempt: u32,
}

impl Task {
    /// New task for a session with a freshly minted UUID
    pub fn new(
        season_id: impl Into<String>,
        event_id: impl Into<String>,
        category_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self::with_id(
            uuid::Uuid::new_v4().to_string(),
            season_id,
            event_id,
            category_id,
            session_id,
        )
    }

    pub fn with_id(
        id: impl Into<String>,
        season_id: impl Into<String>,
        event_id: impl Into<String>,
        category_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            season_id: season_id.into(),
            event_id: event_id.into(),
            category_id: category_id.into(),
            session_id: session_id.into(),
            status: TaskStatus::New,
            attempt: 0,
        }
    }

    /// Take the status/attempt returned by the task store as ground truth.
    pub fn adopt(&mut self, status: TaskStatus, attempt: u32) {
        self.status = status;
        self.attempt = attempt;
    }

    pub fn path(&self) -> TaskPath<'_> {
        TaskPath(self)
    }
}

/// `season/event/category/session` view of a task, used in log lines.
pub struct TaskPath<'a>(&'a Task);

impl fmt::Display for TaskPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.0.season_id, self.0.event_id, self.0.category_id, self.0.session_id
        )
    }
}

/// Ordered snapshot of tasks, as returned by a task store query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskQueue {
    pub tasks: Vec<Task>,
}

impl TaskQueue {
    pub fn from_list(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn size(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.id.as_str())
    }
}

impl IntoIterator for TaskQueue {
    type Item = Task;
    type IntoIter = std::vec::IntoIter<Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.into_iter()
    }
}
