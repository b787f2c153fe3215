//! DuckDB warehouse: dimension tables plus the classification fact table.
//!
//! One connection is shared behind a mutex. Each operation locks it inside a
//! blocking task, so writers are serialized and the lock is never held across
//! an `.await`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use duckdb::{Connection, params};
use paddock_core::{Category, Classification, Event, Rider, RiderResult, Season, Session};

use crate::error::StoreError;
use crate::schema;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Dimension tables that carry a sync timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Season,
    Event,
    Category,
    Session,
    Rider,
}

impl Dimension {
    pub fn table(self) -> &'static str {
        match self {
            Self::Season => "dwh.dim_season",
            Self::Event => "dwh.dim_event",
            Self::Category => "dwh.dim_category",
            Self::Session => "dwh.dim_session",
            Self::Rider => "dwh.dim_rider",
        }
    }
}

#[async_trait]
pub trait WarehouseRepository: Send + Sync {
    /// Latest sync timestamp of a dimension, `None` when it has no rows
    async fn last_synced(&self, dimension: Dimension) -> Result<Option<NaiveDateTime>, StoreError>;

    /// Insert-if-absent; an existing row is left untouched.
    async fn sync_season(&self, season: &Season) -> Result<(), StoreError>;
    async fn sync_event(&self, event: &Event) -> Result<(), StoreError>;
    async fn sync_category(&self, category: &Category) -> Result<(), StoreError>;
    async fn sync_session(&self, session: &Session) -> Result<(), StoreError>;

    /// Upsert refreshing every attribute and the sync timestamp.
    async fn sync_rider(&self, rider: &Rider) -> Result<(), StoreError>;

    /// Upsert the riders, then insert-or-replace one fact row per result, all
    /// in one transaction. Returns the number of fact rows written.
    async fn sync_classification(&self, classification: &Classification)
        -> Result<usize, StoreError>;

    async fn season(&self, id: &str) -> Result<Option<Season>, StoreError>;
    async fn event(&self, id: &str) -> Result<Option<Event>, StoreError>;
    async fn category(&self, id: &str) -> Result<Option<Category>, StoreError>;
    async fn session(&self, id: &str) -> Result<Option<Session>, StoreError>;
    async fn rider(&self, id: &str) -> Result<Option<Rider>, StoreError>;

    /// Stored results of one session, by position (unclassified last)
    async fn classification(&self, session_id: &str) -> Result<Vec<RiderResult>, StoreError>;
}

/// DuckDB-backed [`WarehouseRepository`]
#[derive(Clone)]
pub struct DuckDbWarehouse {
    location: String,
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for DuckDbWarehouse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbWarehouse")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl DuckDbWarehouse {
    /// Open (creating if needed) the warehouse file and bootstrap its schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|e| StoreError::unavailable(&path, e))?;
        Self::bootstrap(conn, path.display().to_string())
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::unavailable(Path::new(":memory:"), e))?;
        Self::bootstrap(conn, ":memory:".to_string())
    }

    fn bootstrap(conn: Connection, location: String) -> Result<Self, StoreError> {
        schema::init_warehouse_schema(&conn).map_err(|e| StoreError::Unavailable {
            path: location.clone(),
            message: e.to_string(),
        })?;
        log::debug!("warehouse ready at {location}");
        Ok(Self {
            location,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Drop the `dwh` schema and recreate it empty.
    pub fn reset(&self) -> Result<(), StoreError> {
        schema::reset_warehouse_schema(&self.lock())?;
        log::warn!("warehouse reset: {}", self.location);
        Ok(())
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// A second handle on the same database, for bulk reads such as export.
    pub fn connection(&self) -> Result<Connection, StoreError> {
        Ok(self.lock().try_clone()?)
    }

    /// Row count of every dimension table and the fact table
    pub async fn table_counts(&self) -> Result<Vec<(&'static str, u64)>, StoreError> {
        self.with_conn(|conn| {
            let tables = [
                Dimension::Season.table(),
                Dimension::Event.table(),
                Dimension::Category.table(),
                Dimension::Session.table(),
                Dimension::Rider.table(),
                "dwh.fct_classification",
            ];
            let mut counts = Vec::with_capacity(tables.len());
            for table in tables {
                let n: i64 =
                    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
                counts.push((table, n as u64));
            }
            Ok(counts)
        })
        .await
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let this = self.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = this.lock();
            f(&mut conn)
        })
        .await?
    }

    async fn insert_if_absent(
        &self,
        sql: &'static str,
        values: Vec<String>,
    ) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            let synced_at = now();
            let mut stmt = conn.prepare(sql)?;
            let mut bound: Vec<&dyn duckdb::ToSql> =
                values.iter().map(|v| v as &dyn duckdb::ToSql).collect();
            bound.push(&synced_at);
            stmt.execute(bound.as_slice())?;
            Ok(())
        })
        .await
    }

    /// Optional single-row lookup
    async fn lookup<T, F>(&self, sql: &'static str, id: &str, map: F) -> Result<Option<T>, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&duckdb::Row<'_>) -> duckdb::Result<T> + Send + 'static,
    {
        let id = id.to_string();
        self.with_conn(move |conn| match conn.query_row(sql, params![id], map) {
            Ok(value) => Ok(Some(value)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        })
        .await
    }
}

fn now() -> String {
    chrono::Utc::now()
        .naive_utc()
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

fn parse_date(value: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| StoreError::Corrupt(format!("date {value:?}: {e}")))
}

const UPSERT_RIDER: &str = "
INSERT INTO dwh.dim_rider (id, name, country, team, number, synced_at)
VALUES (?, ?, ?, ?, ?, CAST(? AS TIMESTAMP))
ON CONFLICT (id) DO UPDATE
SET name = excluded.name,
    country = excluded.country,
    team = excluded.team,
    number = excluded.number,
    synced_at = excluded.synced_at";

const REPLACE_FACT: &str = "
INSERT OR REPLACE INTO dwh.fct_classification
    (season_id, event_id, category_id, session_id, rider_id, position, points, synced_at)
VALUES (?, ?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP))";

fn upsert_rider(conn: &Connection, rider: &Rider, synced_at: &str) -> duckdb::Result<usize> {
    conn.execute(
        UPSERT_RIDER,
        params![rider.id, rider.name, rider.country, rider.team, rider.number, synced_at],
    )
}

#[async_trait]
impl WarehouseRepository for DuckDbWarehouse {
    async fn last_synced(&self, dimension: Dimension) -> Result<Option<NaiveDateTime>, StoreError> {
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT strftime(MAX(synced_at), '%Y-%m-%d %H:%M:%S.%f') FROM {}",
                dimension.table()
            );
            let latest: Option<String> = conn.query_row(&sql, [], |row| row.get(0))?;
            latest
                .map(|s| {
                    NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT)
                        .map_err(|e| StoreError::Corrupt(format!("timestamp {s:?}: {e}")))
                })
                .transpose()
        })
        .await
    }

    async fn sync_season(&self, season: &Season) -> Result<(), StoreError> {
        self.insert_if_absent(
            "INSERT OR IGNORE INTO dwh.dim_season (id, year, synced_at)
             VALUES (?, CAST(? AS INTEGER), CAST(? AS TIMESTAMP))",
            vec![season.id.clone(), season.year.to_string()],
        )
        .await
    }

    async fn sync_event(&self, event: &Event) -> Result<(), StoreError> {
        self.insert_if_absent(
            "INSERT OR IGNORE INTO dwh.dim_event
                 (id, name, short_name, date_start, date_end, synced_at)
             VALUES (?, ?, ?, CAST(? AS DATE), CAST(? AS DATE), CAST(? AS TIMESTAMP))",
            vec![
                event.id.clone(),
                event.name.clone(),
                event.short_name.clone(),
                event.start_date.to_string(),
                event.end_date.to_string(),
            ],
        )
        .await
    }

    async fn sync_category(&self, category: &Category) -> Result<(), StoreError> {
        self.insert_if_absent(
            "INSERT OR IGNORE INTO dwh.dim_category (id, name, synced_at)
             VALUES (?, ?, CAST(? AS TIMESTAMP))",
            vec![category.id.clone(), category.name.clone()],
        )
        .await
    }

    async fn sync_session(&self, session: &Session) -> Result<(), StoreError> {
        self.insert_if_absent(
            "INSERT OR IGNORE INTO dwh.dim_session (id, name, synced_at)
             VALUES (?, ?, CAST(? AS TIMESTAMP))",
            vec![session.id.clone(), session.name.clone()],
        )
        .await
    }

    async fn sync_rider(&self, rider: &Rider) -> Result<(), StoreError> {
        let rider = rider.clone();
        self.with_conn(move |conn| {
            upsert_rider(conn, &rider, &now())?;
            Ok(())
        })
        .await
    }

    async fn sync_classification(
        &self,
        classification: &Classification,
    ) -> Result<usize, StoreError> {
        let c = classification.clone();
        self.with_conn(move |conn| {
            let synced_at = now();
            let tx = conn.transaction()?;
            for result in &c.results {
                upsert_rider(&tx, &result.rider, &synced_at)?;
            }
            {
                let mut stmt = tx.prepare(REPLACE_FACT)?;
                for result in &c.results {
                    stmt.execute(params![
                        c.season_id,
                        c.event_id,
                        c.category_id,
                        c.session_id,
                        result.rider.id,
                        result.position,
                        result.points,
                        synced_at,
                    ])?;
                }
            }
            tx.commit()?;
            log::debug!(
                "synced {} results for session {}",
                c.results.len(),
                c.session_id
            );
            Ok(c.results.len())
        })
        .await
    }

    async fn season(&self, id: &str) -> Result<Option<Season>, StoreError> {
        self.lookup("SELECT id, year FROM dwh.dim_season WHERE id = ?", id, |row| {
            Ok(Season {
                id: row.get(0)?,
                year: row.get(1)?,
            })
        })
        .await
    }

    async fn event(&self, id: &str) -> Result<Option<Event>, StoreError> {
        let row = self
            .lookup(
                "SELECT id, name, short_name,
                        CAST(date_start AS VARCHAR), CAST(date_end AS VARCHAR)
                 FROM dwh.dim_event WHERE id = ?",
                id,
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .await?;
        row.map(|(id, name, short_name, start, end)| {
            Ok(Event {
                id,
                name,
                short_name,
                start_date: parse_date(&start)?,
                end_date: parse_date(&end)?,
            })
        })
        .transpose()
    }

    async fn category(&self, id: &str) -> Result<Option<Category>, StoreError> {
        self.lookup("SELECT id, name FROM dwh.dim_category WHERE id = ?", id, |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .await
    }

    async fn session(&self, id: &str) -> Result<Option<Session>, StoreError> {
        self.lookup("SELECT id, name FROM dwh.dim_session WHERE id = ?", id, |row| {
            Ok(Session {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .await
    }

    async fn rider(&self, id: &str) -> Result<Option<Rider>, StoreError> {
        self.lookup(
            "SELECT id, name, country, team, number FROM dwh.dim_rider WHERE id = ?",
            id,
            |row| {
                Ok(Rider {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    country: row.get(2)?,
                    team: row.get(3)?,
                    number: row.get(4)?,
                })
            },
        )
        .await
    }

    async fn classification(&self, session_id: &str) -> Result<Vec<RiderResult>, StoreError> {
        let session_id = session_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.name, r.country, r.team, r.number, f.position, f.points
                 FROM dwh.fct_classification f
                 JOIN dwh.dim_rider r ON r.id = f.rider_id
                 WHERE f.session_id = ?
                 ORDER BY f.position NULLS LAST, r.id",
            )?;
            let rows = stmt.query_map(params![session_id], |row| {
                Ok(RiderResult {
                    rider: Rider {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        country: row.get(2)?,
                        team: row.get(3)?,
                        number: row.get(4)?,
                    },
                    position: row.get(5)?,
                    points: row.get(6)?,
                })
            })?;
            Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
        })
        .await
    }
}
