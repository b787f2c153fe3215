//! Schema bootstrap for the task store (SQLite) and the warehouse (DuckDB).
//!
//! All statements are idempotent; `reset_*` drops everything first.

/// Task table. `status` codes: 0 NEW, 1 QUEUED, 2 COMPLETED, 3 ERROR.
pub const TASKS_DDL: &str = "
CREATE TABLE IF NOT EXISTS tasks (
    id                TEXT PRIMARY KEY,
    season_id         TEXT NOT NULL,
    event_id          TEXT NOT NULL,
    category_id       TEXT NOT NULL,
    session_id        TEXT NOT NULL,
    status            INTEGER NOT NULL DEFAULT 0 CHECK (status IN (0, 1, 2, 3)),
    attempt           INTEGER NOT NULL DEFAULT 0,
    added_timestamp   TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_timestamp TEXT
);
CREATE INDEX IF NOT EXISTS tasks_status_idx ON tasks (status);
";

/// Dimension tables, the classification fact table and the export view.
pub const WAREHOUSE_DDL: &str = "
CREATE SCHEMA IF NOT EXISTS dwh;

CREATE TABLE IF NOT EXISTS dwh.dim_season (
    id        VARCHAR PRIMARY KEY,
    year      INTEGER NOT NULL,
    synced_at TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS dwh.dim_event (
    id         VARCHAR PRIMARY KEY,
    name       VARCHAR NOT NULL,
    short_name VARCHAR NOT NULL,
    date_start DATE NOT NULL,
    date_end   DATE NOT NULL,
    synced_at  TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS dwh.dim_category (
    id        VARCHAR PRIMARY KEY,
    name      VARCHAR NOT NULL,
    synced_at TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS dwh.dim_session (
    id        VARCHAR PRIMARY KEY,
    name      VARCHAR NOT NULL,
    synced_at TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS dwh.dim_rider (
    id        VARCHAR PRIMARY KEY,
    name      VARCHAR NOT NULL,
    country   VARCHAR NOT NULL,
    team      VARCHAR NOT NULL,
    number    INTEGER,
    synced_at TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS dwh.fct_classification (
    season_id   VARCHAR NOT NULL,
    event_id    VARCHAR NOT NULL,
    category_id VARCHAR NOT NULL,
    session_id  VARCHAR NOT NULL,
    rider_id    VARCHAR NOT NULL,
    position    INTEGER,
    points      DOUBLE NOT NULL,
    synced_at   TIMESTAMP NOT NULL,
    PRIMARY KEY (season_id, event_id, category_id, session_id, rider_id)
);

CREATE OR REPLACE VIEW dwh.vw_results AS
SELECT
    s.year        AS season,
    e.name        AS event_name,
    e.short_name  AS event,
    e.date_start,
    e.date_end,
    c.name        AS category,
    x.name        AS session,
    r.name        AS rider,
    r.number      AS rider_number,
    r.country,
    r.team,
    f.position,
    f.points,
    f.season_id,
    f.event_id,
    f.category_id,
    f.session_id,
    f.rider_id
FROM dwh.fct_classification f
LEFT JOIN dwh.dim_season s   ON s.id = f.season_id
LEFT JOIN dwh.dim_event e    ON e.id = f.event_id
LEFT JOIN dwh.dim_category c ON c.id = f.category_id
LEFT JOIN dwh.dim_session x  ON x.id = f.session_id
LEFT JOIN dwh.dim_rider r    ON r.id = f.rider_id
ORDER BY s.year, e.date_start, c.name, x.name, f.position NULLS LAST;
";

pub fn init_task_schema(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(TASKS_DDL)
}

pub fn reset_task_schema(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch("DROP TABLE IF EXISTS tasks;")?;
    init_task_schema(conn)
}

pub fn init_warehouse_schema(conn: &duckdb::Connection) -> duckdb::Result<()> {
    conn.execute_batch(WAREHOUSE_DDL)
}

pub fn reset_warehouse_schema(conn: &duckdb::Connection) -> duckdb::Result<()> {
    conn.execute_batch("DROP SCHEMA IF EXISTS dwh CASCADE;")?;
    init_warehouse_schema(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_schema_is_idempotent() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        init_task_schema(&conn).unwrap();
        init_task_schema(&conn).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[test]
    fn warehouse_schema_objects() {
        let conn = duckdb::Connection::open_in_memory().unwrap();
        init_warehouse_schema(&conn).unwrap();
        init_warehouse_schema(&conn).unwrap();
        let objects: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'dwh'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        // 6 tables + 1 view
        assert_eq!(objects, 7);
    }

    #[test]
    fn warehouse_reset_drops_rows() {
        let conn = duckdb::Connection::open_in_memory().unwrap();
        init_warehouse_schema(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO dwh.dim_category VALUES ('c1', 'motogp', TIMESTAMP '2024-01-01 00:00:00')",
        )
        .unwrap();
        reset_warehouse_schema(&conn).unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM dwh.dim_category", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 0);
    }
}
