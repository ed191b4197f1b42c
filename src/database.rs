//! # SQLite
//!
//! Durable store for the location ledger and the factory registry.
//!
//! ## Requirements
//!
//! - Atomic single-row appends (a reader must never see a half-written
//!   report)
//! - One consistent snapshot per latest-position query
//! - Indexed `(user_id, timestamp)` range scans
//! - Point and polygon storage; no nearest-neighbour queries are exposed,
//!   so no spatial index is carried
//!
//! ## Implementation
//!
//! - `location_reports`: append-only, `AUTOINCREMENT` rowid doubles as
//!   the insertion sequence and the tie-break for equal timestamps
//! - `factories`: UUID primary key, geofence vertices as a JSON column
//! - Timestamps are RFC 3339 UTC text, which sorts chronologically
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS location_reports (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id   TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    longitude REAL NOT NULL,
    latitude  REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_location_reports_user_time
    ON location_reports (user_id, timestamp);

CREATE TABLE IF NOT EXISTS factories (
    id       BLOB PRIMARY KEY,
    name     TEXT NOT NULL,
    geofence TEXT NOT NULL
);
";

pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    // in-memory SQLite databases exist per connection, so those pools
    // must stay at a single connection to see one database
    let max_connections = if database_url.contains(":memory:") { 1 } else { 8 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;

    sqlx::raw_sql(SCHEMA).execute(&pool).await?;

    Ok(pool)
}
