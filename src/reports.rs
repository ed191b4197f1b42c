//! # Location Report Ledger
//!
//! Append-only log of `(user, timestamp, point)` rows, the source of
//! truth for participant positions. Rows are immutable once written;
//! there is no update or delete path.
//!
//! The latest-position query mirrors a correlated "top-1 per group"
//! subquery: for every user, exactly the row with the maximum timestamp,
//! breaking equal timestamps by the highest insertion id so repeated
//! reads of unchanged data stay identical.
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::{error::AppError, geo::GeoPoint};

#[derive(Debug, Clone, FromRow)]
pub struct LocationReport {
    pub id: i64,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub longitude: f64,
    pub latitude: f64,
}

impl LocationReport {
    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Appends one report for `user_id` with a server-assigned timestamp.
///
/// The insert is a single atomic statement; the caller must not ack the
/// client unless this returns `Ok`.
pub async fn append(
    pool: &SqlitePool,
    user_id: &str,
    point: GeoPoint,
) -> Result<LocationReport, AppError> {
    point.validate()?;

    let report = sqlx::query_as::<_, LocationReport>(
        "INSERT INTO location_reports (user_id, timestamp, longitude, latitude) \
         VALUES (?, ?, ?, ?) \
         RETURNING id, user_id, timestamp, longitude, latitude",
    )
    .bind(user_id)
    .bind(Utc::now())
    .bind(point.longitude)
    .bind(point.latitude)
    .fetch_one(pool)
    .await?;

    debug!(
        user = %report.user_id,
        id = report.id,
        "appended location report"
    );

    Ok(report)
}

/// One row per user that has ever reported: the row with the maximum
/// timestamp, ties broken by the highest insertion id. A single query
/// plan, so the result is one consistent snapshot and takes no locks
/// against concurrent appends.
pub async fn latest_for_users(pool: &SqlitePool) -> Result<Vec<LocationReport>, AppError> {
    let rows = sqlx::query_as::<_, LocationReport>(
        "SELECT id, user_id, timestamp, longitude, latitude \
         FROM location_reports AS r \
         WHERE r.id = ( \
             SELECT id FROM location_reports \
             WHERE user_id = r.user_id \
             ORDER BY timestamp DESC, id DESC \
             LIMIT 1 \
         ) \
         ORDER BY user_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<LocationReport>, AppError> {
    let rows = sqlx::query_as::<_, LocationReport>(
        "SELECT id, user_id, timestamp, longitude, latitude FROM location_reports ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn find(pool: &SqlitePool, id: i64) -> Result<LocationReport, AppError> {
    sqlx::query_as::<_, LocationReport>(
        "SELECT id, user_id, timestamp, longitude, latitude FROM location_reports WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("location report"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database;

    const WARSAW: GeoPoint = GeoPoint {
        latitude: 52.2297,
        longitude: 21.0122,
    };

    async fn pool() -> SqlitePool {
        database::connect("sqlite::memory:").await.unwrap()
    }

    async fn insert_at(pool: &SqlitePool, user_id: &str, timestamp: DateTime<Utc>) -> i64 {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO location_reports (user_id, timestamp, longitude, latitude) \
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(user_id)
        .bind(timestamp)
        .bind(21.0)
        .bind(52.0)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn append_round_trips_coordinates() {
        let pool = pool().await;

        let report = append(&pool, "u1", WARSAW).await.unwrap();
        let stored = find(&pool, report.id).await.unwrap();

        assert_eq!(stored.user_id, "u1");
        assert!((stored.latitude - WARSAW.latitude).abs() < 1e-6);
        assert!((stored.longitude - WARSAW.longitude).abs() < 1e-6);
    }

    #[tokio::test]
    async fn append_rejects_malformed_coordinates() {
        let pool = pool().await;

        for point in [
            GeoPoint {
                latitude: 95.0,
                longitude: 21.0,
            },
            GeoPoint {
                latitude: 52.0,
                longitude: -181.0,
            },
            GeoPoint {
                latitude: f64::NAN,
                longitude: 21.0,
            },
        ] {
            let result = append(&pool, "u1", point).await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }

        assert!(list(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn latest_is_empty_without_reports() {
        let pool = pool().await;

        assert!(latest_for_users(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn latest_returns_freshest_report_per_user() {
        let pool = pool().await;

        append(&pool, "u1", GeoPoint { latitude: 50.0, longitude: 20.0 })
            .await
            .unwrap();
        append(&pool, "u1", WARSAW).await.unwrap();

        let latest = latest_for_users(&pool).await.unwrap();

        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].user_id, "u1");
        assert!((latest[0].latitude - WARSAW.latitude).abs() < 1e-6);
        assert!((latest[0].longitude - WARSAW.longitude).abs() < 1e-6);
    }

    #[tokio::test]
    async fn latest_isolates_users() {
        let pool = pool().await;

        append(&pool, "u1", WARSAW).await.unwrap();
        let before: Vec<_> = latest_for_users(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.user_id, r.id))
            .collect();

        append(&pool, "u2", GeoPoint { latitude: 48.8566, longitude: 2.3522 })
            .await
            .unwrap();

        let after = latest_for_users(&pool).await.unwrap();
        let u1_after = after.iter().find(|r| r.user_id == "u1").unwrap();

        assert_eq!(after.len(), 2);
        assert_eq!((u1_after.user_id.clone(), u1_after.id), before[0]);
    }

    #[tokio::test]
    async fn latest_is_idempotent_on_unchanged_data() {
        let pool = pool().await;

        append(&pool, "u1", WARSAW).await.unwrap();
        append(&pool, "u2", WARSAW).await.unwrap();
        append(&pool, "u1", GeoPoint { latitude: 51.0, longitude: 17.0 })
            .await
            .unwrap();

        let first: Vec<_> = latest_for_users(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.id, r.user_id))
            .collect();
        let second: Vec<_> = latest_for_users(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.id, r.user_id))
            .collect();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn latest_breaks_timestamp_ties_by_insertion_id() {
        let pool = pool().await;
        let shared = Utc::now();

        insert_at(&pool, "u1", shared).await;
        let newer = insert_at(&pool, "u1", shared).await;

        let latest = latest_for_users(&pool).await.unwrap();

        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].id, newer);
    }

    #[tokio::test]
    async fn find_unknown_id_is_not_found() {
        let pool = pool().await;

        let result = find(&pool, 4242).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
