//! # Factory Registry
//!
//! CRUD store of named factory zones, each bounded by a closed polygon
//! geofence. Geofences are stored but never evaluated against positions
//! here; entry/exit detection lives elsewhere.
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, types::Json};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::AppError,
    geo::{GeoPoint, validate_geofence},
};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Factory {
    pub id: Uuid,
    pub name: String,
    pub geofence: Json<Vec<GeoPoint>>,
}

/// Client-supplied fields for create and update; the id is always
/// generated server-side.
#[derive(Debug, Deserialize)]
pub struct FactoryPayload {
    pub name: String,
    pub geofence: Vec<GeoPoint>,
}

pub async fn create(pool: &SqlitePool, payload: FactoryPayload) -> Result<Factory, AppError> {
    validate_geofence(&payload.geofence)?;

    let factory = Factory {
        id: Uuid::new_v4(),
        name: payload.name,
        geofence: Json(payload.geofence),
    };

    sqlx::query("INSERT INTO factories (id, name, geofence) VALUES (?, ?, ?)")
        .bind(factory.id)
        .bind(&factory.name)
        .bind(&factory.geofence)
        .execute(pool)
        .await?;

    info!(id = %factory.id, name = %factory.name, "created factory");

    Ok(factory)
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<Factory>, AppError> {
    let factories =
        sqlx::query_as::<_, Factory>("SELECT id, name, geofence FROM factories ORDER BY name")
            .fetch_all(pool)
            .await?;

    Ok(factories)
}

pub async fn find(pool: &SqlitePool, id: Uuid) -> Result<Factory, AppError> {
    sqlx::query_as::<_, Factory>("SELECT id, name, geofence FROM factories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("factory"))
}

pub async fn update(
    pool: &SqlitePool,
    id: Uuid,
    payload: FactoryPayload,
) -> Result<Factory, AppError> {
    validate_geofence(&payload.geofence)?;

    let geofence = Json(payload.geofence);
    let updated = sqlx::query("UPDATE factories SET name = ?, geofence = ? WHERE id = ?")
        .bind(&payload.name)
        .bind(&geofence)
        .bind(id)
        .execute(pool)
        .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("factory"));
    }

    Ok(Factory {
        id,
        name: payload.name,
        geofence,
    })
}

pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), AppError> {
    let deleted = sqlx::query("DELETE FROM factories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("factory"));
    }

    info!(id = %id, "deleted factory");

    Ok(())
}
