use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    factories::{self, Factory, FactoryPayload},
    geo::GeoPoint,
    reports::{self, LocationReport},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct ReportBody {
    pub id: i64,
    pub location: GeoPoint,
    pub timestamp: DateTime<Utc>,
    pub user: String,
}

impl From<LocationReport> for ReportBody {
    fn from(report: LocationReport) -> Self {
        Self {
            id: report.id,
            location: report.point(),
            timestamp: report.timestamp,
            user: report.user_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewReport {
    pub location: GeoPoint,
}

pub async fn list_reports(
    _user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ReportBody>>, AppError> {
    let reports = reports::list(&state.pool).await?;

    Ok(Json(reports.into_iter().map(ReportBody::from).collect()))
}

pub async fn create_report(
    user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewReport>,
) -> Result<(StatusCode, Json<ReportBody>), AppError> {
    let report = reports::append(&state.pool, &user.0, payload.location).await?;

    Ok((StatusCode::CREATED, Json(report.into())))
}

pub async fn latest_reports(
    _user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ReportBody>>, AppError> {
    let latest = reports::latest_for_users(&state.pool).await?;

    Ok(Json(latest.into_iter().map(ReportBody::from).collect()))
}

pub async fn get_report(
    _user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ReportBody>, AppError> {
    let report = reports::find(&state.pool, id).await?;

    Ok(Json(report.into()))
}

pub async fn list_factories(
    _user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Factory>>, AppError> {
    Ok(Json(factories::list(&state.pool).await?))
}

pub async fn create_factory(
    _user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FactoryPayload>,
) -> Result<(StatusCode, Json<Factory>), AppError> {
    let factory = factories::create(&state.pool, payload).await?;

    Ok((StatusCode::CREATED, Json(factory)))
}

pub async fn get_factory(
    _user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Factory>, AppError> {
    Ok(Json(factories::find(&state.pool, id).await?))
}

pub async fn update_factory(
    _user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FactoryPayload>,
) -> Result<Json<Factory>, AppError> {
    Ok(Json(factories::update(&state.pool, id, payload).await?))
}

pub async fn delete_factory(
    _user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    factories::delete(&state.pool, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
