//! # Streaming Ingestion Channel
//!
//! One WebSocket per client. The identity is captured once at handshake
//! (a handshake without one is rejected before the upgrade) and every
//! accepted `location_update` frame becomes one ledger append followed by
//! one ack:
//!
//! - valid update: append, then `{"type": "location_saved", "success": true}`
//! - malformed coordinates or a failed write: no row,
//!   `{"type": "location_saved", "success": false}`, connection stays open
//! - any other `type`: ignored without an ack
//!
//! Frames are processed strictly in order; the next frame is not read
//! until the previous ack has been written, so a slow ledger pushes back
//! into the transport buffers. A connection carries no memory of prior
//! messages and there are no resume semantics.
use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};

use crate::{auth::AuthenticatedUser, error::AppError, geo::GeoPoint, reports, state::AppState};

pub async fn location_channel(
    ws: WebSocketUpgrade,
    user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| drive_connection(socket, state, user))
}

async fn drive_connection(mut socket: WebSocket, state: Arc<AppState>, user: AuthenticatedUser) {
    info!(user = %user.0, "location channel open");

    while let Some(received) = socket.recv().await {
        let frame = match received {
            Ok(frame) => frame,
            Err(e) => {
                debug!(user = %user.0, "socket error: {e}");
                break;
            }
        };

        let text = match frame {
            Message::Text(text) => text,
            Message::Close(_) => break,
            // pings are answered by the transport layer
            _ => continue,
        };

        let Some(success) = handle_frame(&state.pool, &user.0, text.as_str()).await else {
            continue;
        };

        let ack = json!({ "type": "location_saved", "success": success }).to_string();

        if socket.send(Message::Text(ack.into())).await.is_err() {
            break;
        }
    }

    info!(user = %user.0, "location channel closed");
}

/// Classifies one inbound frame; returns the ack to emit, if any.
///
/// `Some(true)` is only ever returned after the append committed.
async fn handle_frame(pool: &SqlitePool, user_id: &str, text: &str) -> Option<bool> {
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        return None;
    };

    if value.get("type").and_then(Value::as_str) != Some("location_update") {
        return None;
    }

    let point = match parse_point(&value) {
        Ok(point) => point,
        Err(e) => {
            warn!(user = user_id, "rejected location update: {e}");
            return Some(false);
        }
    };

    match reports::append(pool, user_id, point).await {
        Ok(_) => Some(true),
        Err(e @ AppError::Validation(_)) => {
            warn!(user = user_id, "rejected location update: {e}");
            Some(false)
        }
        Err(e) => {
            error!(user = user_id, "failed to persist location update: {e}");
            Some(false)
        }
    }
}

fn parse_point(value: &Value) -> Result<GeoPoint, AppError> {
    let latitude = value
        .get("latitude")
        .and_then(Value::as_f64)
        .ok_or_else(|| AppError::Validation("latitude must be a number".into()))?;

    let longitude = value
        .get("longitude")
        .and_then(Value::as_f64)
        .ok_or_else(|| AppError::Validation("longitude must be a number".into()))?;

    Ok(GeoPoint {
        latitude,
        longitude,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database;

    async fn pool() -> SqlitePool {
        database::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn valid_update_appends_and_acks_success() {
        let pool = pool().await;

        let ack = handle_frame(
            &pool,
            "u1",
            r#"{"type":"location_update","latitude":52.2297,"longitude":21.0122}"#,
        )
        .await;

        assert_eq!(ack, Some(true));

        let rows = reports::list(&pool).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, "u1");
        assert!((rows[0].latitude - 52.2297).abs() < 1e-6);
        assert!((rows[0].longitude - 21.0122).abs() < 1e-6);
    }

    #[tokio::test]
    async fn string_latitude_acks_failure_without_row() {
        let pool = pool().await;

        let ack = handle_frame(
            &pool,
            "u1",
            r#"{"type":"location_update","latitude":"not-a-number","longitude":21.0}"#,
        )
        .await;

        assert_eq!(ack, Some(false));
        assert!(reports::list(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_longitude_acks_failure() {
        let pool = pool().await;

        let ack = handle_frame(&pool, "u1", r#"{"type":"location_update","latitude":52.0}"#).await;

        assert_eq!(ack, Some(false));
        assert!(reports::list(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn out_of_range_latitude_acks_failure() {
        let pool = pool().await;

        let ack = handle_frame(
            &pool,
            "u1",
            r#"{"type":"location_update","latitude":95.0,"longitude":21.0}"#,
        )
        .await;

        assert_eq!(ack, Some(false));
        assert!(reports::list(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_acks_failure() {
        let pool = pool().await;
        pool.close().await;

        let ack = handle_frame(
            &pool,
            "u1",
            r#"{"type":"location_update","latitude":52.0,"longitude":21.0}"#,
        )
        .await;

        assert_eq!(ack, Some(false));
    }

    #[tokio::test]
    async fn unknown_type_is_ignored() {
        let pool = pool().await;

        let ack = handle_frame(&pool, "u1", r#"{"type":"ping"}"#).await;

        assert_eq!(ack, None);
        assert!(reports::list(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_json_frame_is_ignored() {
        let pool = pool().await;

        assert_eq!(handle_frame(&pool, "u1", "definitely not json").await, None);
        assert_eq!(handle_frame(&pool, "u1", "[1, 2, 3]").await, None);
    }
}
