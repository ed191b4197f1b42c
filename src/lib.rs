//! # Eurorace Location Backend
//!
//! Tracks real-time device locations for participants in a distributed
//! race and serves the latest known position per user, plus static
//! factory geofence zones.
//!
//!
//!
//! # General Infrastructure
//! - Clients hold a persistent WebSocket to `/ws/location` and stream
//!   position updates; every accepted update becomes one row in an
//!   append-only ledger
//! - A reverse proxy in front of this service handles authentication and
//!   attaches the verified identity as an `x-user-id` header; this core
//!   never sees credentials
//! - Read paths (`/api/...`) are plain JSON over HTTP
//!
//!
//!
//! # Wire Format
//!
//! Over the WebSocket, message by message:
//!
//! Client to server
//! ```json
//! {"type": "location_update", "latitude": 52.2297, "longitude": 21.0122}
//! ```
//!
//! Server to client
//! ```json
//! {"type": "location_saved", "success": true}
//! ```
//!
//! Messages with an unrecognized `type` are ignored without an ack so the
//! format can grow without breaking old servers. An update is never
//! acked as successful unless its row is durably written.
//!
//!
//!
//! # Setup
//!
//! ```sh
//! RUST_LOG=info cargo run
//! ```
//!
//! Configuration is environment-driven, see [`config`].
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{HeaderName, Method, header::CONTENT_TYPE},
    routing::get,
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod factories;
pub mod geo;
pub mod reports;
pub mod routes;
pub mod state;
pub mod ws;

use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(auth::IDENTITY_HEADER)])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route(
            "/api/location-reports",
            get(routes::list_reports).post(routes::create_report),
        )
        .route("/api/location-reports/latest", get(routes::latest_reports))
        .route("/api/location-reports/{id}", get(routes::get_report))
        .route(
            "/api/factories",
            get(routes::list_factories).post(routes::create_factory),
        )
        .route(
            "/api/factories/{id}",
            get(routes::get_factory)
                .put(routes::update_factory)
                .delete(routes::delete_factory),
        )
        .route("/ws/location", get(ws::location_channel))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting server...");

    let app = router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
