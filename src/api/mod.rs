//! HTTP API: a thin axum layer over the aggregator and the bet builder.
//!
//! CORS is open so browser front-ends can call it directly.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

pub use routes::{ApiState, AppState};

/// Bind the API port and serve in a background task.
pub async fn spawn_api(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API port {port}"))?;

    info!(port, "API server listening on http://localhost:{port}");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server stopped");
        }
    });

    Ok(())
}

/// Build the router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/sports", get(routes::list_sports))
        .route("/api/sports/:sport/dates", get(routes::list_dates))
        .route("/api/sports/:sport/snapshots/:date", get(routes::get_snapshot))
        .route("/api/sports/:sport/fixtures/:id", get(routes::get_fixture))
        .route("/api/racing/:date/venues", get(routes::racing_venues))
        .route(
            "/api/racing/:date/races/:race_id/events",
            get(routes::race_events),
        )
        .route(
            "/api/racing/:date/races/:race_id/bets",
            post(routes::build_bet),
        )
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
