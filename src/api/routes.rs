//! API route handlers.
//!
//! All endpoints return JSON. Engine errors are mapped onto HTTP status
//! codes by `ApiError`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::betting::{BetEvent, BetEventBuilder, RaceEvents};
use crate::engine::Aggregator;
use crate::sports::horse_racing::{group_by_venue, VenueRaces};
use crate::types::{BetEventType, EngineError, Fixture, Snapshot, Sport};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct ApiState {
    pub aggregator: Arc<Aggregator>,
    /// Present when horse racing is enabled.
    pub bets: Option<Arc<BetEventBuilder>>,
}

pub type AppState = Arc<ApiState>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ApiError {
    Engine(EngineError),
    BadRequest(String),
    Disabled(&'static str),
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError::Engine(e)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

pub fn status_for(error: &EngineError) -> StatusCode {
    match error {
        EngineError::UnknownSport(_)
        | EngineError::FixtureNotFound { .. }
        | EngineError::RaceNotFound { .. }
        | EngineError::CacheMiss { .. } => StatusCode::NOT_FOUND,
        EngineError::InvalidBetFormula { .. } => StatusCode::BAD_REQUEST,
        EngineError::UpstreamRateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        EngineError::UpstreamAuthFailed { .. } | EngineError::MalformedPayload { .. } => {
            StatusCode::BAD_GATEWAY
        }
        EngineError::UpstreamUnreachable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Storage(_) | EngineError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_code(error: &EngineError) -> &'static str {
    match error {
        EngineError::UpstreamRateLimited { .. } => "upstream_rate_limited",
        EngineError::UpstreamAuthFailed { .. } => "upstream_auth_failed",
        EngineError::UpstreamUnreachable { .. } => "upstream_unreachable",
        EngineError::MalformedPayload { .. } => "malformed_upstream_payload",
        EngineError::CacheMiss { .. } => "cache_miss",
        EngineError::InvalidBetFormula { .. } => "invalid_bet_formula",
        EngineError::UnknownSport(_) => "unknown_sport",
        EngineError::FixtureNotFound { .. } => "fixture_not_found",
        EngineError::RaceNotFound { .. } => "race_not_found",
        EngineError::Storage(_) => "storage",
        EngineError::Config(_) => "config",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Engine(e) => {
                let status = status_for(&e);
                if status.is_server_error() {
                    warn!(error = %e, %status, "Request failed");
                }
                (
                    status,
                    ErrorBody {
                        error: error_code(&e),
                        message: e.to_string(),
                    },
                )
            }
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "bad_request",
                    message,
                },
            ),
            ApiError::Disabled(what) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: "disabled",
                    message: format!("{what} is not enabled"),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("invalid date '{raw}', expected YYYY-MM-DD")))
}

fn parse_sport(raw: &str) -> Result<Sport, ApiError> {
    Ok(raw.parse::<Sport>()?)
}

fn bets(state: &ApiState) -> Result<&BetEventBuilder, ApiError> {
    state
        .bets
        .as_deref()
        .ok_or(ApiError::Disabled("horse racing"))
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct RefreshQuery {
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct FixtureQuery {
    pub date: Option<String>,
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetRequest {
    pub event_type: String,
    pub formula: String,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET /api/sports
pub async fn list_sports(State(state): State<AppState>) -> Json<Vec<Sport>> {
    Json(state.aggregator.sports())
}

/// GET /api/sports/:sport/dates
pub async fn list_dates(
    State(state): State<AppState>,
    Path(sport): Path<String>,
) -> ApiResult<Vec<NaiveDate>> {
    let sport = parse_sport(&sport)?;
    Ok(Json(state.aggregator.list_dates(sport).await?))
}

/// GET /api/sports/:sport/snapshots/:date
pub async fn get_snapshot(
    State(state): State<AppState>,
    Path((sport, date)): Path<(String, String)>,
    Query(query): Query<RefreshQuery>,
) -> ApiResult<Snapshot> {
    let sport = parse_sport(&sport)?;
    let date = parse_date(&date)?;
    let snapshot = state
        .aggregator
        .get_snapshot(sport, date, query.refresh)
        .await?;
    Ok(Json(snapshot))
}

/// GET /api/sports/:sport/fixtures/:id
pub async fn get_fixture(
    State(state): State<AppState>,
    Path((sport, fixture_id)): Path<(String, String)>,
    Query(query): Query<FixtureQuery>,
) -> ApiResult<Fixture> {
    let sport = parse_sport(&sport)?;
    let date = query.date.as_deref().map(parse_date).transpose()?;
    let fixture = state
        .aggregator
        .find_fixture_by_id(sport, &fixture_id, date, query.refresh)
        .await?;
    Ok(Json(fixture))
}

/// GET /api/racing/:date/venues
pub async fn racing_venues(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Query(query): Query<RefreshQuery>,
) -> ApiResult<Vec<VenueRaces>> {
    let date = parse_date(&date)?;
    let snapshot = state
        .aggregator
        .get_snapshot(Sport::HorseRacing, date, query.refresh)
        .await?;
    Ok(Json(group_by_venue(&snapshot)))
}

/// GET /api/racing/:date/races/:race_id/events
pub async fn race_events(
    State(state): State<AppState>,
    Path((date, race_id)): Path<(String, String)>,
) -> ApiResult<RaceEvents> {
    let date = parse_date(&date)?;
    Ok(Json(bets(&state)?.race_events(date, &race_id).await?))
}

/// POST /api/racing/:date/races/:race_id/bets
pub async fn build_bet(
    State(state): State<AppState>,
    Path((date, race_id)): Path<(String, String)>,
    Json(request): Json<BetRequest>,
) -> ApiResult<BetEvent> {
    let date = parse_date(&date)?;
    let event_type = request.event_type.parse::<BetEventType>()?;
    let event = bets(&state)?
        .build(date, &race_id, event_type, &request.formula)
        .await?;
    Ok(Json(event))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
