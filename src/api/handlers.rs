//! API Handlers
//!
//! HTTP request handlers for each matchday endpoint. Data endpoints all go
//! through `RefreshCache::get_fresh` and answer with an envelope body.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};

use crate::cache::RefreshCache;
use crate::error::{RefreshError, Result};
use crate::fetch::Day;
use crate::models::{
    EnvelopeResponse, HealthResponse, RefreshQuery, RefreshResponse, StatsResponse,
    StatusResponse,
};
use crate::resource::{details_id, fixtures_id, CHANNELS, EVENTS, STANDINGS};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared refresh cache
    pub cache: Arc<RefreshCache>,
}

impl AppState {
    /// Creates a new AppState owning the given cache.
    pub fn new(cache: RefreshCache) -> Self {
        Self::from_shared(Arc::new(cache))
    }

    /// Creates a new AppState around a cache shared with background tasks.
    pub fn from_shared(cache: Arc<RefreshCache>) -> Self {
        Self { cache }
    }
}

async fn serve(state: &AppState, id: &str) -> Result<Json<EnvelopeResponse>> {
    let served = state.cache.get_fresh(id).await?;
    Ok(Json(served.into()))
}

fn parse_day(kind: &str, raw: &str) -> Result<Day> {
    Day::parse(raw).ok_or_else(|| RefreshError::UnknownResource(format!("{kind}:{raw}")))
}

/// Handler for GET /results
pub async fn results_today_handler(
    State(state): State<AppState>,
) -> Result<Json<EnvelopeResponse>> {
    serve(&state, fixtures_id(Day::Today).as_str()).await
}

/// Handler for GET /results/:day
///
/// `day` is today, yesterday or tomorrow, or the hoy/ayer/man aliases.
pub async fn results_handler(
    State(state): State<AppState>,
    Path(day): Path<String>,
) -> Result<Json<EnvelopeResponse>> {
    let day = parse_day("fixtures", &day)?;
    serve(&state, fixtures_id(day).as_str()).await
}

/// Handler for GET /games
pub async fn games_today_handler(State(state): State<AppState>) -> Result<Json<EnvelopeResponse>> {
    serve(&state, details_id(Day::Today).as_str()).await
}

/// Handler for GET /games/:day
pub async fn games_handler(
    State(state): State<AppState>,
    Path(day): Path<String>,
) -> Result<Json<EnvelopeResponse>> {
    let day = parse_day("details", &day)?;
    serve(&state, details_id(day).as_str()).await
}

/// Handler for GET /standings
pub async fn standings_handler(State(state): State<AppState>) -> Result<Json<EnvelopeResponse>> {
    serve(&state, STANDINGS).await
}

/// Handler for GET /channels (and /canales)
pub async fn channels_handler(State(state): State<AppState>) -> Result<Json<EnvelopeResponse>> {
    serve(&state, CHANNELS).await
}

/// Handler for GET /events (and /eventos)
pub async fn events_handler(State(state): State<AppState>) -> Result<Json<EnvelopeResponse>> {
    serve(&state, EVENTS).await
}

/// Handler for GET /resources
///
/// Lists every registered resource with its policy and refresh state.
pub async fn resources_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        resources: state.cache.status(),
    })
}

/// Handler for GET /resources/:id
pub async fn resource_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EnvelopeResponse>> {
    serve(&state, &id).await
}

/// Handler for POST /resources/:id/refresh
///
/// Invalidates the resource, then refreshes it in the background. With
/// `wait=true` it answers with the envelope of a refresh started after the
/// trigger, waiting out any refresh already running.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RefreshQuery>,
) -> Result<Response> {
    if query.wait {
        let served = state.cache.refresh_now(&id).await?;
        return Ok(Json(EnvelopeResponse::from(served)).into_response());
    }

    state.cache.invalidate(&id)?;
    let started = state.cache.refresh_async(&id)?;
    Ok(Json(RefreshResponse::new(id, started)).into_response())
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.cache.stats().into())
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.resource_ids().len()))
}
