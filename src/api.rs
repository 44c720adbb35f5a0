// src/api.rs
//! HTTP surface for the economic calendar.

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::calendar::{
    mock, CalendarSnapshot, CoordinatorStatus, DataService, RefreshCoordinator, ScrapeOutcome,
    SourceTag,
};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DataService>,
    pub coordinator: Arc<RefreshCoordinator>,
}

impl AppState {
    pub fn new(coordinator: Arc<RefreshCoordinator>) -> Self {
        Self {
            service: Arc::clone(coordinator.service()),
            coordinator,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/economic-calendar", get(get_calendar))
        .route("/api/economic-calendar/refresh", post(refresh_calendar))
        .route("/api/economic-calendar/dashboard", get(dashboard_calendar))
        .route("/api/economic-calendar/scrape", post(run_scraper))
        .route("/api/economic-calendar/status", get(scraper_status))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct CalendarQuery {
    #[serde(default, rename = "forceRefresh")]
    force_refresh: bool,
}

async fn get_calendar(
    State(state): State<AppState>,
    Query(q): Query<CalendarQuery>,
) -> Json<CalendarSnapshot> {
    let svc = state.service;
    Json(serve(async move { svc.get_data(q.force_refresh).await }).await)
}

/// Manual refresh: goes straight to the data service, not through the coordinator.
async fn refresh_calendar(State(state): State<AppState>) -> Json<CalendarSnapshot> {
    let svc = state.service;
    Json(serve(async move { svc.get_data(true).await }).await)
}

async fn dashboard_calendar(State(state): State<AppState>) -> Json<CalendarSnapshot> {
    let coord = state.coordinator;
    Json(serve(async move { coord.run_on_dashboard_load().await }).await)
}

async fn run_scraper(State(state): State<AppState>) -> Json<ScrapeOutcome> {
    Json(state.coordinator.run_scraper().await)
}

async fn scraper_status(State(state): State<AppState>) -> Json<CoordinatorStatus> {
    Json(state.coordinator.status().await)
}

/// Run the pipeline on its own task so a dropped request does not cancel a
/// scrape midway, then substitute demo data when nothing real came back.
async fn serve<F>(fut: F) -> CalendarSnapshot
where
    F: Future<Output = CalendarSnapshot> + Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(snapshot) => with_static_fallback(snapshot),
        Err(e) => {
            warn!(target: "calendar", error = %e, "calendar task failed, serving demo data");
            CalendarSnapshot::new(mock::sample_events(), SourceTag::MockFallback)
        }
    }
}

/// Empty `error` results become `mock_fallback`, any other empty result `mock`.
pub fn with_static_fallback(snapshot: CalendarSnapshot) -> CalendarSnapshot {
    if !snapshot.data.is_empty() {
        return snapshot;
    }
    let tag = match snapshot.source {
        SourceTag::Error => SourceTag::MockFallback,
        _ => SourceTag::Mock,
    };
    CalendarSnapshot::new(mock::sample_events(), tag)
}
