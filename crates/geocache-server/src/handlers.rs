use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::IntoResponse,
};
use geocache_core::{LocationFilter, LocationId, LocationPatch, LocationRecord, NewLocation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ApiError;
use crate::metrics;
use crate::server::AppState;
use crate::service::DeleteReport;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    pub status: &'a str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub store: &'static str,
    pub cache_mode: &'static str,
    pub cache_available: bool,
}

/// Query parameters accepted by `GET /locations`.
#[derive(Debug, Default, Deserialize)]
pub struct LocationQuery {
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub area: Option<String>,
}

impl LocationQuery {
    pub fn into_filter(self) -> LocationFilter {
        LocationFilter::from_params(self.country, self.state, self.city, self.area)
    }
}

pub async fn root(State(state): State<AppState>) -> impl IntoResponse {
    let body = json!({
        "service": "geocache",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "started_at": state.started_at.to_rfc3339(),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Reports the cache backend and whether it answers. An unavailable cache
/// degrades reads to the store, so the service still reports ready.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let cache_available = state.service.cache_available().await;
    let body = ReadyResponse {
        status: if cache_available { "ready" } else { "degraded" },
        store: state.service.store_backend(),
        cache_mode: state.service.cache_mode(),
        cache_available,
    };
    (StatusCode::OK, Json(body))
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    match metrics::render_metrics() {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => ApiError::not_found("metrics are not enabled").into_response(),
    }
}

// ---- Locations ----

pub async fn create_location(
    State(state): State<AppState>,
    payload: Result<Json<NewLocation>, JsonRejection>,
) -> Result<(StatusCode, Json<LocationRecord>), ApiError> {
    let Json(location) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let record = state.service.add_record(&location).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list_locations(
    State(state): State<AppState>,
    query: Result<Query<LocationQuery>, QueryRejection>,
) -> Result<Json<Vec<LocationRecord>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let filter = query.into_filter();
    let records = state.service.get_records(&filter).await?;
    Ok(Json(records))
}

pub async fn get_location(
    State(state): State<AppState>,
    id: Result<Path<LocationId>, PathRejection>,
) -> Result<Json<LocationRecord>, ApiError> {
    let Path(id) = id.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let record = state.service.get_record(id).await?;
    Ok(Json(record))
}

pub async fn update_location(
    State(state): State<AppState>,
    id: Result<Path<LocationId>, PathRejection>,
    payload: Result<Json<LocationPatch>, JsonRejection>,
) -> Result<Json<LocationRecord>, ApiError> {
    let Path(id) = id.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let Json(patch) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let record = state.service.update_record(id, &patch).await?;
    Ok(Json(record))
}

pub async fn delete_location(
    State(state): State<AppState>,
    id: Result<Path<LocationId>, PathRejection>,
) -> Result<Json<DeleteReport>, ApiError> {
    let Path(id) = id.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let report = state.service.delete_record(id).await?;
    Ok(Json(report))
}
