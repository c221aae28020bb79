//! HTTP request handlers.

use super::AppState;
use crate::api::ApiError;
use crate::dashboard::{LoadState, PageState};
use crate::metrics::AlertFilter;
use crate::model::{EndpointDraft, EndpointId};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

// ============================================================================
// Errors
// ============================================================================

fn error_response(err: &ApiError) -> Response {
    let status = match err {
        ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        ApiError::Config(_) => StatusCode::BAD_REQUEST,
        ApiError::Status { status: 404, .. } => StatusCode::NOT_FOUND,
        ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ApiError::Network(_) | ApiError::Status { .. } | ApiError::Decode(_) => StatusCode::BAD_GATEWAY,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

fn status_for(list: &LoadState) -> StatusCode {
    match list {
        LoadState::Unauthorized => StatusCode::UNAUTHORIZED,
        _ => StatusCode::OK,
    }
}

// ============================================================================
// Health
// ============================================================================

pub async fn handle_health() -> impl IntoResponse {
    "ok"
}

// ============================================================================
// Dashboard
// ============================================================================

pub async fn handle_dashboard(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.dashboard.refresh().await;
    (status_for(&snapshot.list), Json(snapshot))
}

#[derive(Debug, Serialize)]
struct AlertsResponse<'a> {
    list: &'a LoadState,
    alerts: Vec<&'a crate::metrics::AlertView>,
    alerts_today: usize,
}

pub async fn handle_alerts(
    State(state): State<AppState>,
    Query(filter): Query<AlertFilter>,
) -> Response {
    let snapshot = state.dashboard.alerts().await;
    let body = AlertsResponse {
        list: &snapshot.list,
        alerts: filter.apply(&snapshot.alerts),
        alerts_today: snapshot.alerts_today,
    };
    (status_for(&snapshot.list), Json(body)).into_response()
}

pub async fn handle_overview(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.dashboard.overview().await)
}

// ============================================================================
// Endpoint mutations
// ============================================================================

pub async fn handle_create_endpoint(
    State(state): State<AppState>,
    Json(draft): Json<EndpointDraft>,
) -> Response {
    match state.dashboard.create_endpoint(&draft).await {
        Ok(snapshot) => (StatusCode::CREATED, Json(snapshot)).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn handle_update_endpoint(
    State(state): State<AppState>,
    Path(id): Path<EndpointId>,
    Json(draft): Json<EndpointDraft>,
) -> Response {
    match state.dashboard.update_endpoint(id, &draft).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub is_active: bool,
}

pub async fn handle_toggle_endpoint(
    State(state): State<AppState>,
    Path(id): Path<EndpointId>,
    Json(req): Json<ToggleRequest>,
) -> Response {
    match state.dashboard.toggle_endpoint(id, req.is_active).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn handle_delete_endpoint(
    State(state): State<AppState>,
    Path(id): Path<EndpointId>,
) -> Response {
    match state.dashboard.delete_endpoint(id).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => error_response(&e),
    }
}

// ============================================================================
// History
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

pub async fn handle_endpoint_logs(
    State(state): State<AppState>,
    Path(id): Path<EndpointId>,
    Query(query): Query<LogsQuery>,
) -> Response {
    let mut pager = match query.limit {
        Some(limit) => crate::dashboard::LogPager::new(state.dashboard.transport(), id, limit),
        None => state.dashboard.pager(id),
    };
    pager.set_range(query.from, query.to);
    pager.seek(query.offset.unwrap_or(0));
    let status = match pager.fetch_page().await {
        PageState::Unauthorized => StatusCode::UNAUTHORIZED,
        _ => StatusCode::OK,
    };

    (status, Json(pager.view())).into_response()
}
