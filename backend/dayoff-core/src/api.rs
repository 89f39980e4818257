// src/api.rs

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::error::SchedulingError;
use crate::service::{EmployeeSchedule, SaveEntry, SchedulingService};

/// Header carrying the badge authenticated by the upstream session layer.
pub const BADGE_HEADER: &str = "x-employee-badge";

// --- Application State ---

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SchedulingService>,
}

// --- Error Handling ---

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Scheduling(#[from] SchedulingError),
    #[error("Malformed request body: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, badge) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, None),
            ApiError::Scheduling(err) => {
                let status = match err {
                    SchedulingError::Unauthenticated | SchedulingError::UnknownCaller(_) => {
                        StatusCode::UNAUTHORIZED
                    }
                    SchedulingError::NotSupervisor { .. }
                    | SchedulingError::NotSubordinate { .. }
                    | SchedulingError::NotOwner { .. } => StatusCode::FORBIDDEN,
                    SchedulingError::NoEntries
                    | SchedulingError::InvalidEntry { .. }
                    | SchedulingError::DateOutsidePeriod(_)
                    | SchedulingError::InvalidToken(_) => StatusCode::BAD_REQUEST,
                    SchedulingError::DispatchNotFound(_) => StatusCode::NOT_FOUND,
                    SchedulingError::AlreadyValidated(_) => StatusCode::CONFLICT,
                    SchedulingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.badge().map(String::from))
            }
        };

        let message = if status.is_server_error() {
            error!("Request failed: {}", self);
            "Internal server error. Check logs.".to_string()
        } else {
            warn!("Request rejected ({}): {}", status.as_u16(), self);
            self.to_string()
        };

        let mut body = json!({ "success": false, "error": message });
        if let Some(badge) = badge {
            body["badge"] = json!(badge);
        }
        (status, Json(body)).into_response()
    }
}

// --- Request / Response Types ---

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    #[serde(default)]
    pub entries: Vec<SaveEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    #[serde(default)]
    pub work_days: Vec<NaiveDate>,
    pub date: NaiveDate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleListing<'a> {
    success: bool,
    period: &'a [NaiveDate],
    max_off_days: usize,
    employees: Vec<EmployeeSchedule>,
}

// --- Router ---

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/supervisor/status", get(supervisor_status))
        .route("/schedule", get(list_schedule).post(save_schedule))
        .route("/schedule/me", get(my_schedule))
        .route("/schedule/toggle", post(toggle_preview))
        .route("/dispatches/{token}", get(dispatch_status))
        .route("/dispatches/{token}/validate", post(validate_dispatch));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

fn caller_badge(headers: &HeaderMap) -> Option<&str> {
    headers.get(BADGE_HEADER).and_then(|h| h.to_str().ok())
}

// --- Handlers ---

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn supervisor_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let caller = state.service.caller(caller_badge(&headers)).await?;
    let status = state.service.supervisor_status(&caller).await?;
    Ok(Json(json!({
        "success": true,
        "badge": caller.badge,
        "name": caller.name,
        "isSupervisor": status.is_supervisor,
        "subordinates": status.subordinates,
    })))
}

async fn list_schedule(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let caller = state.service.caller(caller_badge(&headers)).await?;
    let employees = state.service.list_with_schedule(&caller).await?;
    Ok(Json(ScheduleListing {
        success: true,
        period: state.service.period().dates(),
        max_off_days: state.service.policy().max_off_days,
        employees,
    })
    .into_response())
}

async fn save_schedule(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<SaveRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let caller = state.service.caller(caller_badge(&headers)).await?;
    let report = state.service.save(&caller, &request.entries).await?;

    let status = match report.failed() {
        0 => StatusCode::OK,
        n if n == report.results.len() => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::MULTI_STATUS,
    };
    if status != StatusCode::OK {
        error!(
            "Save by {} finished with {} failed employee(s)",
            caller.badge,
            report.failed()
        );
    }
    Ok((status, Json(report)))
}

async fn my_schedule(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let caller = state.service.caller(caller_badge(&headers)).await?;
    let schedule = state.service.my_schedule(&caller).await?;
    Ok(Json(json!({
        "success": true,
        "period": state.service.period().dates(),
        "schedule": schedule,
    })))
}

async fn toggle_preview(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ToggleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.caller(caller_badge(&headers)).await?;
    let Json(request) = payload?;
    let preview = state
        .service
        .toggle_preview(&request.work_days, request.date)?;
    Ok(Json(preview))
}

async fn dispatch_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = state.service.caller(caller_badge(&headers)).await?;
    let view = state.service.dispatch_status(&caller, &token).await?;
    Ok(Json(view))
}

async fn validate_dispatch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = state.service.caller(caller_badge(&headers)).await?;
    let view = state.service.validate_dispatch(&caller, &token).await?;
    Ok(Json(view))
}
