// handlers/protected/sessions.rs - /api/workout/sessions

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::HeaderMap,
    Extension, Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::domain::{
    ApplyProgressionInput, LogInput, ProgressionSuggestion, RescheduleInput, ScheduleInput,
    SessionDetail, SessionQuery, SessionSummary,
};
use crate::handlers::path_id;
use crate::middleware::{ApiResponse, ApiResult, Cached, CachedResult, CurrentUser};
use crate::revalidate::{is_fresh, paths};
use crate::services::{AppliedProgression, SessionService};
use crate::state::AppState;

/// GET /api/workout/sessions?from&to&status
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    headers: HeaderMap,
    query: Result<Query<SessionQuery>, QueryRejection>,
) -> CachedResult<Vec<SessionSummary>> {
    let Query(query) = query?;

    let variant = serde_json::to_string(&query).unwrap_or_default();
    let etag = state.revalidator.etag(user.id, paths::CALENDAR, &variant);
    if is_fresh(&headers, &etag) {
        return Ok(Cached::NotModified(etag));
    }

    let sessions = SessionService::new(&state).list(user.id, &query).await?;
    Ok(Cached::Fresh(ApiResponse::success(sessions).with_etag(etag)))
}

/// POST /api/workout/sessions/schedule
pub async fn schedule(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    payload: Result<Json<ScheduleInput>, JsonRejection>,
) -> ApiResult<SessionDetail> {
    let Json(input) = payload?;
    let session = SessionService::new(&state).schedule(user.id, input).await?;
    Ok(ApiResponse::created(session))
}

/// POST /api/workout/sessions/log
pub async fn log(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    payload: Result<Json<LogInput>, JsonRejection>,
) -> ApiResult<SessionDetail> {
    let Json(input) = payload?;
    let session = SessionService::new(&state).log(user.id, input).await?;
    Ok(ApiResponse::created(session))
}

/// GET /api/workout/sessions/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<SessionDetail> {
    let id = path_id(path)?;
    let session = SessionService::new(&state).get(user.id, id).await?;
    Ok(ApiResponse::success(session))
}

/// DELETE /api/workout/sessions/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Value> {
    let id = path_id(path)?;
    SessionService::new(&state).delete(user.id, id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

/// POST /api/workout/sessions/:id/start
pub async fn start(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<SessionDetail> {
    let id = path_id(path)?;
    let session = SessionService::new(&state).start(user.id, id).await?;
    Ok(ApiResponse::success(session))
}

/// POST /api/workout/sessions/:id/complete
pub async fn complete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<SessionDetail> {
    let id = path_id(path)?;
    let session = SessionService::new(&state).complete(user.id, id).await?;
    Ok(ApiResponse::success(session))
}

/// PUT /api/workout/sessions/:id/schedule - move to another date
pub async fn reschedule(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<RescheduleInput>, JsonRejection>,
) -> ApiResult<SessionDetail> {
    let id = path_id(path)?;
    let Json(input) = payload?;
    let session = SessionService::new(&state)
        .reschedule(user.id, id, input)
        .await?;
    Ok(ApiResponse::success(session))
}

/// GET /api/workout/sessions/:id/progression
pub async fn progression(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Vec<ProgressionSuggestion>> {
    let id = path_id(path)?;
    let suggestions = SessionService::new(&state).progression(user.id, id).await?;
    Ok(ApiResponse::success(suggestions))
}

/// POST /api/workout/sessions/:id/progression
pub async fn apply_progression(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ApplyProgressionInput>, JsonRejection>,
) -> ApiResult<AppliedProgression> {
    let id = path_id(path)?;
    let Json(input) = payload?;
    let applied = SessionService::new(&state)
        .apply_progression(user.id, id, input)
        .await?;
    Ok(ApiResponse::success(applied))
}
