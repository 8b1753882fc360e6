// handlers/protected/exercises.rs - /api/exercises

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::HeaderMap,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::domain::{Exercise, ExerciseHistoryEntry, ExerciseInput};
use crate::handlers::path_id;
use crate::middleware::{ApiResponse, ApiResult, Cached, CachedResult, CurrentUser};
use crate::revalidate::{is_fresh, paths};
use crate::services::ExerciseService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ExerciseListQuery {
    #[serde(default)]
    pub include_shared: bool,
}

/// GET /api/exercises?include_shared=true
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    headers: HeaderMap,
    query: Result<Query<ExerciseListQuery>, QueryRejection>,
) -> CachedResult<Vec<Exercise>> {
    let Query(query) = query?;
    let service = ExerciseService::new(&state);

    let variant = if query.include_shared {
        format!("include_shared=true;catalog={}", service.shared_catalog_version().await?)
    } else {
        "include_shared=false".to_string()
    };
    let etag = state.revalidator.etag(user.id, paths::EXERCISES, &variant);
    if is_fresh(&headers, &etag) {
        return Ok(Cached::NotModified(etag));
    }

    let exercises = service.list(user.id, query.include_shared).await?;
    Ok(Cached::Fresh(ApiResponse::success(exercises).with_etag(etag)))
}

/// POST /api/exercises
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    payload: Result<Json<ExerciseInput>, JsonRejection>,
) -> ApiResult<Exercise> {
    let Json(input) = payload?;
    let exercise = ExerciseService::new(&state).create(user.id, input).await?;
    Ok(ApiResponse::created(exercise))
}

/// GET /api/exercises/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Exercise> {
    let id = path_id(path)?;
    let exercise = ExerciseService::new(&state).get(user.id, id).await?;
    Ok(ApiResponse::success(exercise))
}

/// PUT /api/exercises/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ExerciseInput>, JsonRejection>,
) -> ApiResult<Exercise> {
    let id = path_id(path)?;
    let Json(input) = payload?;
    let exercise = ExerciseService::new(&state).update(user.id, id, input).await?;
    Ok(ApiResponse::success(exercise))
}

/// DELETE /api/exercises/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Value> {
    let id = path_id(path)?;
    ExerciseService::new(&state).delete(user.id, id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

/// GET /api/exercises/:id/history - completed sets, newest first
pub async fn history(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Vec<ExerciseHistoryEntry>> {
    let id = path_id(path)?;
    let entries = ExerciseService::new(&state).history(user.id, id).await?;
    Ok(ApiResponse::success(entries))
}
