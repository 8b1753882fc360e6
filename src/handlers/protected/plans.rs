// handlers/protected/plans.rs - /api/workout/plans

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::HeaderMap,
    Extension, Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::domain::{PlanDetail, PlanInput};
use crate::handlers::path_id;
use crate::middleware::{ApiResponse, ApiResult, Cached, CachedResult, CurrentUser};
use crate::revalidate::{is_fresh, paths};
use crate::services::PlanService;
use crate::state::AppState;

/// GET /api/workout/plans
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    headers: HeaderMap,
) -> CachedResult<Vec<PlanDetail>> {
    let etag = state.revalidator.etag(user.id, paths::PLANS, "");
    if is_fresh(&headers, &etag) {
        return Ok(Cached::NotModified(etag));
    }

    let plans = PlanService::new(&state).list(user.id).await?;
    Ok(Cached::Fresh(ApiResponse::success(plans).with_etag(etag)))
}

/// POST /api/workout/plans
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    payload: Result<Json<PlanInput>, JsonRejection>,
) -> ApiResult<PlanDetail> {
    let Json(input) = payload?;
    let plan = PlanService::new(&state).create(user.id, input).await?;
    Ok(ApiResponse::created(plan))
}

/// GET /api/workout/plans/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<PlanDetail> {
    let id = path_id(path)?;
    let plan = PlanService::new(&state).get(user.id, id).await?;
    Ok(ApiResponse::success(plan))
}

/// PUT /api/workout/plans/:id - rename and replace the exercise list
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<PlanInput>, JsonRejection>,
) -> ApiResult<PlanDetail> {
    let id = path_id(path)?;
    let Json(input) = payload?;
    let plan = PlanService::new(&state).update(user.id, id, input).await?;
    Ok(ApiResponse::success(plan))
}

/// DELETE /api/workout/plans/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Value> {
    let id = path_id(path)?;
    PlanService::new(&state).delete(user.id, id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
