// handlers/protected/sets.rs - PATCH /api/workout/sets/:id

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Extension, Json,
};
use uuid::Uuid;

use crate::domain::{SetUpdateInput, WorkoutSet};
use crate::handlers::path_id;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::SessionService;
use crate::state::AppState;

/// PATCH /api/workout/sets/:id - record reps, weight, completion or notes
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<SetUpdateInput>, JsonRejection>,
) -> ApiResult<WorkoutSet> {
    let id = path_id(path)?;
    let Json(input) = payload?;
    let set = SessionService::new(&state).update_set(user.id, id, input).await?;
    Ok(ApiResponse::success(set))
}
