// handlers/protected/auth.rs - GET /api/auth/session

use axum::Extension;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, CurrentUser};

/// GET /api/auth/session - the signed-in user
pub async fn session(Extension(user): Extension<CurrentUser>) -> ApiResponse<Value> {
    ApiResponse::success(json!({ "user": user }))
}
