// handlers/public/system.rs - GET / and GET /health

use axum::extract::State;
use chrono::Utc;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET / - service name, version and route overview
pub async fn root() -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "name": "Workout Tracker API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": "/login, /auth/signin, /auth/callback, /auth/signout (public)",
            "pages": "/dashboard, /exercises, /workouts, /workouts/plans, /workouts/calendar, /workouts/history",
            "session": "/api/auth/session (protected)",
            "exercises": "/api/exercises[/:id[/history]] (protected)",
            "plans": "/api/workout/plans[/:id] (protected)",
            "sessions": "/api/workout/sessions[/:id[/start|/complete|/schedule|/progression]] (protected)",
            "sets": "/api/workout/sets/:id (protected)",
        }
    }))
}

/// GET /health - 200 when the store answers, 503 otherwise
pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    state.store.health_check().await.map_err(|e| {
        tracing::warn!("Health check failed: {}", e);
        ApiError::service_unavailable("Database unavailable")
    })?;

    Ok(ApiResponse::success(json!({
        "status": "ok",
        "timestamp": Utc::now(),
        "database": "ok",
    })))
}
