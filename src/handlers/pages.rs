// handlers/pages.rs - gated page models
//
// Unauthenticated visitors are redirected to /login by `require_page_session`.
// Each handler returns the data its page needs; rendering happens client-side.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension,
};
use chrono::{Datelike, Months, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::domain::{SessionQuery, SessionStatus, SessionSummary};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::{ExerciseService, PlanService, SessionService};
use crate::state::AppState;

const DASHBOARD_LIMIT: usize = 5;

#[derive(Debug, Serialize)]
pub struct PageModel {
    pub page: &'static str,
    pub user: CurrentUser,
    pub data: Value,
}

fn page(name: &'static str, user: CurrentUser, data: Value) -> ApiResult<PageModel> {
    Ok(ApiResponse::success(PageModel {
        page: name,
        user,
        data,
    }))
}

/// GET /dashboard - next scheduled and last completed sessions
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<PageModel> {
    let today = Utc::now().date_naive();
    let sessions = SessionService::new(&state);

    let mut upcoming = sessions
        .list(
            user.id,
            &SessionQuery {
                from: Some(today),
                status: Some(SessionStatus::Scheduled),
                ..Default::default()
            },
        )
        .await?;
    // Listing is newest first; the dashboard wants the nearest date first.
    upcoming.reverse();
    upcoming.truncate(DASHBOARD_LIMIT);

    let mut recent = sessions
        .list(
            user.id,
            &SessionQuery {
                status: Some(SessionStatus::Completed),
                ..Default::default()
            },
        )
        .await?;
    recent.truncate(DASHBOARD_LIMIT);

    let plans = PlanService::new(&state).list(user.id).await?;

    page(
        "dashboard",
        user,
        json!({
            "upcoming": upcoming,
            "recent": recent,
            "plan_count": plans.len(),
        }),
    )
}

/// GET /exercises
pub async fn exercises(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<PageModel> {
    let exercises = ExerciseService::new(&state).list(user.id, true).await?;
    page("exercises", user, json!({ "exercises": exercises }))
}

/// GET /workouts - plans plus every session
pub async fn workouts(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<PageModel> {
    let plans = PlanService::new(&state).list(user.id).await?;
    let sessions = SessionService::new(&state)
        .list(user.id, &SessionQuery::default())
        .await?;
    page(
        "workouts",
        user,
        json!({ "plans": plans, "sessions": sessions }),
    )
}

/// GET /workouts/plans
pub async fn plans(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<PageModel> {
    let plans = PlanService::new(&state).list(user.id).await?;
    page("plans", user, json!({ "plans": plans }))
}

/// GET /workouts/calendar?from&to&status - defaults to the current month
pub async fn calendar(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    query: Result<Query<SessionQuery>, QueryRejection>,
) -> ApiResult<PageModel> {
    let Query(mut query) = query?;
    if query.from.is_none() && query.to.is_none() {
        let (from, to) = month_bounds(Utc::now().date_naive());
        query.from = Some(from);
        query.to = Some(to);
    }

    let sessions = SessionService::new(&state).list(user.id, &query).await?;
    page(
        "calendar",
        user,
        json!({
            "from": query.from,
            "to": query.to,
            "sessions": sessions,
        }),
    )
}

/// GET /workouts/history - completed sessions, newest first
pub async fn history(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<PageModel> {
    let sessions: Vec<SessionSummary> = SessionService::new(&state)
        .list(
            user.id,
            &SessionQuery {
                status: Some(SessionStatus::Completed),
                ..Default::default()
            },
        )
        .await?;
    page("history", user, json!({ "sessions": sessions }))
}

/// First and last day of the month containing `date`.
fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_day(1).unwrap_or(date);
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date);
    (first, last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_bounds_handles_february() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 14).unwrap();
        let (from, to) = month_bounds(date);
        assert_eq!(from, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(to, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn month_bounds_handles_december() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        let (from, to) = month_bounds(date);
        assert_eq!(from, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(to, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }
}
