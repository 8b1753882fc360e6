use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::database::{SetUpdate, WorkoutStore};
use crate::domain::progression::suggest;
use crate::domain::session::{check_can_complete, check_can_reschedule, check_can_start};
use crate::domain::validation::normalize_optional;
use crate::domain::{
    expand_plan_sets, ApplyProgressionInput, FieldErrors, LogInput, NewSession, NewSet,
    ProgressionSuggestion, ProgressionUpdate, RescheduleInput, ScheduleInput, SessionDetail,
    SessionQuery, SessionRuleError, SessionState, SessionStatus, SessionSummary, SetUpdateInput,
    Validate, WorkoutSet,
};
use crate::error::ApiError;
use crate::revalidate::{paths, Revalidator};
use crate::services::plan_service::PlanService;
use crate::state::AppState;

/// Result of accepting progression suggestions.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedProgression {
    pub applied: Vec<ProgressionSuggestion>,
    pub session: SessionDetail,
}

pub struct SessionService<'a> {
    store: &'a dyn WorkoutStore,
    revalidator: &'a Revalidator,
    plans: PlanService<'a>,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

impl<'a> SessionService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            store: state.store.as_ref(),
            revalidator: &state.revalidator,
            plans: PlanService::new(state),
        }
    }

    /// Calendar and history listing, newest first.
    pub async fn list(
        &self,
        user_id: Uuid,
        query: &SessionQuery,
    ) -> Result<Vec<SessionSummary>, ApiError> {
        query.validate()?;

        let sessions = self.store.list_sessions(user_id, query).await?;
        Ok(sessions
            .into_iter()
            .map(SessionSummary::from)
            .filter(|s| query.status.map_or(true, |status| s.status == status))
            .collect())
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<SessionDetail, ApiError> {
        self.store
            .find_session(user_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Workout session {} not found", id)))
    }

    /// Placeholder session for a future date with sets taken from the plan defaults.
    pub async fn schedule(
        &self,
        user_id: Uuid,
        input: ScheduleInput,
    ) -> Result<SessionDetail, ApiError> {
        input.validate_on(today())?;
        let plan = self.plans.get(user_id, input.workout_plan_id).await?;

        let session = NewSession {
            workout_plan_id: Some(plan.plan.id),
            plan_name: Some(plan.plan.name.clone()),
            date: input.date,
            state: SessionState {
                scheduled: true,
                started_at: None,
                completed_at: None,
            },
            notes: normalize_optional(input.notes),
            sets: expand_plan_sets(&plan.exercises),
        };

        let detail = self.store.insert_session(user_id, &session).await?;
        info!(
            "Scheduled session {} ({} sets) on {} for user {}",
            detail.session.id,
            detail.sets.len(),
            detail.session.date,
            user_id
        );
        self.revalidator.invalidate(user_id, paths::SESSION_PAGES);
        Ok(detail)
    }

    /// Record a workout that already happened; it is stored completed.
    pub async fn log(&self, user_id: Uuid, input: LogInput) -> Result<SessionDetail, ApiError> {
        let today = today();
        input.validate_on(today)?;

        let plan_name = match input.workout_plan_id {
            Some(plan_id) => Some(self.plans.get(user_id, plan_id).await?.plan.name),
            None => None,
        };

        let exercise_ids: Vec<Uuid> = input.sets.iter().map(|s| s.exercise_id).collect();
        let visible = self.store.visible_exercise_ids(user_id, &exercise_ids).await?;
        let mut errors = FieldErrors::new();
        for (i, id) in exercise_ids.iter().enumerate() {
            if !visible.contains(id) {
                errors.add(format!("sets[{}].exercise_id", i), "Exercise not found");
            }
        }
        errors.finish()?;

        let stamp = if input.date == today {
            Utc::now()
        } else {
            start_of_day(input.date)
        };

        let session = NewSession {
            workout_plan_id: input.workout_plan_id,
            plan_name,
            date: input.date,
            state: SessionState {
                scheduled: false,
                started_at: Some(stamp),
                completed_at: Some(stamp),
            },
            notes: normalize_optional(input.notes.clone()),
            sets: input.to_new_sets(),
        };

        let detail = self.store.insert_session(user_id, &session).await?;
        info!(
            "Logged session {} ({} sets) for user {}",
            detail.session.id,
            detail.sets.len(),
            user_id
        );
        self.revalidator.invalidate(user_id, paths::SESSION_PAGES);
        Ok(detail)
    }

    pub async fn start(&self, user_id: Uuid, id: Uuid) -> Result<SessionDetail, ApiError> {
        let detail = self.get(user_id, id).await?;
        check_can_start(&detail.session)?;

        let state = SessionState {
            scheduled: false,
            started_at: Some(Utc::now()),
            completed_at: None,
        };
        let session = self
            .store
            .update_session_state(user_id, id, &state)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Workout session {} not found", id)))?;

        self.revalidator.invalidate(user_id, paths::SESSION_PAGES);
        Ok(SessionDetail::new(session, detail.sets))
    }

    /// Only succeeds once every set of the session is marked completed.
    pub async fn complete(&self, user_id: Uuid, id: Uuid) -> Result<SessionDetail, ApiError> {
        let detail = self.get(user_id, id).await?;
        check_can_complete(&detail.session, &detail.sets)?;

        let now = Utc::now();
        let state = SessionState {
            scheduled: false,
            started_at: detail.session.started_at.or(Some(now)),
            completed_at: Some(now),
        };
        let session = self
            .store
            .update_session_state(user_id, id, &state)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Workout session {} not found", id)))?;

        info!("Completed session {} for user {}", id, user_id);
        self.revalidator.invalidate(user_id, paths::SESSION_PAGES);
        Ok(SessionDetail::new(session, detail.sets))
    }

    /// Move a session that has not started and rebuild its sets from the
    /// plan's current defaults.
    pub async fn reschedule(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: RescheduleInput,
    ) -> Result<SessionDetail, ApiError> {
        let detail = self.get(user_id, id).await?;
        check_can_reschedule(&detail.session)?;
        input.validate_on(today())?;

        let plan = match detail.session.workout_plan_id {
            Some(plan_id) => self.store.find_plan(user_id, plan_id).await?,
            None => None,
        };
        let sets = match plan {
            Some(plan) => expand_plan_sets(&plan.exercises),
            None => reset_sets(&detail.sets),
        };

        let rescheduled = self
            .store
            .reschedule_session(user_id, id, input.date, &sets)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Workout session {} not found", id)))?;

        info!("Rescheduled session {} to {}", id, input.date);
        self.revalidator.invalidate(user_id, paths::SESSION_PAGES);
        Ok(rescheduled)
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        if !self.store.delete_session(user_id, id).await? {
            return Err(ApiError::not_found(format!("Workout session {} not found", id)));
        }

        info!("Deleted session {} for user {}", id, user_id);
        self.revalidator.invalidate(user_id, paths::SESSION_PAGES);
        Ok(())
    }

    pub async fn progression(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Vec<ProgressionSuggestion>, ApiError> {
        let detail = self.completed(user_id, id).await?;
        Ok(suggest(&detail.sets))
    }

    async fn completed(&self, user_id: Uuid, id: Uuid) -> Result<SessionDetail, ApiError> {
        let detail = self.get(user_id, id).await?;
        if detail.status != SessionStatus::Completed {
            return Err(SessionRuleError::NotCompleted.into());
        }
        Ok(detail)
    }

    /// Accept suggestions (all of them when `exercise_ids` is empty): the plan's
    /// starting weights move and the hints are stored on the session's sets.
    pub async fn apply_progression(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: ApplyProgressionInput,
    ) -> Result<AppliedProgression, ApiError> {
        let detail = self.completed(user_id, id).await?;
        let suggestions = suggest(&detail.sets);

        let mut errors = FieldErrors::new();
        for (i, exercise_id) in input.exercise_ids.iter().enumerate() {
            if !suggestions.iter().any(|s| s.exercise_id == *exercise_id) {
                errors.add(
                    format!("exercise_ids[{}]", i),
                    "Exercise is not part of this session",
                );
            }
        }
        errors.finish()?;

        let applied: Vec<ProgressionSuggestion> = suggestions
            .into_iter()
            .filter(|s| input.exercise_ids.is_empty() || input.exercise_ids.contains(&s.exercise_id))
            .collect();
        let updates: Vec<ProgressionUpdate> = applied.iter().map(ProgressionUpdate::from).collect();

        self.store
            .apply_progression(user_id, id, detail.session.workout_plan_id, &updates)
            .await?;

        info!(
            "Applied {} progression updates from session {}",
            updates.len(),
            id
        );
        self.revalidator.invalidate(user_id, paths::SESSION_PAGES);
        self.revalidator.invalidate(user_id, paths::PLAN_PAGES);

        Ok(AppliedProgression {
            applied,
            session: self.get(user_id, id).await?,
        })
    }

    /// Partial update of one set; ownership is checked through its session.
    /// Sets of a completed session can no longer change.
    pub async fn update_set(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: SetUpdateInput,
    ) -> Result<WorkoutSet, ApiError> {
        input.validate()?;

        let outcome = self
            .store
            .update_set(user_id, id, &input)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Set {} not found", id)))?;

        let set = match outcome {
            SetUpdate::Updated(set) => set,
            SetUpdate::SessionCompleted => return Err(SessionRuleError::AlreadyCompleted.into()),
        };

        self.revalidator.invalidate(user_id, paths::SESSION_PAGES);
        Ok(set)
    }
}

/// Used when the session's plan is gone: keep the targets, drop the results.
fn reset_sets(sets: &[WorkoutSet]) -> Vec<NewSet> {
    sets.iter()
        .map(|set| NewSet {
            exercise_id: set.exercise_id,
            set_number: set.set_number,
            target_reps: set.target_reps,
            actual_reps: None,
            weight: set.weight,
            completed: false,
            notes: None,
        })
        .collect()
}
