use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::plan::PlanExercise;
use super::validation::{
    check_optional_text, check_range_i32, check_weight, normalize_optional, FieldErrors, Validate,
    MAX_NOTES_LEN,
};

pub const MAX_REPS: i32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSession {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Null once the plan has been deleted; `plan_name` keeps the history readable.
    pub workout_plan_id: Option<Uuid>,
    pub plan_name: Option<String>,
    pub date: NaiveDate,
    pub scheduled: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkoutSession {
    pub fn status(&self) -> SessionStatus {
        if self.completed_at.is_some() {
            SessionStatus::Completed
        } else if !self.scheduled && self.started_at.is_some() {
            SessionStatus::InProgress
        } else {
            SessionStatus::Scheduled
        }
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            scheduled: self.scheduled,
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}

/// Lifecycle columns of a session, written together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionState {
    pub scheduled: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSet {
    pub id: Uuid,
    pub workout_session_id: Uuid,
    pub exercise_id: Uuid,
    pub exercise_name: String,
    pub set_number: i32,
    pub target_reps: i32,
    pub actual_reps: Option<i32>,
    pub weight: f64,
    pub completed: bool,
    pub notes: Option<String>,
    pub progression_hint: Option<String>,
}

impl WorkoutSet {
    /// The set was completed with at least the targeted repetitions.
    pub fn hit_target(&self) -> bool {
        self.completed && self.actual_reps.unwrap_or(0) >= self.target_reps
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: WorkoutSession,
    pub status: SessionStatus,
    pub sets: Vec<WorkoutSet>,
}

impl SessionDetail {
    pub fn new(session: WorkoutSession, sets: Vec<WorkoutSet>) -> Self {
        let status = session.status();
        Self { session, status, sets }
    }
}

/// Session listing entry with its derived status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(flatten)]
    pub session: WorkoutSession,
    pub status: SessionStatus,
}

impl From<WorkoutSession> for SessionSummary {
    fn from(session: WorkoutSession) -> Self {
        let status = session.status();
        Self { session, status }
    }
}

/// A set row to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSet {
    pub exercise_id: Uuid,
    pub set_number: i32,
    pub target_reps: i32,
    pub actual_reps: Option<i32>,
    pub weight: f64,
    pub completed: bool,
    pub notes: Option<String>,
}

/// A session row plus its sets, inserted in one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSession {
    pub workout_plan_id: Option<Uuid>,
    pub plan_name: Option<String>,
    pub date: NaiveDate,
    pub state: SessionState,
    pub notes: Option<String>,
    pub sets: Vec<NewSet>,
}

/// Expand a plan's defaults into placeholder sets: `default_sets` rows per exercise,
/// numbered from 1, none completed.
pub fn expand_plan_sets(exercises: &[PlanExercise]) -> Vec<NewSet> {
    let mut ordered: Vec<&PlanExercise> = exercises.iter().collect();
    ordered.sort_by_key(|e| e.position);

    ordered
        .into_iter()
        .flat_map(|exercise| {
            (1..=exercise.default_sets).map(move |set_number| NewSet {
                exercise_id: exercise.exercise_id,
                set_number,
                target_reps: exercise.default_reps,
                actual_reps: None,
                weight: exercise.starting_weight,
                completed: false,
                notes: None,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionRuleError {
    #[error("Session is already completed")]
    AlreadyCompleted,

    #[error("Session has already been started")]
    AlreadyStarted,

    #[error("Session has no sets")]
    NoSets,

    #[error("{remaining} of {total} sets are not completed")]
    IncompleteSets { remaining: usize, total: usize },

    #[error("Progression is only available for completed sessions")]
    NotCompleted,
}

pub fn check_can_start(session: &WorkoutSession) -> Result<(), SessionRuleError> {
    match session.status() {
        SessionStatus::Completed => Err(SessionRuleError::AlreadyCompleted),
        SessionStatus::InProgress => Err(SessionRuleError::AlreadyStarted),
        SessionStatus::Scheduled => Ok(()),
    }
}

pub fn check_can_reschedule(session: &WorkoutSession) -> Result<(), SessionRuleError> {
    check_can_start(session)
}

/// Completion requires every set of the session to be marked completed.
pub fn check_can_complete(
    session: &WorkoutSession,
    sets: &[WorkoutSet],
) -> Result<(), SessionRuleError> {
    if session.completed_at.is_some() {
        return Err(SessionRuleError::AlreadyCompleted);
    }
    if sets.is_empty() {
        return Err(SessionRuleError::NoSets);
    }
    let remaining = sets.iter().filter(|s| !s.completed).count();
    if remaining > 0 {
        return Err(SessionRuleError::IncompleteSets {
            remaining,
            total: sets.len(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleInput {
    pub workout_plan_id: Uuid,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ScheduleInput {
    /// Scheduling is for today or later.
    pub fn validate_on(&self, today: NaiveDate) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.date < today {
            errors.add("date", "Scheduled date cannot be in the past");
        }
        check_optional_text(&mut errors, "notes", self.notes.as_deref(), MAX_NOTES_LEN);
        errors.finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RescheduleInput {
    pub date: NaiveDate,
}

impl RescheduleInput {
    pub fn validate_on(&self, today: NaiveDate) -> Result<(), FieldErrors> {
        if self.date < today {
            return Err(FieldErrors::single("date", "Scheduled date cannot be in the past"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggedSetInput {
    pub exercise_id: Uuid,
    pub reps: i32,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A workout that already happened: every set is recorded as completed.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogInput {
    #[serde(default)]
    pub workout_plan_id: Option<Uuid>,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
    pub sets: Vec<LoggedSetInput>,
}

impl LogInput {
    pub fn validate_on(&self, today: NaiveDate) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.date > today {
            errors.add("date", "Logged workouts cannot be in the future");
        }
        check_optional_text(&mut errors, "notes", self.notes.as_deref(), MAX_NOTES_LEN);
        if self.sets.is_empty() {
            errors.add("sets", "At least one set is required");
        }
        for (i, set) in self.sets.iter().enumerate() {
            check_range_i32(&mut errors, &format!("sets[{}].reps", i), set.reps, 0, MAX_REPS);
            check_weight(&mut errors, &format!("sets[{}].weight", i), set.weight);
            check_optional_text(
                &mut errors,
                &format!("sets[{}].notes", i),
                set.notes.as_deref(),
                MAX_NOTES_LEN,
            );
        }
        errors.finish()
    }

    /// Number sets per exercise in submission order.
    pub fn to_new_sets(&self) -> Vec<NewSet> {
        let mut counters: std::collections::HashMap<Uuid, i32> = std::collections::HashMap::new();
        self.sets
            .iter()
            .map(|set| {
                let counter = counters.entry(set.exercise_id).or_insert(0);
                *counter += 1;
                NewSet {
                    exercise_id: set.exercise_id,
                    set_number: *counter,
                    target_reps: set.reps,
                    actual_reps: Some(set.reps),
                    weight: set.weight,
                    completed: true,
                    notes: normalize_optional(set.notes.clone()),
                }
            })
            .collect()
    }
}

/// Partial update of a single set from the session tracker.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SetUpdateInput {
    #[serde(default)]
    pub actual_reps: Option<i32>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub completed: Option<bool>,
    /// An empty string clears the notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl Validate for SetUpdateInput {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.actual_reps.is_none()
            && self.weight.is_none()
            && self.completed.is_none()
            && self.notes.is_none()
        {
            errors.add("body", "Nothing to update");
        }
        if let Some(reps) = self.actual_reps {
            check_range_i32(&mut errors, "actual_reps", reps, 0, MAX_REPS);
        }
        if let Some(weight) = self.weight {
            check_weight(&mut errors, "weight", weight);
        }
        check_optional_text(&mut errors, "notes", self.notes.as_deref(), MAX_NOTES_LEN);
        errors.finish()
    }
}

impl SetUpdateInput {
    /// Apply to a stored set, returning the new row values.
    pub fn apply_to(&self, set: &WorkoutSet) -> WorkoutSet {
        let mut updated = set.clone();
        if let Some(reps) = self.actual_reps {
            updated.actual_reps = Some(reps);
        }
        if let Some(weight) = self.weight {
            updated.weight = weight;
        }
        if let Some(completed) = self.completed {
            updated.completed = completed;
        }
        if let Some(notes) = &self.notes {
            updated.notes = normalize_optional(Some(notes.clone()));
        }
        updated
    }
}

/// Calendar/history filter.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<SessionStatus>,
}

impl Validate for SessionQuery {
    fn validate(&self) -> Result<(), FieldErrors> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(FieldErrors::single("from", "Must not be after 'to'"));
            }
        }
        Ok(())
    }
}

impl SessionQuery {
    pub fn matches_date(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}
