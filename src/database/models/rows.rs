// Row shapes as selected from Postgres, converted into domain types at the store boundary.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{
    Exercise, ExerciseHistoryEntry, ExerciseOwner, PlanExercise, WorkoutPlan, WorkoutSession,
    WorkoutSet,
};

#[derive(Debug, Clone, FromRow)]
pub struct ExerciseRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ExerciseRow> for Exercise {
    fn from(row: ExerciseRow) -> Self {
        Self {
            id: row.id,
            owner: ExerciseOwner::from_column(row.user_id),
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    pub session_id: Uuid,
    pub date: NaiveDate,
    pub set_number: i32,
    pub target_reps: i32,
    pub actual_reps: Option<i32>,
    pub weight: f64,
}

impl From<HistoryRow> for ExerciseHistoryEntry {
    fn from(row: HistoryRow) -> Self {
        Self {
            session_id: row.session_id,
            date: row.date,
            set_number: row.set_number,
            target_reps: row.target_reps,
            actual_reps: row.actual_reps,
            weight: row.weight,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PlanRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PlanRow> for WorkoutPlan {
    fn from(row: PlanRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PlanExerciseRow {
    pub id: Uuid,
    pub workout_plan_id: Uuid,
    pub exercise_id: Uuid,
    pub exercise_name: String,
    pub default_sets: i32,
    pub default_reps: i32,
    pub starting_weight: f64,
    pub position: i32,
}

impl From<PlanExerciseRow> for PlanExercise {
    fn from(row: PlanExerciseRow) -> Self {
        Self {
            id: row.id,
            workout_plan_id: row.workout_plan_id,
            exercise_id: row.exercise_id,
            exercise_name: row.exercise_name,
            default_sets: row.default_sets,
            default_reps: row.default_reps,
            starting_weight: row.starting_weight,
            position: row.position,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub user_id: Uuid,
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

impl From<SessionRow> for WorkoutSession {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            workout_plan_id: row.workout_plan_id,
            plan_name: row.plan_name,
            date: row.date,
            scheduled: row.scheduled,
            started_at: row.started_at,
            completed_at: row.completed_at,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SetRow {
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

impl From<SetRow> for WorkoutSet {
    fn from(row: SetRow) -> Self {
        Self {
            id: row.id,
            workout_session_id: row.workout_session_id,
            exercise_id: row.exercise_id,
            exercise_name: row.exercise_name,
            set_number: row.set_number,
            target_reps: row.target_reps,
            actual_reps: row.actual_reps,
            weight: row.weight,
            completed: row.completed,
            notes: row.notes,
            progression_hint: row.progression_hint,
        }
    }
}
