use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{User, UserProfile};
use crate::domain::{
    Exercise, ExerciseHistoryEntry, ExerciseInput, ExerciseOwner, NewSession, NewSet, PlanDetail,
    PlanInput, ProgressionUpdate, SessionDetail, SessionQuery, SessionState, SetUpdateInput,
    WorkoutSession, WorkoutSet,
};

/// Result of a set update, decided while the parent session is locked.
#[derive(Debug, Clone, PartialEq)]
pub enum SetUpdate {
    Updated(WorkoutSet),
    /// Sets of a completed session are frozen.
    SessionCompleted,
}

/// Data access for every table. Each method that takes a `user_id` only sees
/// rows owned by that user (plus shared exercises on read paths); a row owned
/// by somebody else behaves exactly like a missing row.
///
/// Multi-row writes (plan create/update, session insert/reschedule,
/// progression) are atomic.
#[async_trait]
pub trait WorkoutStore: Send + Sync {
    async fn health_check(&self) -> Result<(), DatabaseError>;

    /// Release the underlying resources at shutdown.
    async fn close(&self);

    // Users
    async fn upsert_user(&self, profile: &UserProfile) -> Result<User, DatabaseError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    // Exercises
    /// Ordered by name, case-insensitive.
    async fn list_exercises(
        &self,
        user_id: Uuid,
        include_shared: bool,
    ) -> Result<Vec<Exercise>, DatabaseError>;
    async fn list_shared_exercises(&self) -> Result<Vec<Exercise>, DatabaseError>;
    /// Shared rows are only ever added (by seeding), so the count versions the catalog.
    async fn count_shared_exercises(&self) -> Result<i64, DatabaseError>;
    async fn find_exercise(&self, user_id: Uuid, id: Uuid)
        -> Result<Option<Exercise>, DatabaseError>;
    /// Subset of `ids` the user may reference from plans and sets.
    async fn visible_exercise_ids(
        &self,
        user_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Uuid>, DatabaseError>;
    async fn insert_exercise(
        &self,
        owner: ExerciseOwner,
        input: &ExerciseInput,
    ) -> Result<Exercise, DatabaseError>;
    /// Only the owner's own exercises are updatable; shared ones return `None`.
    async fn update_exercise(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: &ExerciseInput,
    ) -> Result<Option<Exercise>, DatabaseError>;
    async fn delete_exercise(&self, user_id: Uuid, id: Uuid) -> Result<bool, DatabaseError>;
    /// Completed sets for one exercise, newest session first.
    async fn exercise_history(
        &self,
        user_id: Uuid,
        exercise_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ExerciseHistoryEntry>, DatabaseError>;

    // Plans
    async fn list_plans(&self, user_id: Uuid) -> Result<Vec<PlanDetail>, DatabaseError>;
    async fn find_plan(&self, user_id: Uuid, id: Uuid) -> Result<Option<PlanDetail>, DatabaseError>;
    async fn insert_plan(&self, user_id: Uuid, input: &PlanInput)
        -> Result<PlanDetail, DatabaseError>;
    /// Renames the plan and reconciles its exercise rows by exercise id.
    async fn update_plan(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: &PlanInput,
    ) -> Result<Option<PlanDetail>, DatabaseError>;
    async fn delete_plan(&self, user_id: Uuid, id: Uuid) -> Result<bool, DatabaseError>;

    // Sessions
    /// Ordered by date, newest first.
    async fn list_sessions(
        &self,
        user_id: Uuid,
        query: &SessionQuery,
    ) -> Result<Vec<WorkoutSession>, DatabaseError>;
    async fn find_session(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<SessionDetail>, DatabaseError>;
    async fn insert_session(
        &self,
        user_id: Uuid,
        session: &NewSession,
    ) -> Result<SessionDetail, DatabaseError>;
    async fn update_session_state(
        &self,
        user_id: Uuid,
        id: Uuid,
        state: &SessionState,
    ) -> Result<Option<WorkoutSession>, DatabaseError>;
    /// Move the session and replace all of its sets.
    async fn reschedule_session(
        &self,
        user_id: Uuid,
        id: Uuid,
        date: NaiveDate,
        sets: &[NewSet],
    ) -> Result<Option<SessionDetail>, DatabaseError>;
    async fn delete_session(&self, user_id: Uuid, id: Uuid) -> Result<bool, DatabaseError>;
    /// Write accepted weights into the plan (when the session still has one)
    /// and hints onto the session's sets.
    async fn apply_progression(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        plan_id: Option<Uuid>,
        updates: &[ProgressionUpdate],
    ) -> Result<(), DatabaseError>;

    // Sets
    /// `None` when the set is missing or belongs to another user's session.
    async fn update_set(
        &self,
        user_id: Uuid,
        id: Uuid,
        update: &SetUpdateInput,
    ) -> Result<Option<SetUpdate>, DatabaseError>;
}
