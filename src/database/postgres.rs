use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{postgres::PgExecutor, PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::rows::{
    ExerciseRow, HistoryRow, PlanExerciseRow, PlanRow, SessionRow, SetRow,
};
use crate::database::models::{User, UserProfile};
use crate::database::store::{SetUpdate, WorkoutStore};
use crate::domain::{
    diff_plan_exercises, Exercise, ExerciseHistoryEntry, ExerciseInput, ExerciseOwner, NewSession,
    NewSet, PlanDetail, PlanExercise, PlanExerciseConfig, PlanInput, ProgressionUpdate,
    SessionDetail, SessionQuery, SessionState, SetUpdateInput, WorkoutPlan, WorkoutSession,
    WorkoutSet,
};

const EXERCISE_COLUMNS: &str = "id, user_id, name, description, created_at, updated_at";
const PLAN_COLUMNS: &str = "id, user_id, name, created_at, updated_at";
const SESSION_COLUMNS: &str = "id, user_id, workout_plan_id, plan_name, date, scheduled, \
     started_at, completed_at, notes, created_at, updated_at";
const SET_SELECT: &str = r#"
    SELECT s.id, s.workout_session_id, s.exercise_id, e.name AS exercise_name,
           s.set_number, s.target_reps, s.actual_reps, s.weight, s.completed,
           s.notes, s.progression_hint
    FROM sets s
    JOIN exercises e ON e.id = s.exercise_id
"#;

/// Postgres-backed store over a shared connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn load_plan_exercises<'e, E>(
    executor: E,
    plan_ids: &[Uuid],
) -> Result<Vec<PlanExercise>, DatabaseError>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, PlanExerciseRow>(
        r#"
        SELECT pe.id, pe.workout_plan_id, pe.exercise_id, e.name AS exercise_name,
               pe.default_sets, pe.default_reps, pe.starting_weight, pe.position
        FROM workout_plan_exercises pe
        JOIN exercises e ON e.id = pe.exercise_id
        WHERE pe.workout_plan_id = ANY($1)
        ORDER BY pe.position, pe.id
        "#,
    )
    .bind(plan_ids)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(PlanExercise::from).collect())
}

async fn load_sets<'e, E>(executor: E, session_id: Uuid) -> Result<Vec<WorkoutSet>, DatabaseError>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "{} WHERE s.workout_session_id = $1 ORDER BY s.position, s.set_number",
        SET_SELECT
    );
    let rows = sqlx::query_as::<_, SetRow>(&sql)
        .bind(session_id)
        .fetch_all(executor)
        .await?;

    Ok(rows.into_iter().map(WorkoutSet::from).collect())
}

async fn insert_plan_exercise(
    tx: &mut Transaction<'_, Postgres>,
    plan_id: Uuid,
    position: i32,
    config: &PlanExerciseConfig,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO workout_plan_exercises
            (id, workout_plan_id, exercise_id, default_sets, default_reps, starting_weight, position)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(plan_id)
    .bind(config.exercise_id)
    .bind(config.default_sets)
    .bind(config.default_reps)
    .bind(config.starting_weight)
    .bind(position)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_sets(
    tx: &mut Transaction<'_, Postgres>,
    session_id: Uuid,
    sets: &[NewSet],
) -> Result<(), DatabaseError> {
    for (position, set) in sets.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sets
                (id, workout_session_id, exercise_id, position, set_number,
                 target_reps, actual_reps, weight, completed, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind(set.exercise_id)
        .bind(position as i32)
        .bind(set.set_number)
        .bind(set.target_reps)
        .bind(set.actual_reps)
        .bind(set.weight)
        .bind(set.completed)
        .bind(&set.notes)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl WorkoutStore for PgStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }

    async fn close(&self) {
        DatabaseManager::close(&self.pool).await;
    }

    async fn upsert_user(&self, profile: &UserProfile) -> Result<User, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, name, image)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET name = COALESCE(EXCLUDED.name, users.name),
                image = COALESCE(EXCLUDED.image, users.image),
                updated_at = now()
            RETURNING id, email, name, image, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&profile.email)
        .bind(&profile.name)
        .bind(&profile.image)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, name, image, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list_exercises(
        &self,
        user_id: Uuid,
        include_shared: bool,
    ) -> Result<Vec<Exercise>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM exercises \
             WHERE user_id = $1 OR ($2 AND user_id IS NULL) \
             ORDER BY lower(name), id",
            EXERCISE_COLUMNS
        );
        let rows = sqlx::query_as::<_, ExerciseRow>(&sql)
            .bind(user_id)
            .bind(include_shared)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Exercise::from).collect())
    }

    async fn list_shared_exercises(&self) -> Result<Vec<Exercise>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM exercises WHERE user_id IS NULL ORDER BY lower(name), id",
            EXERCISE_COLUMNS
        );
        let rows = sqlx::query_as::<_, ExerciseRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Exercise::from).collect())
    }

    async fn count_shared_exercises(&self) -> Result<i64, DatabaseError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT count(*) FROM exercises WHERE user_id IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn find_exercise(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Exercise>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM exercises WHERE id = $1 AND (user_id = $2 OR user_id IS NULL)",
            EXERCISE_COLUMNS
        );
        let row = sqlx::query_as::<_, ExerciseRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Exercise::from))
    }

    async fn visible_exercise_ids(
        &self,
        user_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Uuid>, DatabaseError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM exercises WHERE id = ANY($1) AND (user_id = $2 OR user_id IS NULL)",
        )
        .bind(ids)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn insert_exercise(
        &self,
        owner: ExerciseOwner,
        input: &ExerciseInput,
    ) -> Result<Exercise, DatabaseError> {
        let sql = format!(
            "INSERT INTO exercises (id, user_id, name, description) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            EXERCISE_COLUMNS
        );
        let row = sqlx::query_as::<_, ExerciseRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(owner.to_column())
            .bind(&input.name)
            .bind(&input.description)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn update_exercise(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: &ExerciseInput,
    ) -> Result<Option<Exercise>, DatabaseError> {
        let sql = format!(
            "UPDATE exercises SET name = $3, description = $4, updated_at = now() \
             WHERE id = $1 AND user_id = $2 RETURNING {}",
            EXERCISE_COLUMNS
        );
        let row = sqlx::query_as::<_, ExerciseRow>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Exercise::from))
    }

    async fn delete_exercise(&self, user_id: Uuid, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM exercises WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn exercise_history(
        &self,
        user_id: Uuid,
        exercise_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ExerciseHistoryEntry>, DatabaseError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT ws.id AS session_id, ws.date, s.set_number, s.target_reps,
                   s.actual_reps, s.weight
            FROM sets s
            JOIN workout_sessions ws ON ws.id = s.workout_session_id
            WHERE ws.user_id = $1 AND s.exercise_id = $2 AND s.completed
            ORDER BY ws.date DESC, ws.created_at DESC, s.set_number ASC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(exercise_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ExerciseHistoryEntry::from).collect())
    }

    async fn list_plans(&self, user_id: Uuid) -> Result<Vec<PlanDetail>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM workout_plans WHERE user_id = $1 ORDER BY lower(name), id",
            PLAN_COLUMNS
        );
        let plans: Vec<WorkoutPlan> = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(WorkoutPlan::from)
            .collect();

        let ids: Vec<Uuid> = plans.iter().map(|p| p.id).collect();
        let mut exercises = load_plan_exercises(&self.pool, &ids).await?;

        Ok(plans
            .into_iter()
            .map(|plan| {
                let (mine, rest): (Vec<_>, Vec<_>) = exercises
                    .drain(..)
                    .partition(|e| e.workout_plan_id == plan.id);
                exercises = rest;
                PlanDetail { plan, exercises: mine }
            })
            .collect())
    }

    async fn find_plan(&self, user_id: Uuid, id: Uuid) -> Result<Option<PlanDetail>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM workout_plans WHERE id = $1 AND user_id = $2",
            PLAN_COLUMNS
        );
        let plan = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(plan) = plan else {
            return Ok(None);
        };
        let exercises = load_plan_exercises(&self.pool, &[id]).await?;

        Ok(Some(PlanDetail {
            plan: plan.into(),
            exercises,
        }))
    }

    async fn insert_plan(&self, user_id: Uuid, input: &PlanInput) -> Result<PlanDetail, DatabaseError> {
        let plan_id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO workout_plans (id, user_id, name) VALUES ($1, $2, $3)")
            .bind(plan_id)
            .bind(user_id)
            .bind(&input.name)
            .execute(&mut *tx)
            .await?;

        for (position, config) in input.exercises.iter().enumerate() {
            insert_plan_exercise(&mut tx, plan_id, position as i32, config).await?;
        }

        tx.commit().await?;

        self.find_plan(user_id, plan_id)
            .await?
            .ok_or_else(|| DatabaseError::QueryError(format!("plan {} vanished after insert", plan_id)))
    }

    async fn update_plan(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: &PlanInput,
    ) -> Result<Option<PlanDetail>, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let renamed = sqlx::query(
            "UPDATE workout_plans SET name = $3, updated_at = now() WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .bind(&input.name)
        .execute(&mut *tx)
        .await?;

        if renamed.rows_affected() == 0 {
            return Ok(None);
        }

        let stored = load_plan_exercises(&mut *tx, &[id]).await?;
        let diff = diff_plan_exercises(&stored, &input.exercises);
        debug!(
            "Plan {} exercise diff: {} removed, {} updated, {} created",
            id,
            diff.removed.len(),
            diff.updated.len(),
            diff.created.len()
        );

        if !diff.removed.is_empty() {
            sqlx::query(
                "DELETE FROM workout_plan_exercises WHERE id = ANY($1) AND workout_plan_id = $2",
            )
            .bind(&diff.removed)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        for row in &diff.updated {
            sqlx::query(
                r#"
                UPDATE workout_plan_exercises
                SET default_sets = $2, default_reps = $3, starting_weight = $4, position = $5
                WHERE id = $1
                "#,
            )
            .bind(row.row_id)
            .bind(row.config.default_sets)
            .bind(row.config.default_reps)
            .bind(row.config.starting_weight)
            .bind(row.position)
            .execute(&mut *tx)
            .await?;
        }

        for row in &diff.created {
            insert_plan_exercise(&mut tx, id, row.position, &row.config).await?;
        }

        tx.commit().await?;

        self.find_plan(user_id, id).await
    }

    async fn delete_plan(&self, user_id: Uuid, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM workout_plans WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_sessions(
        &self,
        user_id: Uuid,
        query: &SessionQuery,
    ) -> Result<Vec<WorkoutSession>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM workout_sessions \
             WHERE user_id = $1 \
               AND ($2::date IS NULL OR date >= $2) \
               AND ($3::date IS NULL OR date <= $3) \
             ORDER BY date DESC, created_at DESC",
            SESSION_COLUMNS
        );
        let rows = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(user_id)
            .bind(query.from)
            .bind(query.to)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(WorkoutSession::from).collect())
    }

    async fn find_session(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<SessionDetail>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM workout_sessions WHERE id = $1 AND user_id = $2",
            SESSION_COLUMNS
        );
        let session = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(session) = session else {
            return Ok(None);
        };
        let sets = load_sets(&self.pool, id).await?;

        Ok(Some(SessionDetail::new(session.into(), sets)))
    }

    async fn insert_session(
        &self,
        user_id: Uuid,
        session: &NewSession,
    ) -> Result<SessionDetail, DatabaseError> {
        let session_id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO workout_sessions
                (id, user_id, workout_plan_id, plan_name, date, scheduled,
                 started_at, completed_at, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .bind(session.workout_plan_id)
        .bind(&session.plan_name)
        .bind(session.date)
        .bind(session.state.scheduled)
        .bind(session.state.started_at)
        .bind(session.state.completed_at)
        .bind(&session.notes)
        .execute(&mut *tx)
        .await?;

        insert_sets(&mut tx, session_id, &session.sets).await?;

        tx.commit().await?;

        self.find_session(user_id, session_id).await?.ok_or_else(|| {
            DatabaseError::QueryError(format!("session {} vanished after insert", session_id))
        })
    }

    async fn update_session_state(
        &self,
        user_id: Uuid,
        id: Uuid,
        state: &SessionState,
    ) -> Result<Option<WorkoutSession>, DatabaseError> {
        let sql = format!(
            "UPDATE workout_sessions \
             SET scheduled = $3, started_at = $4, completed_at = $5, updated_at = now() \
             WHERE id = $1 AND user_id = $2 RETURNING {}",
            SESSION_COLUMNS
        );
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(state.scheduled)
            .bind(state.started_at)
            .bind(state.completed_at)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(WorkoutSession::from))
    }

    async fn reschedule_session(
        &self,
        user_id: Uuid,
        id: Uuid,
        date: NaiveDate,
        sets: &[NewSet],
    ) -> Result<Option<SessionDetail>, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let moved = sqlx::query(
            "UPDATE workout_sessions SET date = $3, updated_at = now() WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .bind(date)
        .execute(&mut *tx)
        .await?;

        if moved.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query("DELETE FROM sets WHERE workout_session_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        insert_sets(&mut tx, id, sets).await?;

        tx.commit().await?;

        self.find_session(user_id, id).await
    }

    async fn delete_session(&self, user_id: Uuid, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM workout_sessions WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn apply_progression(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        plan_id: Option<Uuid>,
        updates: &[ProgressionUpdate],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        for update in updates {
            if let Some(plan_id) = plan_id {
                sqlx::query(
                    r#"
                    UPDATE workout_plan_exercises pe
                    SET starting_weight = $1
                    FROM workout_plans p
                    WHERE pe.workout_plan_id = p.id
                      AND p.id = $2 AND p.user_id = $3 AND pe.exercise_id = $4
                    "#,
                )
                .bind(update.weight)
                .bind(plan_id)
                .bind(user_id)
                .bind(update.exercise_id)
                .execute(&mut *tx)
                .await?;
            }

            sqlx::query(
                r#"
                UPDATE sets s
                SET progression_hint = $1, updated_at = now()
                FROM workout_sessions ws
                WHERE s.workout_session_id = ws.id
                  AND ws.id = $2 AND ws.user_id = $3 AND s.exercise_id = $4
                "#,
            )
            .bind(&update.hint)
            .bind(session_id)
            .bind(user_id)
            .bind(update.exercise_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update_set(
        &self,
        user_id: Uuid,
        id: Uuid,
        update: &SetUpdateInput,
    ) -> Result<Option<SetUpdate>, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let session_completed_at = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            r#"
            SELECT ws.completed_at
            FROM sets s
            JOIN workout_sessions ws ON ws.id = s.workout_session_id
            WHERE s.id = $1 AND ws.user_id = $2
            FOR UPDATE OF s, ws
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        match session_completed_at {
            None => return Ok(None),
            Some(Some(_)) => return Ok(Some(SetUpdate::SessionCompleted)),
            Some(None) => {}
        }

        let sql = format!("{} WHERE s.id = $1", SET_SELECT);
        let current = sqlx::query_as::<_, SetRow>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        let updated = update.apply_to(&current.into());

        sqlx::query(
            r#"
            UPDATE sets
            SET actual_reps = $2, weight = $3, completed = $4, notes = $5, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(updated.actual_reps)
        .bind(updated.weight)
        .bind(updated.completed)
        .bind(&updated.notes)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(SetUpdate::Updated(updated)))
    }
}
