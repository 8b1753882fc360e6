use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{User, UserProfile};
use crate::database::store::{SetUpdate, WorkoutStore};
use crate::domain::exercise::sort_by_name;
use crate::domain::{
    diff_plan_exercises, Exercise, ExerciseHistoryEntry, ExerciseInput, ExerciseOwner, NewSession,
    NewSet, PlanDetail, PlanExercise, PlanInput, ProgressionUpdate, SessionDetail, SessionQuery,
    SessionState, SetUpdateInput, WorkoutPlan, WorkoutSession, WorkoutSet,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    exercises: HashMap<Uuid, Exercise>,
    plans: HashMap<Uuid, WorkoutPlan>,
    plan_exercises: Vec<PlanExercise>,
    sessions: HashMap<Uuid, WorkoutSession>,
    /// Sets with their insertion position inside the session.
    sets: Vec<(i32, WorkoutSet)>,
}

impl Tables {
    fn exercise_name(&self, id: Uuid) -> String {
        self.exercises
            .get(&id)
            .map(|e| e.name.clone())
            .unwrap_or_default()
    }

    fn plan_detail(&self, plan: &WorkoutPlan) -> PlanDetail {
        let mut exercises: Vec<PlanExercise> = self
            .plan_exercises
            .iter()
            .filter(|row| row.workout_plan_id == plan.id)
            .map(|row| PlanExercise {
                exercise_name: self.exercise_name(row.exercise_id),
                ..row.clone()
            })
            .collect();
        exercises.sort_by_key(|row| (row.position, row.id));

        PlanDetail {
            plan: plan.clone(),
            exercises,
        }
    }

    fn session_sets(&self, session_id: Uuid) -> Vec<WorkoutSet> {
        let mut sets: Vec<&(i32, WorkoutSet)> = self
            .sets
            .iter()
            .filter(|(_, set)| set.workout_session_id == session_id)
            .collect();
        sets.sort_by_key(|(position, set)| (*position, set.set_number));

        sets.into_iter()
            .map(|(_, set)| WorkoutSet {
                exercise_name: self.exercise_name(set.exercise_id),
                ..set.clone()
            })
            .collect()
    }

    fn session_detail(&self, session: &WorkoutSession) -> SessionDetail {
        SessionDetail::new(session.clone(), self.session_sets(session.id))
    }

    fn owned_session(&self, user_id: Uuid, id: Uuid) -> Option<&WorkoutSession> {
        self.sessions.get(&id).filter(|s| s.user_id == user_id)
    }

    fn insert_sets(&mut self, session_id: Uuid, sets: &[NewSet]) {
        for (position, set) in sets.iter().enumerate() {
            self.sets.push((
                position as i32,
                WorkoutSet {
                    id: Uuid::new_v4(),
                    workout_session_id: session_id,
                    exercise_id: set.exercise_id,
                    exercise_name: String::new(),
                    set_number: set.set_number,
                    target_reps: set.target_reps,
                    actual_reps: set.actual_reps,
                    weight: set.weight,
                    completed: set.completed,
                    notes: set.notes.clone(),
                    progression_hint: None,
                },
            ));
        }
    }
}

/// Process-local store with the same ownership and cascade rules as the
/// Postgres schema. Used by `serve --in-memory` and the test suite.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkoutStore for MemoryStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn close(&self) {}

    async fn upsert_user(&self, profile: &UserProfile) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        if let Some(user) = tables.users.values_mut().find(|u| u.email == profile.email) {
            if profile.name.is_some() {
                user.name = profile.name.clone();
            }
            if profile.image.is_some() {
                user.image = profile.image.clone();
            }
            user.updated_at = now;
            return Ok(user.clone());
        }

        let user = User {
            id: Uuid::new_v4(),
            email: profile.email.clone(),
            name: profile.name.clone(),
            image: profile.image.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn list_exercises(
        &self,
        user_id: Uuid,
        include_shared: bool,
    ) -> Result<Vec<Exercise>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut exercises: Vec<Exercise> = tables
            .exercises
            .values()
            .filter(|e| match e.owner {
                ExerciseOwner::User(id) => id == user_id,
                ExerciseOwner::Shared => include_shared,
            })
            .cloned()
            .collect();
        sort_by_name(&mut exercises);
        Ok(exercises)
    }

    async fn list_shared_exercises(&self) -> Result<Vec<Exercise>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut exercises: Vec<Exercise> = tables
            .exercises
            .values()
            .filter(|e| e.owner == ExerciseOwner::Shared)
            .cloned()
            .collect();
        sort_by_name(&mut exercises);
        Ok(exercises)
    }

    async fn count_shared_exercises(&self) -> Result<i64, DatabaseError> {
        let tables = self.tables.read().await;
        let count = tables
            .exercises
            .values()
            .filter(|e| e.owner == ExerciseOwner::Shared)
            .count();
        Ok(count as i64)
    }

    async fn find_exercise(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Exercise>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .exercises
            .get(&id)
            .filter(|e| e.owner.is_visible_to(user_id))
            .cloned())
    }

    async fn visible_exercise_ids(
        &self,
        user_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Uuid>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| {
                tables
                    .exercises
                    .get(id)
                    .map_or(false, |e| e.owner.is_visible_to(user_id))
            })
            .collect())
    }

    async fn insert_exercise(
        &self,
        owner: ExerciseOwner,
        input: &ExerciseInput,
    ) -> Result<Exercise, DatabaseError> {
        let now = Utc::now();
        let exercise = Exercise {
            id: Uuid::new_v4(),
            owner,
            name: input.name.clone(),
            description: input.description.clone(),
            created_at: now,
            updated_at: now,
        };
        self.tables
            .write()
            .await
            .exercises
            .insert(exercise.id, exercise.clone());
        Ok(exercise)
    }

    async fn update_exercise(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: &ExerciseInput,
    ) -> Result<Option<Exercise>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(exercise) = tables
            .exercises
            .get_mut(&id)
            .filter(|e| e.owner.is_owned_by(user_id))
        else {
            return Ok(None);
        };

        exercise.name = input.name.clone();
        exercise.description = input.description.clone();
        exercise.updated_at = Utc::now();
        Ok(Some(exercise.clone()))
    }

    async fn delete_exercise(&self, user_id: Uuid, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .exercises
            .get(&id)
            .map_or(false, |e| e.owner.is_owned_by(user_id));
        if !owned {
            return Ok(false);
        }

        tables.exercises.remove(&id);
        tables.plan_exercises.retain(|row| row.exercise_id != id);
        tables.sets.retain(|(_, set)| set.exercise_id != id);
        Ok(true)
    }

    async fn exercise_history(
        &self,
        user_id: Uuid,
        exercise_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ExerciseHistoryEntry>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut entries: Vec<(&WorkoutSession, &WorkoutSet)> = tables
            .sets
            .iter()
            .filter(|(_, set)| set.exercise_id == exercise_id && set.completed)
            .filter_map(|(_, set)| {
                tables
                    .owned_session(user_id, set.workout_session_id)
                    .map(|session| (session, set))
            })
            .collect();

        entries.sort_by(|(sa, a), (sb, b)| {
            sb.date
                .cmp(&sa.date)
                .then_with(|| sb.created_at.cmp(&sa.created_at))
                .then_with(|| a.set_number.cmp(&b.set_number))
        });

        Ok(entries
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|(session, set)| ExerciseHistoryEntry {
                session_id: session.id,
                date: session.date,
                set_number: set.set_number,
                target_reps: set.target_reps,
                actual_reps: set.actual_reps,
                weight: set.weight,
            })
            .collect())
    }

    async fn list_plans(&self, user_id: Uuid) -> Result<Vec<PlanDetail>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut plans: Vec<&WorkoutPlan> = tables
            .plans
            .values()
            .filter(|p| p.user_id == user_id)
            .collect();
        plans.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(plans.into_iter().map(|p| tables.plan_detail(p)).collect())
    }

    async fn find_plan(&self, user_id: Uuid, id: Uuid) -> Result<Option<PlanDetail>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .plans
            .get(&id)
            .filter(|p| p.user_id == user_id)
            .map(|p| tables.plan_detail(p)))
    }

    async fn insert_plan(&self, user_id: Uuid, input: &PlanInput) -> Result<PlanDetail, DatabaseError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let plan = WorkoutPlan {
            id: Uuid::new_v4(),
            user_id,
            name: input.name.clone(),
            created_at: now,
            updated_at: now,
        };

        for (position, config) in input.exercises.iter().enumerate() {
            tables.plan_exercises.push(PlanExercise {
                id: Uuid::new_v4(),
                workout_plan_id: plan.id,
                exercise_id: config.exercise_id,
                exercise_name: String::new(),
                default_sets: config.default_sets,
                default_reps: config.default_reps,
                starting_weight: config.starting_weight,
                position: position as i32,
            });
        }
        tables.plans.insert(plan.id, plan.clone());

        Ok(tables.plan_detail(&plan))
    }

    async fn update_plan(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: &PlanInput,
    ) -> Result<Option<PlanDetail>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(plan) = tables.plans.get_mut(&id).filter(|p| p.user_id == user_id) else {
            return Ok(None);
        };
        plan.name = input.name.clone();
        plan.updated_at = Utc::now();
        let plan = plan.clone();

        let stored: Vec<PlanExercise> = tables
            .plan_exercises
            .iter()
            .filter(|row| row.workout_plan_id == id)
            .cloned()
            .collect();
        let diff = diff_plan_exercises(&stored, &input.exercises);

        tables
            .plan_exercises
            .retain(|row| !diff.removed.contains(&row.id));

        for update in &diff.updated {
            if let Some(row) = tables
                .plan_exercises
                .iter_mut()
                .find(|row| row.id == update.row_id)
            {
                row.default_sets = update.config.default_sets;
                row.default_reps = update.config.default_reps;
                row.starting_weight = update.config.starting_weight;
                row.position = update.position;
            }
        }

        for create in &diff.created {
            tables.plan_exercises.push(PlanExercise {
                id: Uuid::new_v4(),
                workout_plan_id: id,
                exercise_id: create.config.exercise_id,
                exercise_name: String::new(),
                default_sets: create.config.default_sets,
                default_reps: create.config.default_reps,
                starting_weight: create.config.starting_weight,
                position: create.position,
            });
        }

        Ok(Some(tables.plan_detail(&plan)))
    }

    async fn delete_plan(&self, user_id: Uuid, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.plans.get(&id).map_or(false, |p| p.user_id == user_id) {
            return Ok(false);
        }

        tables.plans.remove(&id);
        tables.plan_exercises.retain(|row| row.workout_plan_id != id);
        for session in tables.sessions.values_mut() {
            if session.workout_plan_id == Some(id) {
                session.workout_plan_id = None;
            }
        }
        Ok(true)
    }

    async fn list_sessions(
        &self,
        user_id: Uuid,
        query: &SessionQuery,
    ) -> Result<Vec<WorkoutSession>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut sessions: Vec<WorkoutSession> = tables
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && query.matches_date(s.date))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(sessions)
    }

    async fn find_session(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<SessionDetail>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .owned_session(user_id, id)
            .map(|s| tables.session_detail(s)))
    }

    async fn insert_session(
        &self,
        user_id: Uuid,
        session: &NewSession,
    ) -> Result<SessionDetail, DatabaseError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let stored = WorkoutSession {
            id: Uuid::new_v4(),
            user_id,
            workout_plan_id: session.workout_plan_id,
            plan_name: session.plan_name.clone(),
            date: session.date,
            scheduled: session.state.scheduled,
            started_at: session.state.started_at,
            completed_at: session.state.completed_at,
            notes: session.notes.clone(),
            created_at: now,
            updated_at: now,
        };

        tables.insert_sets(stored.id, &session.sets);
        tables.sessions.insert(stored.id, stored.clone());

        Ok(tables.session_detail(&stored))
    }

    async fn update_session_state(
        &self,
        user_id: Uuid,
        id: Uuid,
        state: &SessionState,
    ) -> Result<Option<WorkoutSession>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(session) = tables
            .sessions
            .get_mut(&id)
            .filter(|s| s.user_id == user_id)
        else {
            return Ok(None);
        };

        session.scheduled = state.scheduled;
        session.started_at = state.started_at;
        session.completed_at = state.completed_at;
        session.updated_at = Utc::now();
        Ok(Some(session.clone()))
    }

    async fn reschedule_session(
        &self,
        user_id: Uuid,
        id: Uuid,
        date: NaiveDate,
        sets: &[NewSet],
    ) -> Result<Option<SessionDetail>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(session) = tables
            .sessions
            .get_mut(&id)
            .filter(|s| s.user_id == user_id)
        else {
            return Ok(None);
        };

        session.date = date;
        session.updated_at = Utc::now();
        let session = session.clone();

        tables.sets.retain(|(_, set)| set.workout_session_id != id);
        tables.insert_sets(id, sets);

        Ok(Some(tables.session_detail(&session)))
    }

    async fn delete_session(&self, user_id: Uuid, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.owned_session(user_id, id).is_none() {
            return Ok(false);
        }

        tables.sessions.remove(&id);
        tables.sets.retain(|(_, set)| set.workout_session_id != id);
        Ok(true)
    }

    async fn apply_progression(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        plan_id: Option<Uuid>,
        updates: &[ProgressionUpdate],
    ) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        let owned_plan = plan_id.filter(|id| {
            tables
                .plans
                .get(id)
                .map_or(false, |p| p.user_id == user_id)
        });
        let session_owned = tables.owned_session(user_id, session_id).is_some();

        for update in updates {
            if let Some(plan_id) = owned_plan {
                for row in tables.plan_exercises.iter_mut().filter(|row| {
                    row.workout_plan_id == plan_id && row.exercise_id == update.exercise_id
                }) {
                    row.starting_weight = update.weight;
                }
            }
            if session_owned {
                for (_, set) in tables.sets.iter_mut().filter(|(_, set)| {
                    set.workout_session_id == session_id && set.exercise_id == update.exercise_id
                }) {
                    set.progression_hint = Some(update.hint.clone());
                }
            }
        }
        Ok(())
    }

    async fn update_set(
        &self,
        user_id: Uuid,
        id: Uuid,
        update: &SetUpdateInput,
    ) -> Result<Option<SetUpdate>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(session_id) = tables
            .sets
            .iter()
            .find(|(_, set)| set.id == id)
            .map(|(_, set)| set.workout_session_id)
        else {
            return Ok(None);
        };
        let Some(session) = tables.owned_session(user_id, session_id) else {
            return Ok(None);
        };
        if session.completed_at.is_some() {
            return Ok(Some(SetUpdate::SessionCompleted));
        }

        let name = tables
            .sets
            .iter()
            .find(|(_, set)| set.id == id)
            .map(|(_, set)| tables.exercise_name(set.exercise_id))
            .unwrap_or_default();

        let Some((_, set)) = tables.sets.iter_mut().find(|(_, set)| set.id == id) else {
            return Ok(None);
        };
        *set = update.apply_to(set);

        Ok(Some(SetUpdate::Updated(WorkoutSet {
            exercise_name: name,
            ..set.clone()
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{expand_plan_sets, PlanExerciseConfig};

    async fn user(store: &MemoryStore, email: &str) -> Uuid {
        store
            .upsert_user(&UserProfile {
                email: email.to_string(),
                name: None,
                image: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn exercise(store: &MemoryStore, owner: Uuid, name: &str) -> Uuid {
        store
            .insert_exercise(
                ExerciseOwner::User(owner),
                &ExerciseInput {
                    name: name.to_string(),
                    description: None,
                },
            )
            .await
            .unwrap()
            .id
    }

    fn plan_input(name: &str, exercises: &[Uuid]) -> PlanInput {
        PlanInput {
            name: name.to_string(),
            exercises: exercises
                .iter()
                .map(|id| PlanExerciseConfig {
                    exercise_id: *id,
                    default_sets: 2,
                    default_reps: 5,
                    starting_weight: 40.0,
                })
                .collect(),
        }
    }

    fn scheduled(plan: &PlanDetail) -> NewSession {
        NewSession {
            workout_plan_id: Some(plan.plan.id),
            plan_name: Some(plan.plan.name.clone()),
            date: Utc::now().date_naive(),
            state: SessionState {
                scheduled: true,
                started_at: None,
                completed_at: None,
            },
            notes: None,
            sets: expand_plan_sets(&plan.exercises),
        }
    }

    #[tokio::test]
    async fn upsert_matches_by_email() {
        let store = MemoryStore::new();
        let first = user(&store, "a@example.com").await;
        let again = store
            .upsert_user(&UserProfile {
                email: "a@example.com".into(),
                name: Some("Ada".into()),
                image: None,
            })
            .await
            .unwrap();
        assert_eq!(again.id, first);
        assert_eq!(again.name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn deleting_plan_detaches_sessions() {
        let store = MemoryStore::new();
        let owner = user(&store, "a@example.com").await;
        let squat = exercise(&store, owner, "Squat").await;
        let plan = store.insert_plan(owner, &plan_input("Legs", &[squat])).await.unwrap();
        let session = store.insert_session(owner, &scheduled(&plan)).await.unwrap();

        assert!(store.delete_plan(owner, plan.plan.id).await.unwrap());

        let session = store
            .find_session(owner, session.session.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.session.workout_plan_id, None);
        assert_eq!(session.session.plan_name.as_deref(), Some("Legs"));
        assert_eq!(session.sets.len(), 2);
    }

    #[tokio::test]
    async fn deleting_exercise_cascades_to_plans_and_sets() {
        let store = MemoryStore::new();
        let owner = user(&store, "a@example.com").await;
        let squat = exercise(&store, owner, "Squat").await;
        let bench = exercise(&store, owner, "Bench").await;
        let plan = store
            .insert_plan(owner, &plan_input("Full", &[squat, bench]))
            .await
            .unwrap();
        let session = store.insert_session(owner, &scheduled(&plan)).await.unwrap();

        assert!(store.delete_exercise(owner, squat).await.unwrap());

        let plan = store.find_plan(owner, plan.plan.id).await.unwrap().unwrap();
        assert_eq!(plan.exercises.len(), 1);
        assert_eq!(plan.exercises[0].exercise_name, "Bench");
        let session = store
            .find_session(owner, session.session.id)
            .await
            .unwrap()
            .unwrap();
        assert!(session.sets.iter().all(|s| s.exercise_id == bench));
    }

    #[tokio::test]
    async fn other_users_rows_are_invisible() {
        let store = MemoryStore::new();
        let owner = user(&store, "a@example.com").await;
        let intruder = user(&store, "b@example.com").await;
        let squat = exercise(&store, owner, "Squat").await;
        let plan = store.insert_plan(owner, &plan_input("Legs", &[squat])).await.unwrap();

        assert!(store.find_plan(intruder, plan.plan.id).await.unwrap().is_none());
        assert!(!store.delete_exercise(intruder, squat).await.unwrap());
        assert!(store
            .visible_exercise_ids(intruder, &[squat])
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn update_plan_keeps_surviving_rows() {
        let store = MemoryStore::new();
        let owner = user(&store, "a@example.com").await;
        let a = exercise(&store, owner, "A").await;
        let b = exercise(&store, owner, "B").await;
        let c = exercise(&store, owner, "C").await;
        let plan = store.insert_plan(owner, &plan_input("P", &[a, b])).await.unwrap();
        let row_b = plan.exercises[1].id;

        let updated = store
            .update_plan(owner, plan.plan.id, &plan_input("P2", &[b, c]))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.plan.name, "P2");
        let ids: Vec<Uuid> = updated.exercises.iter().map(|e| e.exercise_id).collect();
        assert_eq!(ids, vec![b, c]);
        assert_eq!(updated.exercises[0].id, row_b);
    }
}
