use tracing::info;
use uuid::Uuid;

use crate::database::{DatabaseError, WorkoutStore};
use crate::domain::{Exercise, ExerciseHistoryEntry, ExerciseInput, ExerciseOwner, Validate};
use crate::error::ApiError;
use crate::revalidate::{paths, Revalidator};
use crate::state::AppState;

pub struct ExerciseService<'a> {
    store: &'a dyn WorkoutStore,
    revalidator: &'a Revalidator,
    history_limit: i64,
}

impl<'a> ExerciseService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            store: state.store.as_ref(),
            revalidator: &state.revalidator,
            history_limit: state.config.api.history_limit,
        }
    }

    pub async fn list(&self, user_id: Uuid, include_shared: bool) -> Result<Vec<Exercise>, ApiError> {
        Ok(self.store.list_exercises(user_id, include_shared).await?)
    }

    /// Version of the shared catalog. Seeding runs in another process, so it
    /// cannot bump this server's revalidation counters.
    pub async fn shared_catalog_version(&self) -> Result<i64, ApiError> {
        Ok(self.store.count_shared_exercises().await?)
    }

    /// Own and shared exercises are readable.
    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Exercise, ApiError> {
        self.store
            .find_exercise(user_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Exercise {} not found", id)))
    }

    pub async fn create(&self, user_id: Uuid, input: ExerciseInput) -> Result<Exercise, ApiError> {
        let input = input.normalized();
        input.validate()?;

        let exercise = self
            .store
            .insert_exercise(ExerciseOwner::User(user_id), &input)
            .await?;

        info!("Created exercise {} for user {}", exercise.id, user_id);
        self.revalidator.invalidate(user_id, paths::EXERCISE_PAGES);
        Ok(exercise)
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: ExerciseInput,
    ) -> Result<Exercise, ApiError> {
        self.get_owned(user_id, id).await?;

        let input = input.normalized();
        input.validate()?;

        let exercise = self
            .store
            .update_exercise(user_id, id, &input)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Exercise {} not found", id)))?;

        self.revalidator.invalidate(user_id, paths::EXERCISE_PAGES);
        Ok(exercise)
    }

    /// Also removes the exercise from plans and sessions.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        self.get_owned(user_id, id).await?;

        if !self.store.delete_exercise(user_id, id).await? {
            return Err(ApiError::not_found(format!("Exercise {} not found", id)));
        }

        info!("Deleted exercise {} for user {}", id, user_id);
        self.revalidator.invalidate(user_id, paths::EXERCISE_PAGES);
        self.revalidator.invalidate(user_id, paths::PLAN_PAGES);
        self.revalidator.invalidate(user_id, paths::SESSION_PAGES);
        Ok(())
    }

    pub async fn history(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Vec<ExerciseHistoryEntry>, ApiError> {
        self.get(user_id, id).await?;
        Ok(self
            .store
            .exercise_history(user_id, id, self.history_limit)
            .await?)
    }

    async fn get_owned(&self, user_id: Uuid, id: Uuid) -> Result<Exercise, ApiError> {
        let exercise = self.get(user_id, id).await?;
        if !exercise.owner.is_owned_by(user_id) {
            return Err(ApiError::forbidden("Shared exercises cannot be modified"));
        }
        Ok(exercise)
    }
}

/// Insert shared template exercises whose names are not present yet.
/// Returns the number inserted.
pub async fn seed_templates(
    store: &dyn WorkoutStore,
    templates: &[ExerciseInput],
) -> Result<usize, DatabaseError> {
    let mut existing: Vec<String> = store
        .list_shared_exercises()
        .await?
        .into_iter()
        .map(|e| e.name.to_lowercase())
        .collect();

    let mut inserted = 0;
    for template in templates {
        let template = template.clone().normalized();
        if template.validate().is_err() || existing.contains(&template.name.to_lowercase()) {
            continue;
        }
        store.insert_exercise(ExerciseOwner::Shared, &template).await?;
        existing.push(template.name.to_lowercase());
        inserted += 1;
    }

    info!("Seeded {} shared exercises", inserted);
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    fn template(name: &str) -> ExerciseInput {
        ExerciseInput {
            name: name.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let store = MemoryStore::new();
        let templates = vec![template("Squat"), template(" squat "), template("Row"), template("")];

        assert_eq!(seed_templates(&store, &templates).await.unwrap(), 2);
        assert_eq!(seed_templates(&store, &templates).await.unwrap(), 0);
        assert_eq!(store.list_shared_exercises().await.unwrap().len(), 2);
    }
}
