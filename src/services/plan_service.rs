use tracing::info;
use uuid::Uuid;

use crate::database::WorkoutStore;
use crate::domain::{FieldErrors, PlanDetail, PlanInput, Validate};
use crate::error::ApiError;
use crate::revalidate::{paths, Revalidator};
use crate::state::AppState;

pub struct PlanService<'a> {
    store: &'a dyn WorkoutStore,
    revalidator: &'a Revalidator,
}

impl<'a> PlanService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            store: state.store.as_ref(),
            revalidator: &state.revalidator,
        }
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<PlanDetail>, ApiError> {
        Ok(self.store.list_plans(user_id).await?)
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<PlanDetail, ApiError> {
        self.store
            .find_plan(user_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Workout plan {} not found", id)))
    }

    pub async fn create(&self, user_id: Uuid, input: PlanInput) -> Result<PlanDetail, ApiError> {
        let input = input.normalized();
        input.validate()?;
        self.check_exercises(user_id, &input).await?;

        let plan = self.store.insert_plan(user_id, &input).await?;

        info!(
            "Created workout plan {} with {} exercises for user {}",
            plan.plan.id,
            plan.exercises.len(),
            user_id
        );
        self.revalidator.invalidate(user_id, paths::PLAN_PAGES);
        Ok(plan)
    }

    /// Rename and replace the exercise list. Rows are matched by exercise id:
    /// kept exercises are updated in place, the rest deleted or created.
    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: PlanInput,
    ) -> Result<PlanDetail, ApiError> {
        self.get(user_id, id).await?;

        let input = input.normalized();
        input.validate()?;
        self.check_exercises(user_id, &input).await?;

        let plan = self
            .store
            .update_plan(user_id, id, &input)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Workout plan {} not found", id)))?;

        self.revalidator.invalidate(user_id, paths::PLAN_PAGES);
        Ok(plan)
    }

    /// Sessions created from the plan survive with their plan link cleared.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        if !self.store.delete_plan(user_id, id).await? {
            return Err(ApiError::not_found(format!("Workout plan {} not found", id)));
        }

        info!("Deleted workout plan {} for user {}", id, user_id);
        self.revalidator.invalidate(user_id, paths::PLAN_PAGES);
        self.revalidator.invalidate(user_id, paths::SESSION_PAGES);
        Ok(())
    }

    /// Every referenced exercise must be the caller's own or shared.
    async fn check_exercises(&self, user_id: Uuid, input: &PlanInput) -> Result<(), ApiError> {
        let ids = input.exercise_ids();
        let visible = self.store.visible_exercise_ids(user_id, &ids).await?;

        let mut errors = FieldErrors::new();
        for (i, id) in ids.iter().enumerate() {
            if !visible.contains(id) {
                errors.add(format!("exercises[{}].exercise_id", i), "Exercise not found");
            }
        }
        Ok(errors.finish()?)
    }
}
