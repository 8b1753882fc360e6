use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{
    check_name, check_range_i32, check_weight, FieldErrors, Validate, MAX_NAME_LEN,
};

pub const MAX_DEFAULT_SETS: i32 = 20;
pub const MAX_DEFAULT_REPS: i32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored plan/exercise link with the plan's default configuration for that exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanExercise {
    pub id: Uuid,
    pub workout_plan_id: Uuid,
    pub exercise_id: Uuid,
    pub exercise_name: String,
    pub default_sets: i32,
    pub default_reps: i32,
    pub starting_weight: f64,
    pub position: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDetail {
    #[serde(flatten)]
    pub plan: WorkoutPlan,
    pub exercises: Vec<PlanExercise>,
}

fn default_sets() -> i32 {
    3
}

fn default_reps() -> i32 {
    10
}

/// Submitted configuration for one exercise of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanExerciseConfig {
    pub exercise_id: Uuid,
    #[serde(default = "default_sets")]
    pub default_sets: i32,
    #[serde(default = "default_reps")]
    pub default_reps: i32,
    #[serde(default)]
    pub starting_weight: f64,
}

/// Create/update payload for a plan. On update the exercise list replaces the stored one.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlanInput {
    pub name: String,
    #[serde(default)]
    pub exercises: Vec<PlanExerciseConfig>,
}

impl PlanInput {
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            exercises: self.exercises,
        }
    }

    pub fn exercise_ids(&self) -> Vec<Uuid> {
        self.exercises.iter().map(|e| e.exercise_id).collect()
    }
}

impl Validate for PlanInput {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_name(&mut errors, "name", &self.name, MAX_NAME_LEN);

        if self.exercises.is_empty() {
            errors.add("exercises", "A plan needs at least one exercise");
        }

        let mut seen = HashSet::new();
        for (i, config) in self.exercises.iter().enumerate() {
            if !seen.insert(config.exercise_id) {
                errors.add(
                    format!("exercises[{}].exercise_id", i),
                    "Exercise appears more than once in the plan",
                );
            }
            check_range_i32(
                &mut errors,
                &format!("exercises[{}].default_sets", i),
                config.default_sets,
                1,
                MAX_DEFAULT_SETS,
            );
            check_range_i32(
                &mut errors,
                &format!("exercises[{}].default_reps", i),
                config.default_reps,
                1,
                MAX_DEFAULT_REPS,
            );
            check_weight(
                &mut errors,
                &format!("exercises[{}].starting_weight", i),
                config.starting_weight,
            );
        }

        errors.finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanRowUpdate {
    pub row_id: Uuid,
    pub position: i32,
    pub config: PlanExerciseConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanRowCreate {
    pub position: i32,
    pub config: PlanExerciseConfig,
}

/// Changes needed to turn the stored plan/exercise rows into the submitted list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanDiff {
    /// Row ids to delete.
    pub removed: Vec<Uuid>,
    pub updated: Vec<PlanRowUpdate>,
    pub created: Vec<PlanRowCreate>,
}

/// Three-way diff keyed by exercise id. Position follows the submitted order.
pub fn diff_plan_exercises(stored: &[PlanExercise], submitted: &[PlanExerciseConfig]) -> PlanDiff {
    let stored_by_exercise: HashMap<Uuid, &PlanExercise> =
        stored.iter().map(|row| (row.exercise_id, row)).collect();
    let submitted_ids: HashSet<Uuid> = submitted.iter().map(|c| c.exercise_id).collect();

    let mut diff = PlanDiff::default();

    for row in stored {
        if !submitted_ids.contains(&row.exercise_id) {
            diff.removed.push(row.id);
        }
    }

    for (index, config) in submitted.iter().enumerate() {
        let position = index as i32;
        match stored_by_exercise.get(&config.exercise_id) {
            Some(row) => diff.updated.push(PlanRowUpdate {
                row_id: row.id,
                position,
                config: *config,
            }),
            None => diff.created.push(PlanRowCreate {
                position,
                config: *config,
            }),
        }
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_row(plan: Uuid, exercise: Uuid, position: i32) -> PlanExercise {
        PlanExercise {
            id: Uuid::new_v4(),
            workout_plan_id: plan,
            exercise_id: exercise,
            exercise_name: "lift".into(),
            default_sets: 3,
            default_reps: 10,
            starting_weight: 20.0,
            position,
        }
    }

    fn config(exercise: Uuid, sets: i32) -> PlanExerciseConfig {
        PlanExerciseConfig {
            exercise_id: exercise,
            default_sets: sets,
            default_reps: 8,
            starting_weight: 40.0,
        }
    }

    #[test]
    fn replacing_a_with_c_keeps_b() {
        let plan = Uuid::new_v4();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let row_a = stored_row(plan, a, 0);
        let row_b = stored_row(plan, b, 1);

        let diff = diff_plan_exercises(
            &[row_a.clone(), row_b.clone()],
            &[config(b, 5), config(c, 4)],
        );

        assert_eq!(diff.removed, vec![row_a.id]);
        assert_eq!(diff.updated.len(), 1);
        assert_eq!(diff.updated[0].row_id, row_b.id);
        assert_eq!(diff.updated[0].position, 0);
        assert_eq!(diff.updated[0].config.default_sets, 5);
        assert_eq!(diff.created.len(), 1);
        assert_eq!(diff.created[0].config.exercise_id, c);
        assert_eq!(diff.created[0].position, 1);
    }

    #[test]
    fn identical_lists_only_update() {
        let plan = Uuid::new_v4();
        let a = Uuid::new_v4();
        let diff = diff_plan_exercises(&[stored_row(plan, a, 0)], &[config(a, 3)]);
        assert!(diff.removed.is_empty());
        assert!(diff.created.is_empty());
        assert_eq!(diff.updated.len(), 1);
    }

    #[test]
    fn empty_stored_creates_everything() {
        let diff = diff_plan_exercises(&[], &[config(Uuid::new_v4(), 3), config(Uuid::new_v4(), 3)]);
        assert_eq!(diff.created.len(), 2);
        assert!(diff.removed.is_empty() && diff.updated.is_empty());
    }

    #[test]
    fn rejects_duplicate_exercises_and_bad_ranges() {
        let a = Uuid::new_v4();
        let input = PlanInput {
            name: "Push day".into(),
            exercises: vec![config(a, 3), config(a, 0)],
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.get("exercises[1].exercise_id").is_some());
        assert!(errors.get("exercises[1].default_sets").is_some());
    }

    #[test]
    fn requires_at_least_one_exercise() {
        let input = PlanInput { name: "Empty".into(), exercises: vec![] };
        let errors = input.validate().unwrap_err();
        assert!(errors.get("exercises").is_some());
    }

    #[test]
    fn config_defaults_apply_when_omitted() {
        let id = Uuid::new_v4();
        let config: PlanExerciseConfig =
            serde_json::from_value(serde_json::json!({ "exercise_id": id })).unwrap();
        assert_eq!(config.default_sets, 3);
        assert_eq!(config.default_reps, 10);
        assert_eq!(config.starting_weight, 0.0);
    }
}
