use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{
    check_name, check_optional_text, normalize_optional, FieldErrors, Validate, MAX_NAME_LEN,
    MAX_NOTES_LEN,
};

/// Who owns an exercise. Shared exercises are templates visible to every user
/// and cannot be changed through the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum ExerciseOwner {
    User(Uuid),
    Shared,
}

impl ExerciseOwner {
    /// Map the nullable `exercises.user_id` column.
    pub fn from_column(user_id: Option<Uuid>) -> Self {
        match user_id {
            Some(id) => ExerciseOwner::User(id),
            None => ExerciseOwner::Shared,
        }
    }

    pub fn to_column(self) -> Option<Uuid> {
        match self {
            ExerciseOwner::User(id) => Some(id),
            ExerciseOwner::Shared => None,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        matches!(self, ExerciseOwner::User(id) if *id == user_id)
    }

    pub fn is_visible_to(&self, user_id: Uuid) -> bool {
        match self {
            ExerciseOwner::User(id) => *id == user_id,
            ExerciseOwner::Shared => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: Uuid,
    pub owner: ExerciseOwner,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload for an exercise.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExerciseInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl ExerciseInput {
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            description: normalize_optional(self.description),
        }
    }
}

impl Validate for ExerciseInput {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_name(&mut errors, "name", &self.name, MAX_NAME_LEN);
        check_optional_text(&mut errors, "description", self.description.as_deref(), MAX_NOTES_LEN);
        errors.finish()
    }
}

/// One performed set of an exercise, as shown in the exercise history view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseHistoryEntry {
    pub session_id: Uuid,
    pub date: NaiveDate,
    pub set_number: i32,
    pub target_reps: i32,
    pub actual_reps: Option<i32>,
    pub weight: f64,
}

/// Sort exercises the way every listing presents them.
pub fn sort_by_name(exercises: &mut [Exercise]) {
    exercises.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_exercises_are_visible_but_not_owned() {
        let user = Uuid::new_v4();
        let owner = ExerciseOwner::Shared;
        assert!(owner.is_visible_to(user));
        assert!(!owner.is_owned_by(user));
        assert_eq!(owner.to_column(), None);
    }

    #[test]
    fn user_exercises_are_private() {
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let owner = ExerciseOwner::from_column(Some(user));
        assert!(owner.is_owned_by(user));
        assert!(!owner.is_visible_to(other));
    }

    #[test]
    fn owner_serializes_as_tagged_value() {
        let json = serde_json::to_value(ExerciseOwner::Shared).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "shared" }));
    }

    #[test]
    fn validates_name() {
        let input = ExerciseInput { name: "  ".into(), description: None };
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.get("name"), Some("This field is required"));

        let input = ExerciseInput { name: "Squat".into(), description: Some("Back squat".into()) };
        assert!(input.validate().is_ok());
    }
}
