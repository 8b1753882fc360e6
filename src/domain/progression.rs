use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::session::WorkoutSet;
use super::validation::MAX_WEIGHT;

pub const WEIGHT_INCREMENT: f64 = 2.5;
pub const DELOAD_FACTOR: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionKind {
    Increase,
    Maintain,
    Decrease,
}

/// Suggested next working weight for one exercise of a completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionSuggestion {
    pub exercise_id: Uuid,
    pub exercise_name: String,
    pub kind: ProgressionKind,
    pub current_weight: f64,
    pub suggested_weight: f64,
    pub sets_hit: usize,
    pub sets_total: usize,
    pub hint: String,
}

/// Accepted suggestions, sent back by the client.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApplyProgressionInput {
    #[serde(default)]
    pub exercise_ids: Vec<Uuid>,
}

/// Weight and hint written for one accepted exercise.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressionUpdate {
    pub exercise_id: Uuid,
    pub weight: f64,
    pub hint: String,
}

impl From<&ProgressionSuggestion> for ProgressionUpdate {
    fn from(s: &ProgressionSuggestion) -> Self {
        Self {
            exercise_id: s.exercise_id,
            weight: s.suggested_weight,
            hint: s.hint.clone(),
        }
    }
}

fn round_to_half(weight: f64) -> f64 {
    (weight * 2.0).round() / 2.0
}

/// One suggestion per exercise, in the order the exercises first appear.
///
/// All sets at target: add the increment. Fewer than half at target: deload.
/// Anything in between keeps the weight. Increases stop at the plan's weight cap.
pub fn suggest(sets: &[WorkoutSet]) -> Vec<ProgressionSuggestion> {
    let mut order: Vec<Uuid> = Vec::new();
    for set in sets {
        if !order.contains(&set.exercise_id) {
            order.push(set.exercise_id);
        }
    }

    order
        .into_iter()
        .map(|exercise_id| {
            let group: Vec<&WorkoutSet> =
                sets.iter().filter(|s| s.exercise_id == exercise_id).collect();
            let sets_total = group.len();
            let sets_hit = group.iter().filter(|s| s.hit_target()).count();
            let current_weight = group.iter().map(|s| s.weight).fold(0.0, f64::max);
            let exercise_name = group
                .first()
                .map(|s| s.exercise_name.clone())
                .unwrap_or_default();

            let (kind, suggested_weight) = if sets_hit == sets_total && current_weight < MAX_WEIGHT {
                (
                    ProgressionKind::Increase,
                    (current_weight + WEIGHT_INCREMENT).min(MAX_WEIGHT),
                )
            } else if sets_hit == sets_total {
                (ProgressionKind::Maintain, current_weight)
            } else if sets_hit * 2 < sets_total {
                (ProgressionKind::Decrease, round_to_half(current_weight * DELOAD_FACTOR))
            } else {
                (ProgressionKind::Maintain, current_weight)
            };

            let hint = match kind {
                ProgressionKind::Increase => format!(
                    "All {} sets hit target; increase to {}",
                    sets_total, suggested_weight
                ),
                ProgressionKind::Maintain => format!(
                    "{}/{} sets hit target; stay at {}",
                    sets_hit, sets_total, suggested_weight
                ),
                ProgressionKind::Decrease => format!(
                    "Only {}/{} sets hit target; deload to {}",
                    sets_hit, sets_total, suggested_weight
                ),
            };

            ProgressionSuggestion {
                exercise_id,
                exercise_name,
                kind,
                current_weight,
                suggested_weight,
                sets_hit,
                sets_total,
                hint,
            }
        })
        .collect()
}
