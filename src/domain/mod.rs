pub mod exercise;
pub mod plan;
pub mod progression;
pub mod session;
pub mod validation;

pub use exercise::{Exercise, ExerciseHistoryEntry, ExerciseInput, ExerciseOwner};
pub use plan::{
    diff_plan_exercises, PlanDetail, PlanDiff, PlanExercise, PlanExerciseConfig, PlanInput,
    WorkoutPlan,
};
pub use progression::{
    ApplyProgressionInput, ProgressionKind, ProgressionSuggestion, ProgressionUpdate,
};
pub use session::{
    expand_plan_sets, LogInput, NewSession, NewSet, RescheduleInput, ScheduleInput,
    SessionDetail, SessionQuery, SessionRuleError, SessionState, SessionStatus, SessionSummary,
    SetUpdateInput, WorkoutSession, WorkoutSet,
};
pub use validation::{FieldErrors, Validate};
