pub mod exercise_service;
pub mod plan_service;
pub mod session_service;

pub use exercise_service::{seed_templates, ExerciseService};
pub use plan_service::PlanService;
pub use session_service::{AppliedProgression, SessionService};
