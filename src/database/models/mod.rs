pub mod rows;
pub mod user;

pub use user::{User, UserProfile};
