// handlers/protected/mod.rs - JSON API behind `require_session`
//
// Every handler receives the signed-in user as `Extension<CurrentUser>`
// and scopes all reads and writes to that user.

pub mod auth;
pub mod exercises;
pub mod plans;
pub mod sessions;
pub mod sets;
