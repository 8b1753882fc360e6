// handlers/public/mod.rs - endpoints reachable without a session

pub mod auth;
pub mod login;
pub mod system;

pub use auth::{callback, signin, signout};
pub use login::login_page;
pub use system::{health, root};
