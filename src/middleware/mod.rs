pub mod auth;
pub mod response;

pub use auth::{require_page_session, require_session, CurrentUser};
pub use response::{ApiResponse, ApiResult, Cached, CachedResult};
