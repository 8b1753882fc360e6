// handlers/mod.rs - HTTP handlers grouped by access tier
//
// public/    no session required (service info, sign-in flow, login page)
// protected/ JSON API behind the session gate
// pages.rs   page models behind the redirecting session gate

pub mod pages;
pub mod protected;
pub mod public;

use axum::extract::{rejection::PathRejection, Path};
use uuid::Uuid;

use crate::error::ApiError;

/// Unwrap a `:id` path segment, turning a malformed UUID into a 400.
pub(crate) fn path_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, ApiError> {
    let Path(id) = path?;
    Ok(id)
}
