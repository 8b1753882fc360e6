// handlers/public/login.rs - GET /login

use axum::{
    extract::{rejection::QueryRejection, Query},
    response::Html,
};
use serde::Deserialize;

use crate::auth::oauth::safe_callback;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub callback_url: Option<String>,
    pub error: Option<String>,
}

/// Minimal page with a single sign-in link that carries the callback along.
pub async fn login_page(
    query: Result<Query<LoginQuery>, QueryRejection>,
) -> Result<Html<String>, ApiError> {
    let Query(query) = query?;
    let callback = safe_callback(query.callback_url.as_deref());
    Ok(Html(render_login(&callback, query.error.is_some())))
}

fn render_login(callback: &str, failed: bool) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(callback.as_bytes()).collect();
    let notice = if failed {
        "<p class=\"error\">Sign-in was cancelled or failed. Please try again.</p>"
    } else {
        ""
    };

    format!(
        "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>Sign in - Workout Tracker</title></head>\n\
         <body>\n<h1>Workout Tracker</h1>\n{}\n<a href=\"/auth/signin?callback_url={}\">Sign in</a>\n</body>\n</html>\n",
        notice, encoded
    )
}
