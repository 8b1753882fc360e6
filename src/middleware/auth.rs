use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, COOKIE},
        HeaderMap,
    },
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthError;
use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "session";
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// Signed-in user resolved from the session token
#[derive(Clone, Debug, Serialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// API gate: a missing or invalid session is a 401 JSON envelope.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = resolve_user(&state, request.headers()).await?;
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Page gate: without a session the browser is sent to the login page,
/// which returns it here after sign-in.
pub async fn require_page_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let resolved = resolve_user(&state, request.headers()).await;
    match resolved {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(ApiError::Unauthorized(_)) => {
            let target = request
                .uri()
                .path_and_query()
                .map(|p| p.as_str())
                .unwrap_or("/dashboard");
            Redirect::to(&login_redirect(target)).into_response()
        }
        Err(other) => other.into_response(),
    }
}

async fn resolve_user(state: &AppState, headers: &HeaderMap) -> Result<CurrentUser, ApiError> {
    let token = session_token(headers).ok_or(AuthError::MissingToken)?;
    let claims = state.sessions.verify(&token)?;

    // Tokens outlive account deletion; the user row is the source of truth.
    let user = state
        .store
        .find_user(claims.sub)
        .await?
        .ok_or(AuthError::UnknownUser)?;

    Ok(CurrentUser {
        id: user.id,
        email: user.email,
        name: user.name,
        image: user.image,
    })
}

/// Bearer token first, then the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    bearer.or_else(|| cookie_value(headers, SESSION_COOKIE))
}

pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

pub fn set_cookie(name: &str, value: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name, value, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_cookie(name: &str) -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", name)
}

pub fn login_redirect(callback: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(callback.as_bytes()).collect();
    format!("/login?callback_url={}", encoded)
}
