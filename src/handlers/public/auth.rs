// handlers/public/auth.rs - OAuth sign-in flow
//
// GET  /auth/signin    redirect to the identity provider
// GET  /auth/callback  exchange the code, issue the session cookie
// POST /auth/signout   clear the session cookie

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::auth::AuthError;
use crate::error::ApiError;
use crate::middleware::auth::{clear_cookie, cookie_value, set_cookie, OAUTH_STATE_COOKIE, SESSION_COOKIE};
use crate::middleware::ApiResponse;
use crate::state::AppState;

/// Lifetime of the nonce cookie that binds a sign-in attempt to the browser.
const OAUTH_STATE_MAX_AGE_SECS: u64 = 10 * 60;

#[derive(Debug, Deserialize)]
pub struct SigninQuery {
    pub callback_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /auth/signin?callback_url=
pub async fn signin(
    State(state): State<AppState>,
    query: Result<Query<SigninQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let callback = query.callback_url.as_deref().unwrap_or_default();

    let signed = state.oauth_state.sign(callback);
    let url = state.identity.authorize_url(&signed.state)?;

    let cookie = set_cookie(
        OAUTH_STATE_COOKIE,
        &signed.nonce,
        OAUTH_STATE_MAX_AGE_SECS,
        state.config.security.secure_cookies,
    );
    Ok((AppendHeaders([(SET_COOKIE, cookie)]), Redirect::to(url.as_str())).into_response())
}

/// GET /auth/callback?code&state
pub async fn callback(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;

    // The provider reports a denied consent screen through `error`.
    if let Some(error) = query.error {
        warn!("Identity provider returned error: {}", error);
        let encoded: String = url::form_urlencoded::byte_serialize(error.as_bytes()).collect();
        return Ok((
            AppendHeaders([(SET_COOKIE, clear_cookie(OAUTH_STATE_COOKIE))]),
            Redirect::to(&format!("/login?error={}", encoded)),
        )
            .into_response());
    }

    let signed_state = query.state.ok_or(AuthError::InvalidState)?;
    let nonce = cookie_value(&headers, OAUTH_STATE_COOKIE);
    let destination = state.oauth_state.verify(&signed_state, nonce.as_deref())?;

    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or(AuthError::MissingCode)?;
    let profile = state.identity.exchange_code(&code).await?;
    let user = state.store.upsert_user(&profile).await?;
    let token = state.sessions.issue(&user)?;

    info!("User {} signed in", user.id);

    let session_cookie = set_cookie(
        SESSION_COOKIE,
        &token,
        state.sessions.expiry_hours() * 3600,
        state.config.security.secure_cookies,
    );
    Ok((
        AppendHeaders([
            (SET_COOKIE, session_cookie),
            (SET_COOKIE, clear_cookie(OAUTH_STATE_COOKIE)),
        ]),
        Redirect::to(&destination),
    )
        .into_response())
}

/// POST /auth/signout
pub async fn signout() -> impl IntoResponse {
    (
        AppendHeaders([(SET_COOKIE, clear_cookie(SESSION_COOKIE))]),
        ApiResponse::success(json!({ "signed_out": true })),
    )
}
