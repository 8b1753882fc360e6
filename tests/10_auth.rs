mod common;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::Utc;
use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

use common::{days_from_today, id_of, plan_body, today, TestApp, TestUser};
use workout_tracker::auth::Claims;

fn cookie_pair(set_cookie: &str) -> Option<(String, String)> {
    let pair = set_cookie.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    Some((name.trim().to_string(), value.trim().to_string()))
}

fn find_cookie(cookies: &[String], name: &str) -> Option<String> {
    cookies
        .iter()
        .filter_map(|c| cookie_pair(c))
        .find(|(n, _)| n == name)
        .map(|(_, v)| v)
}

/// Run /auth/signin and return (state, nonce cookie value).
async fn begin_signin(app: &TestApp, callback: &str) -> Result<(String, String)> {
    let encoded: String = url::form_urlencoded::byte_serialize(callback.as_bytes()).collect();
    let res = app
        .request(Method::GET, &format!("/auth/signin?callback_url={}", encoded), None, None)
        .await?;
    assert_eq!(res.status, StatusCode::SEE_OTHER);

    let location = Url::parse(res.header(header::LOCATION).context("no location")?)?;
    assert_eq!(location.host_str(), Some("id.example.test"));
    let state = location
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .context("no state")?;
    let nonce = find_cookie(&res.cookies(), "oauth_state").context("no oauth_state cookie")?;
    Ok((state, nonce))
}

async fn finish_signin(
    app: &TestApp,
    code: &str,
    state: &str,
    nonce: &str,
) -> Result<common::TestResponse> {
    let request = Request::builder()
        .uri(format!("/auth/callback?code={}&state={}", code, state))
        .header(header::COOKIE, format!("oauth_state={}", nonce))
        .body(Body::empty())?;
    app.send(request).await
}

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let app = TestApp::new();
    let res = app.request(Method::GET, "/health", None, None).await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.data()["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn router_serves_without_request_logging() -> Result<()> {
    let mut config = common::test_config();
    config.api.enable_request_logging = false;
    let app = TestApp::with_config(config);
    let user = app.sign_in("quiet@example.com").await?;

    let res = app.get("/api/auth/session", &user).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["user"]["email"], "quiet@example.com");
    Ok(())
}

#[tokio::test]
async fn root_describes_the_service() -> Result<()> {
    let app = TestApp::new();
    let res = app.request(Method::GET, "/", None, None).await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["name"], "Workout Tracker API");
    Ok(())
}

#[tokio::test]
async fn api_requires_a_session() -> Result<()> {
    let app = TestApp::new();
    let res = app.request(Method::GET, "/api/exercises", None, None).await?;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.body["code"], "UNAUTHORIZED");
    Ok(())
}

/// Everything the owner can list, used to show that rejected writes changed nothing.
async fn owner_snapshot(app: &TestApp, owner: &TestUser) -> Result<Vec<Value>> {
    let mut snapshot = Vec::new();
    for path in ["/api/exercises", "/api/workout/plans", "/api/workout/sessions"] {
        let res = app.get(path, owner).await?;
        assert_eq!(res.status, StatusCode::OK);
        snapshot.push(res.data().clone());
    }
    Ok(snapshot)
}

#[tokio::test]
async fn mutations_without_a_valid_session_change_nothing() -> Result<()> {
    let app = TestApp::new();
    let owner = app.sign_in("owner@example.com").await?;
    let exercise = app.create_exercise(&owner, "Deadlift").await?;
    let plan = id_of(&app.create_plan(&owner, "Pull", &[(exercise, 3, 5, 120.0)]).await?)?;
    let session = app.schedule(&owner, plan, days_from_today(1)).await?;
    let session_id = id_of(&session)?;
    let set_id = id_of(&session["sets"][0])?;
    let before = owner_snapshot(&app, &owner).await?;

    let forged = TestUser {
        id: owner.id,
        email: owner.email.clone(),
        token: "not-a-jwt".to_string(),
    };

    let exercise_path = format!("/api/exercises/{}", exercise);
    let plan_path = format!("/api/workout/plans/{}", plan);
    let session_path = format!("/api/workout/sessions/{}", session_id);
    let mutations: Vec<(Method, String, Option<Value>)> = vec![
        (Method::POST, "/api/exercises".into(), Some(json!({ "name": "Row" }))),
        (Method::PUT, exercise_path.clone(), Some(json!({ "name": "Sumo" }))),
        (Method::DELETE, exercise_path, None),
        (Method::POST, "/api/workout/plans".into(), Some(plan_body("Push", &[(exercise, 3, 5, 60.0)]))),
        (Method::PUT, plan_path.clone(), Some(plan_body("Renamed", &[(exercise, 5, 5, 60.0)]))),
        (Method::DELETE, plan_path, None),
        (
            Method::POST,
            "/api/workout/sessions/schedule".into(),
            Some(json!({ "workout_plan_id": plan, "date": days_from_today(2) })),
        ),
        (
            Method::POST,
            "/api/workout/sessions/log".into(),
            Some(json!({ "date": today(), "sets": [{ "exercise_id": exercise, "reps": 5, "weight": 100.0 }] })),
        ),
        (Method::POST, format!("{}/start", session_path), Some(json!({}))),
        (Method::POST, format!("{}/complete", session_path), Some(json!({}))),
        (Method::PUT, format!("{}/schedule", session_path), Some(json!({ "date": days_from_today(5) }))),
        (Method::POST, format!("{}/progression", session_path), Some(json!({}))),
        (Method::DELETE, session_path, None),
        (
            Method::PATCH,
            format!("/api/workout/sets/{}", set_id),
            Some(json!({ "actual_reps": 5, "completed": true })),
        ),
    ];

    for (method, path, body) in mutations {
        for user in [None, Some(&forged)] {
            let res = app.request(method.clone(), &path, user, body.clone()).await?;
            assert_eq!(
                res.status,
                StatusCode::UNAUTHORIZED,
                "{} {} (token: {})",
                method,
                path,
                user.is_some()
            );
            assert_eq!(res.body["code"], "UNAUTHORIZED");
        }
    }

    assert_eq!(owner_snapshot(&app, &owner).await?, before);
    Ok(())
}

#[tokio::test]
async fn garbage_token_is_rejected() -> Result<()> {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/api/auth/session")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())?;
    let res = app.send(request).await?;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn expired_token_is_rejected() -> Result<()> {
    let app = TestApp::new();
    let user = app.sign_in("late@example.com").await?;
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        name: None,
        iat: now - 7200,
        exp: now - 3600,
    };
    let token = app.state.sessions.sign(&claims)?;

    let request = Request::builder()
        .uri("/api/auth/session")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())?;
    let res = app.send(request).await?;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], "Session expired");
    Ok(())
}

#[tokio::test]
async fn token_for_unknown_user_is_rejected() -> Result<()> {
    let app = TestApp::new();
    let claims = Claims::new(Uuid::new_v4(), "ghost@example.com".into(), None, 1);
    let token = app.state.sessions.sign(&claims)?;

    let request = Request::builder()
        .uri("/api/auth/session")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())?;
    let res = app.send(request).await?;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn session_cookie_is_accepted() -> Result<()> {
    let app = TestApp::new();
    let user = app.sign_in("cookie@example.com").await?;

    let request = Request::builder()
        .uri("/api/auth/session")
        .header(header::COOKIE, format!("theme=dark; session={}", user.token))
        .body(Body::empty())?;
    let res = app.send(request).await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["user"]["email"], "cookie@example.com");
    assert_eq!(res.data()["user"]["id"], user.id.to_string());
    Ok(())
}

#[tokio::test]
async fn pages_redirect_to_login_without_session() -> Result<()> {
    let app = TestApp::new();
    let res = app
        .request(Method::GET, "/workouts/calendar", None, None)
        .await?;

    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(
        res.header(header::LOCATION),
        Some("/login?callback_url=%2Fworkouts%2Fcalendar")
    );
    Ok(())
}

#[tokio::test]
async fn pages_render_for_signed_in_user() -> Result<()> {
    let app = TestApp::new();
    let user = app.sign_in("pages@example.com").await?;

    for (path, page) in [
        ("/dashboard", "dashboard"),
        ("/exercises", "exercises"),
        ("/workouts", "workouts"),
        ("/workouts/plans", "plans"),
        ("/workouts/calendar", "calendar"),
        ("/workouts/history", "history"),
    ] {
        let res = app.get(path, &user).await?;
        assert_eq!(res.status, StatusCode::OK, "{}", path);
        assert_eq!(res.data()["page"], page);
        assert_eq!(res.data()["user"]["email"], "pages@example.com");
    }
    Ok(())
}

#[tokio::test]
async fn login_page_links_to_signin() -> Result<()> {
    let app = TestApp::new();
    let res = app
        .request(Method::GET, "/login?callback_url=%2Fexercises", None, None)
        .await?;

    assert_eq!(res.status, StatusCode::OK);
    let html = res.body.as_str().context("login page is not text")?;
    assert!(html.contains("/auth/signin?callback_url=%2Fexercises"));
    Ok(())
}

#[tokio::test]
async fn oauth_round_trip_signs_in_and_redirects() -> Result<()> {
    let app = TestApp::new();
    let (state, nonce) = begin_signin(&app, "/workouts/plans").await?;

    let res = finish_signin(&app, "alice", &state, &nonce).await?;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.header(header::LOCATION), Some("/workouts/plans"));

    let cookies = res.cookies();
    let token = find_cookie(&cookies, "session").context("no session cookie")?;
    assert!(cookies
        .iter()
        .any(|c| c.starts_with("oauth_state=;") && c.contains("Max-Age=0")));

    let request = Request::builder()
        .uri("/api/auth/session")
        .header(header::COOKIE, format!("session={}", token))
        .body(Body::empty())?;
    let me = app.send(request).await?;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.data()["user"]["email"], "alice@example.com");
    Ok(())
}

#[tokio::test]
async fn signing_in_twice_reuses_the_user() -> Result<()> {
    let app = TestApp::new();

    let mut ids = Vec::new();
    for _ in 0..2 {
        let (state, nonce) = begin_signin(&app, "/dashboard").await?;
        let res = finish_signin(&app, "bob", &state, &nonce).await?;
        let token = find_cookie(&res.cookies(), "session").context("no session cookie")?;
        let claims = app.state.sessions.verify(&token)?;
        ids.push(claims.sub);
    }

    assert_eq!(ids[0], ids[1]);
    Ok(())
}

#[tokio::test]
async fn callback_requires_matching_nonce() -> Result<()> {
    let app = TestApp::new();
    let (state, _nonce) = begin_signin(&app, "/dashboard").await?;

    let res = finish_signin(&app, "mallory", &state, "forged").await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(find_cookie(&res.cookies(), "session").is_none());
    Ok(())
}

#[tokio::test]
async fn external_callback_falls_back_to_dashboard() -> Result<()> {
    let app = TestApp::new();
    let (state, nonce) = begin_signin(&app, "//evil.example.com/phish").await?;

    let res = finish_signin(&app, "carol", &state, &nonce).await?;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.header(header::LOCATION), Some("/dashboard"));
    Ok(())
}

#[tokio::test]
async fn provider_failure_is_bad_gateway() -> Result<()> {
    let app = TestApp::new();
    let (state, nonce) = begin_signin(&app, "/dashboard").await?;

    let res = finish_signin(&app, "denied", &state, &nonce).await?;
    assert_eq!(res.status, StatusCode::BAD_GATEWAY);
    Ok(())
}

#[tokio::test]
async fn provider_error_returns_to_login() -> Result<()> {
    let app = TestApp::new();
    let res = app
        .request(Method::GET, "/auth/callback?error=access_denied", None, None)
        .await?;

    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.header(header::LOCATION), Some("/login?error=access_denied"));
    Ok(())
}

#[tokio::test]
async fn signout_clears_the_cookie() -> Result<()> {
    let app = TestApp::new();
    let res = app.request(Method::POST, "/auth/signout", None, None).await?;

    assert_eq!(res.status, StatusCode::OK);
    assert!(res
        .cookies()
        .iter()
        .any(|c| c.starts_with("session=;") && c.contains("Max-Age=0")));
    Ok(())
}
