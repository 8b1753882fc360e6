#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, NaiveDate, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use url::Url;
use uuid::Uuid;

use workout_tracker::auth::{AuthError, IdentityProvider};
use workout_tracker::config::AppConfig;
use workout_tracker::database::models::UserProfile;
use workout_tracker::database::{MemoryStore, WorkoutStore};
use workout_tracker::domain::{Exercise, ExerciseInput, ExerciseOwner};
use workout_tracker::{app, AppState};

pub const SESSION_SECRET: &str = "integration-test-secret-0123456789";

/// Identity provider stand-in: the authorization code is the local part of
/// the signed-in email, and the code `denied` fails the exchange.
pub struct FakeIdentity;

#[async_trait]
impl IdentityProvider for FakeIdentity {
    fn authorize_url(&self, state: &str) -> Result<Url, AuthError> {
        let mut url = Url::parse("https://id.example.test/authorize")
            .map_err(|e| AuthError::Provider(e.to_string()))?;
        url.query_pairs_mut().append_pair("state", state);
        Ok(url)
    }

    async fn exchange_code(&self, code: &str) -> Result<UserProfile, AuthError> {
        if code == "denied" {
            return Err(AuthError::Provider("bad_verification_code".into()));
        }
        Ok(UserProfile {
            email: format!("{}@example.com", code),
            name: Some(code.to_string()),
            image: None,
        })
    }
}

pub fn test_config() -> AppConfig {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("OAUTH_CLIENT_ID", "test-client"),
        ("OAUTH_CLIENT_SECRET", "test-client-secret"),
        ("SESSION_SECRET", SESSION_SECRET),
    ]);
    AppConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
        .expect("test configuration")
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All `Set-Cookie` values.
    pub fn cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }
}

/// The full router driven in-process, over the in-memory store unless
/// another one is supplied.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<dyn WorkoutStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(config: AppConfig, store: Arc<dyn WorkoutStore>) -> Self {
        let state = AppState::new(config, store.clone(), Arc::new(FakeIdentity));
        let router = app(state.clone());
        Self {
            router,
            state,
            store,
        }
    }

    pub async fn sign_in(&self, email: &str) -> Result<TestUser> {
        let user = self
            .store
            .upsert_user(&UserProfile {
                email: email.to_string(),
                name: None,
                image: None,
            })
            .await?;
        let token = self.state.sessions.issue(&user)?;
        Ok(TestUser {
            id: user.id,
            email: user.email,
            token,
        })
    }

    pub async fn shared_exercise(&self, name: &str) -> Result<Exercise> {
        Ok(self
            .store
            .insert_exercise(
                ExerciseOwner::Shared,
                &ExerciseInput {
                    name: name.to_string(),
                    description: None,
                },
            )
            .await?)
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Ok(TestResponse {
            status,
            headers,
            body,
        })
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        user: Option<&TestUser>,
        body: Option<Value>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", user.token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?)),
            None => builder.body(Body::empty()),
        }
        .context("invalid test request")?;
        self.send(request).await
    }

    pub async fn get(&self, path: &str, user: &TestUser) -> Result<TestResponse> {
        self.request(Method::GET, path, Some(user), None).await
    }

    pub async fn post(&self, path: &str, user: &TestUser, body: Value) -> Result<TestResponse> {
        self.request(Method::POST, path, Some(user), Some(body)).await
    }

    pub async fn put(&self, path: &str, user: &TestUser, body: Value) -> Result<TestResponse> {
        self.request(Method::PUT, path, Some(user), Some(body)).await
    }

    pub async fn patch(&self, path: &str, user: &TestUser, body: Value) -> Result<TestResponse> {
        self.request(Method::PATCH, path, Some(user), Some(body)).await
    }

    pub async fn delete(&self, path: &str, user: &TestUser) -> Result<TestResponse> {
        self.request(Method::DELETE, path, Some(user), None).await
    }

    /// POST /api/exercises, returning the new id.
    pub async fn create_exercise(&self, user: &TestUser, name: &str) -> Result<Uuid> {
        let res = self
            .post("/api/exercises", user, json!({ "name": name }))
            .await?;
        assert_eq!(res.status, StatusCode::CREATED, "create exercise: {}", res.body);
        id_of(res.data())
    }

    /// POST /api/workout/plans with `(exercise_id, sets, reps, weight)` rows.
    pub async fn create_plan(
        &self,
        user: &TestUser,
        name: &str,
        exercises: &[(Uuid, i32, i32, f64)],
    ) -> Result<Value> {
        let res = self
            .post("/api/workout/plans", user, plan_body(name, exercises))
            .await?;
        assert_eq!(res.status, StatusCode::CREATED, "create plan: {}", res.body);
        Ok(res.data().clone())
    }

    pub async fn schedule(&self, user: &TestUser, plan_id: Uuid, date: NaiveDate) -> Result<Value> {
        let res = self
            .post(
                "/api/workout/sessions/schedule",
                user,
                json!({ "workout_plan_id": plan_id, "date": date }),
            )
            .await?;
        assert_eq!(res.status, StatusCode::CREATED, "schedule: {}", res.body);
        Ok(res.data().clone())
    }
}

pub fn plan_body(name: &str, exercises: &[(Uuid, i32, i32, f64)]) -> Value {
    json!({
        "name": name,
        "exercises": exercises
            .iter()
            .map(|(id, sets, reps, weight)| json!({
                "exercise_id": id,
                "default_sets": sets,
                "default_reps": reps,
                "starting_weight": weight,
            }))
            .collect::<Vec<_>>(),
    })
}

pub fn id_of(value: &Value) -> Result<Uuid> {
    let id = value["id"].as_str().context("response has no id")?;
    Ok(Uuid::parse_str(id)?)
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn days_from_today(days: i64) -> NaiveDate {
    today() + Duration::days(days)
}
