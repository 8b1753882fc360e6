//! End-to-end run over `PgStore`. Needs a disposable database:
//!
//! DATABASE_URL=postgres://localhost/workouts_test cargo test --test 90_postgres -- --ignored

mod common;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::{days_from_today, id_of, test_config, today, TestApp};
use workout_tracker::database::{DatabaseManager, PgStore};

async fn pg_app() -> Result<TestApp> {
    dotenvy::dotenv().ok();
    let mut config = test_config();
    config.database.url =
        Some(std::env::var("DATABASE_URL").context("DATABASE_URL is required")?);

    let pool = DatabaseManager::connect(&config.database).await?;
    DatabaseManager::migrate(&pool).await?;
    Ok(TestApp::with_store(config, Arc::new(PgStore::new(pool))))
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn workout_lifecycle_against_postgres() -> Result<()> {
    let app = pg_app().await?;
    let user = app
        .sign_in(&format!("pg-{}@example.com", Uuid::new_v4().simple()))
        .await?;

    let squat = app.create_exercise(&user, "Squat").await?;
    let press = app.create_exercise(&user, "Press").await?;
    let plan = app
        .create_plan(&user, "Day A", &[(squat, 2, 5, 100.0), (press, 1, 8, 40.0)])
        .await?;
    let plan_id = id_of(&plan)?;
    let squat_row = plan["exercises"][0]["id"].clone();

    // Diff keeps the squat row, drops press, adds nothing new.
    let updated = app
        .put(
            &format!("/api/workout/plans/{}", plan_id),
            &user,
            common::plan_body("Day A", &[(squat, 3, 5, 100.0)]),
        )
        .await?;
    assert_eq!(updated.status, StatusCode::OK, "{}", updated.body);
    assert_eq!(updated.data()["exercises"][0]["id"], squat_row);
    assert_eq!(updated.data()["exercises"].as_array().map(Vec::len), Some(1));

    let session = app.schedule(&user, plan_id, today()).await?;
    let session_path = format!("/api/workout/sessions/{}", id_of(&session)?);
    let sets = session["sets"].as_array().cloned().unwrap_or_default();
    assert_eq!(sets.len(), 3);

    for set in &sets {
        let res = app
            .patch(
                &format!("/api/workout/sets/{}", id_of(set)?),
                &user,
                json!({ "actual_reps": 5, "completed": true }),
            )
            .await?;
        assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    }
    let done = app.post(&format!("{}/complete", session_path), &user, json!({})).await?;
    assert_eq!(done.status, StatusCode::OK, "{}", done.body);

    let frozen = app
        .patch(
            &format!("/api/workout/sets/{}", id_of(&sets[0])?),
            &user,
            json!({ "completed": false }),
        )
        .await?;
    assert_eq!(frozen.status, StatusCode::CONFLICT);

    let applied = app
        .post(&format!("{}/progression", session_path), &user, json!({}))
        .await?;
    assert_eq!(applied.status, StatusCode::OK, "{}", applied.body);
    let plan_after = app.get(&format!("/api/workout/plans/{}", plan_id), &user).await?;
    assert_eq!(plan_after.data()["exercises"][0]["starting_weight"], 102.5);

    let later = app.schedule(&user, plan_id, days_from_today(2)).await?;
    let moved = app
        .put(
            &format!("/api/workout/sessions/{}/schedule", id_of(&later)?),
            &user,
            json!({ "date": days_from_today(4) }),
        )
        .await?;
    assert_eq!(moved.status, StatusCode::OK, "{}", moved.body);
    assert_eq!(moved.data()["sets"][0]["weight"], 102.5);

    // Deleting the exercise cascades into plans and sets.
    let deleted = app.delete(&format!("/api/exercises/{}", squat), &user).await?;
    assert_eq!(deleted.status, StatusCode::OK);
    let plan_final = app.get(&format!("/api/workout/plans/{}", plan_id), &user).await?;
    assert_eq!(plan_final.data()["exercises"].as_array().map(Vec::len), Some(0));
    let session_final = app.get(&session_path, &user).await?;
    assert_eq!(session_final.data()["sets"].as_array().map(Vec::len), Some(0));
    Ok(())
}
