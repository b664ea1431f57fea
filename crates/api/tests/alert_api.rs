//! End-to-end tests for measurement ingest and the alert lifecycle.
//!
//! Run with `DATABASE_URL` set and `cargo test -- --ignored`.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{body_json, build_test_app, delete, get, post_json};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn create_patient(pool: &PgPool, email: &str) -> i64 {
    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/patients",
        json!({
            "first_name": "Ada",
            "last_name": "Byron",
            "date_of_birth": "1950-12-10",
            "gender": "female",
            "email": email,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn create_device(pool: &PgPool, patient_id: i64, identifier: &str) -> i64 {
    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/devices",
        json!({
            "device_identifier": identifier,
            "patient_id": patient_id,
            "device_type": "smartwatch",
            "battery_level": 90,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn record(pool: &PgPool, body: serde_json::Value) -> serde_json::Value {
    let response = post_json(build_test_app(pool.clone()), "/api/v1/measurements", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

async fn act(pool: &PgPool, alert_id: i64, action: &str) -> (StatusCode, serde_json::Value) {
    let response = post_json(
        build_test_app(pool.clone()),
        &format!("/api/v1/alerts/{alert_id}/{action}"),
        json!({ "actor_id": 7, "notes": format!("{action} by nurse") }),
    )
    .await;
    let status = response.status();
    (status, body_json(response).await)
}

// ---------------------------------------------------------------------------
// Ingest with the default rules
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn high_heart_rate_raises_alert_from_default_rules(pool: PgPool) {
    let patient_id = create_patient(&pool, "ada@example.com").await;
    create_device(&pool, patient_id, "WATCH-001").await;

    let outcome = record(
        &pool,
        json!({ "patient_id": patient_id, "device_id": "WATCH-001", "heart_rate": 150 }),
    )
    .await;

    let alert_ids = outcome["alert_ids"].as_array().unwrap();
    assert_eq!(alert_ids.len(), 1);

    let alert_id = alert_ids[0].as_i64().unwrap();
    let json = body_json(get(build_test_app(pool), &format!("/api/v1/alerts/{alert_id}")).await).await;
    assert_eq!(json["data"]["alert_type"], "heart_rate_high");
    assert_eq!(json["data"]["status"], "active");
    assert_eq!(
        json["data"]["triggered_by_measurement_id"],
        outcome["measurement"]["id"]
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn normal_reading_raises_nothing(pool: PgPool) {
    let patient_id = create_patient(&pool, "calm@example.com").await;
    let device_id = create_device(&pool, patient_id, "WATCH-002").await;

    let outcome = record(
        &pool,
        json!({
            "patient_id": patient_id,
            "device_id": device_id,
            "heart_rate": 72,
            "blood_oxygen": 98,
            "temperature": 36.8,
        }),
    )
    .await;

    assert!(outcome["alert_ids"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn deactivated_rules_silence_the_defaults(pool: PgPool) {
    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/alert-rules",
        json!({
            "name": "Hypoxia (paused)",
            "alert_type": "blood_oxygen_low",
            "severity": "critical",
            "condition": { "parameter": "blood_oxygen", "operator": "less_than", "threshold": 92 },
            "is_active": false,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let patient_id = create_patient(&pool, "paused@example.com").await;
    create_device(&pool, patient_id, "WATCH-010").await;
    let outcome = record(
        &pool,
        json!({ "patient_id": patient_id, "device_id": "WATCH-010", "blood_oxygen": 85 }),
    )
    .await;

    assert!(outcome["alert_ids"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn unreadable_rule_row_does_not_bring_back_the_defaults(pool: PgPool) {
    sqlx::query(
        "INSERT INTO alert_rules (name, alert_type, severity, condition)
         VALUES ('Legacy tachycardia', 'heart_rate_wobbly', 'high',
                 '{\"parameter\": \"heart_rate\", \"operator\": \"greater_than\", \"threshold\": 100}')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let patient_id = create_patient(&pool, "legacy@example.com").await;
    create_device(&pool, patient_id, "WATCH-011").await;
    let outcome = record(
        &pool,
        json!({ "patient_id": patient_id, "device_id": "WATCH-011", "heart_rate": 150 }),
    )
    .await;

    assert!(outcome["alert_ids"].as_array().unwrap().is_empty());
    assert_eq!(outcome["rejected_rules"][0]["rule_name"], "Legacy tachycardia");
    assert!(outcome["rejected_rules"][0]["reason"]
        .as_str()
        .unwrap()
        .contains("heart_rate_wobbly"));
}

// ---------------------------------------------------------------------------
// Ingest atomicity
// ---------------------------------------------------------------------------

async fn measurement_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM measurements")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn failed_alert_insert_rolls_back_the_measurement(pool: PgPool) {
    let patient_id = create_patient(&pool, "rollback@example.com").await;
    create_device(&pool, patient_id, "WATCH-012").await;
    // The default hypoxia rule is critical; make its alert impossible to store.
    sqlx::query("ALTER TABLE alerts ADD CONSTRAINT ck_alerts_not_critical CHECK (severity <> 'critical')")
        .execute(&pool)
        .await
        .unwrap();

    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/measurements",
        json!({ "patient_id": patient_id, "device_id": "WATCH-012", "blood_oxygen": 85 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(measurement_count(&pool).await, 0);

    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/measurements/batch",
        json!({ "measurements": [
            { "patient_id": patient_id, "device_id": "WATCH-012", "heart_rate": 72 },
            { "patient_id": patient_id, "device_id": "WATCH-012", "blood_oxygen": 85 },
        ]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(measurement_count(&pool).await, 0);

    let json = body_json(get(build_test_app(pool), "/api/v1/alerts/active/count").await).await;
    assert_eq!(json["data"]["count"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn batch_commits_measurements_with_their_alerts(pool: PgPool) {
    let patient_id = create_patient(&pool, "batch@example.com").await;
    create_device(&pool, patient_id, "WATCH-013").await;

    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/measurements/batch",
        json!({ "measurements": [
            { "patient_id": patient_id, "device_id": "WATCH-013", "heart_rate": 72 },
            { "patient_id": patient_id, "device_id": "WATCH-013", "heart_rate": 150 },
        ]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert!(json["data"][0]["alert_ids"].as_array().unwrap().is_empty());
    assert_eq!(json["data"][1]["alert_ids"].as_array().unwrap().len(), 1);
    assert_eq!(measurement_count(&pool).await, 2);
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn acknowledge_then_resolve_then_dismiss(pool: PgPool) {
    let patient_id = create_patient(&pool, "cycle@example.com").await;
    create_device(&pool, patient_id, "WATCH-003").await;
    let outcome = record(
        &pool,
        json!({ "patient_id": patient_id, "device_id": "WATCH-003", "fall_detected": true }),
    )
    .await;
    let alert_id = outcome["alert_ids"][0].as_i64().unwrap();

    let (status, json) = act(&pool, alert_id, "acknowledge").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "acknowledged");
    assert_eq!(json["data"]["acknowledged_by"], 7);

    let (status, json) = act(&pool, alert_id, "acknowledge").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "INVALID_TRANSITION");

    let (status, json) = act(&pool, alert_id, "resolve").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "resolved");
    assert_eq!(json["data"]["resolution_notes"], "resolve by nurse");

    let (status, json) = act(&pool, alert_id, "dismiss").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "ALREADY_TERMINAL");
}

async fn fall_alert(pool: &PgPool, email: &str, identifier: &str) -> i64 {
    let patient_id = create_patient(pool, email).await;
    create_device(pool, patient_id, identifier).await;
    let outcome = record(
        pool,
        json!({ "patient_id": patient_id, "device_id": identifier, "fall_detected": true }),
    )
    .await;
    outcome["alert_ids"][0].as_i64().unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn racing_resolve_and_dismiss_have_one_winner(pool: PgPool) {
    let alert_id = fall_alert(&pool, "race1@example.com", "WATCH-020").await;

    let (resolve, dismiss) = tokio::join!(
        act(&pool, alert_id, "resolve"),
        act(&pool, alert_id, "dismiss"),
    );

    let outcomes = [&resolve, &dismiss];
    let winners = outcomes.iter().filter(|(s, _)| *s == StatusCode::OK).count();
    assert_eq!(winners, 1);
    let (status, loser) = outcomes
        .iter()
        .find(|(s, _)| *s != StatusCode::OK)
        .unwrap();
    assert_eq!(*status, StatusCode::CONFLICT);
    assert_eq!(loser["code"], "ALREADY_TERMINAL");
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn racing_acknowledgements_have_one_winner(pool: PgPool) {
    let alert_id = fall_alert(&pool, "race2@example.com", "WATCH-021").await;

    let (first, second) = tokio::join!(
        act(&pool, alert_id, "acknowledge"),
        act(&pool, alert_id, "acknowledge"),
    );

    let mut statuses = [first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);
    let loser = if first.0 == StatusCode::CONFLICT { &first.1 } else { &second.1 };
    assert_eq!(loser["code"], "INVALID_TRANSITION");
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn racing_acknowledge_and_resolve_apply_in_some_order(pool: PgPool) {
    let alert_id = fall_alert(&pool, "race3@example.com", "WATCH-022").await;

    let ((ack_status, ack), (resolve_status, resolved)) = tokio::join!(
        act(&pool, alert_id, "acknowledge"),
        act(&pool, alert_id, "resolve"),
    );

    // Resolve is valid from both active and acknowledged, so it always lands.
    assert_eq!(resolve_status, StatusCode::OK);
    assert_eq!(resolved["data"]["status"], "resolved");
    if ack_status == StatusCode::OK {
        assert_eq!(ack["data"]["status"], "acknowledged");
    } else {
        assert_eq!(ack_status, StatusCode::CONFLICT);
        assert_eq!(ack["code"], "INVALID_TRANSITION");
    }

    let json = body_json(get(build_test_app(pool), &format!("/api/v1/alerts/{alert_id}")).await).await;
    assert_eq!(json["data"]["status"], "resolved");
    assert_eq!(json["data"]["acknowledged_by"].is_null(), ack_status != StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn corrupt_stored_status_is_a_server_error(pool: PgPool) {
    let alert_id = fall_alert(&pool, "corrupt@example.com", "WATCH-023").await;
    sqlx::query("ALTER TABLE alerts DROP CONSTRAINT ck_alerts_status")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("UPDATE alerts SET status = 'snoozed' WHERE id = $1")
        .bind(alert_id)
        .execute(&pool)
        .await
        .unwrap();

    let (status, json) = act(&pool, alert_id, "acknowledge").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn open_count_and_listing_exclude_closed_alerts(pool: PgPool) {
    let patient_id = create_patient(&pool, "count@example.com").await;
    create_device(&pool, patient_id, "WATCH-004").await;
    let first = record(
        &pool,
        json!({ "patient_id": patient_id, "device_id": "WATCH-004", "heart_rate": 30 }),
    )
    .await;
    record(
        &pool,
        json!({ "patient_id": patient_id, "device_id": "WATCH-004", "blood_oxygen": 85 }),
    )
    .await;

    let first_id = first["alert_ids"][0].as_i64().unwrap();
    let (status, _) = act(&pool, first_id, "dismiss").await;
    assert_eq!(status, StatusCode::OK);

    let json = body_json(
        get(
            build_test_app(pool.clone()),
            &format!("/api/v1/alerts/active/count?patient_id={patient_id}"),
        )
        .await,
    )
    .await;
    assert_eq!(json["data"]["count"], 1);

    let json = body_json(
        get(
            build_test_app(pool.clone()),
            &format!("/api/v1/patients/{patient_id}/alerts"),
        )
        .await,
    )
    .await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let json = body_json(
        get(
            build_test_app(pool),
            &format!("/api/v1/patients/{patient_id}/alerts?include_resolved=true"),
        )
        .await,
    )
    .await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn stats_group_recent_alerts(pool: PgPool) {
    let patient_id = create_patient(&pool, "stats@example.com").await;
    create_device(&pool, patient_id, "WATCH-005").await;
    record(
        &pool,
        json!({ "patient_id": patient_id, "device_id": "WATCH-005", "blood_glucose": 50 }),
    )
    .await;

    let json = body_json(get(build_test_app(pool), "/api/v1/alerts/stats?days=1").await).await;
    assert_eq!(json["data"]["total"], 1);
    assert_eq!(json["data"]["active"], 1);
    assert_eq!(json["data"]["by_type"][0]["label"], "glucose_low");
}

// ---------------------------------------------------------------------------
// Custom rules
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn sustained_rule_needs_matching_history(pool: PgPool) {
    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/alert-rules",
        json!({
            "name": "Sustained tachycardia",
            "alert_type": "heart_rate_high",
            "severity": "high",
            "condition": {
                "parameter": "heart_rate",
                "operator": "greater_than",
                "threshold": 100,
                "duration_minutes": 10,
            },
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let patient_id = create_patient(&pool, "sustained@example.com").await;
    create_device(&pool, patient_id, "WATCH-006").await;
    let now = Utc::now();

    let earlier = record(
        &pool,
        json!({
            "patient_id": patient_id,
            "device_id": "WATCH-006",
            "heart_rate": 110,
            "measurement_time": now - Duration::minutes(5),
        }),
    )
    .await;
    assert!(earlier["alert_ids"].as_array().unwrap().is_empty());

    let later = record(
        &pool,
        json!({
            "patient_id": patient_id,
            "device_id": "WATCH-006",
            "heart_rate": 115,
            "measurement_time": now,
        }),
    )
    .await;
    assert_eq!(later["alert_ids"].as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn deleted_rule_leaves_alert_in_place(pool: PgPool) {
    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/alert-rules",
        json!({
            "name": "Fever",
            "alert_type": "temperature_high",
            "severity": "medium",
            "condition": { "parameter": "temperature", "operator": "greater_than", "threshold": 37.5 },
        }),
    )
    .await;
    let rule_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let patient_id = create_patient(&pool, "fever@example.com").await;
    create_device(&pool, patient_id, "WATCH-007").await;
    let outcome = record(
        &pool,
        json!({ "patient_id": patient_id, "device_id": "WATCH-007", "temperature": 38.2 }),
    )
    .await;
    let alert_id = outcome["alert_ids"][0].as_i64().unwrap();

    let response = delete(
        build_test_app(pool.clone()),
        &format!("/api/v1/alert-rules/{rule_id}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let json = body_json(get(build_test_app(pool), &format!("/api/v1/alerts/{alert_id}")).await).await;
    assert!(json["data"]["rule_id"].is_null());
    assert_eq!(json["data"]["alert_data"]["rule_name"], "Fever");
}

// ---------------------------------------------------------------------------
// Device checks
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn retired_device_cannot_record(pool: PgPool) {
    let patient_id = create_patient(&pool, "retired@example.com").await;
    let device_id = create_device(&pool, patient_id, "WATCH-008").await;

    let response = delete(
        build_test_app(pool.clone()),
        &format!("/api/v1/devices/{device_id}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = post_json(
        build_test_app(pool),
        "/api/v1/measurements",
        json!({ "patient_id": patient_id, "device_id": device_id, "heart_rate": 80 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn device_of_another_patient_is_rejected(pool: PgPool) {
    let owner = create_patient(&pool, "owner@example.com").await;
    let other = create_patient(&pool, "other@example.com").await;
    create_device(&pool, owner, "WATCH-009").await;

    let response = post_json(
        build_test_app(pool),
        "/api/v1/measurements",
        json!({ "patient_id": other, "device_id": "WATCH-009", "heart_rate": 80 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn duplicate_email_conflicts(pool: PgPool) {
    create_patient(&pool, "twice@example.com").await;

    let response = post_json(
        build_test_app(pool),
        "/api/v1/patients",
        json!({
            "first_name": "Ada",
            "last_name": "Again",
            "date_of_birth": "1950-12-10",
            "gender": "female",
            "email": "twice@example.com",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
