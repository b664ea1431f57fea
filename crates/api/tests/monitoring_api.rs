//! End-to-end tests for the read-side monitoring endpoints and the device
//! offline check.
//!
//! Run with `DATABASE_URL` set and `cargo test -- --ignored`.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{body_json, build_test_app, get, post_json};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn create_patient(pool: &PgPool, email: &str, gender: &str) -> i64 {
    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/patients",
        json!({
            "first_name": "Grace",
            "last_name": "Hopper",
            "date_of_birth": "1946-12-09",
            "gender": gender,
            "email": email,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn create_device(pool: &PgPool, patient_id: i64, identifier: &str, device_type: &str) -> i64 {
    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/devices",
        json!({
            "device_identifier": identifier,
            "patient_id": patient_id,
            "device_type": device_type,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn record(pool: &PgPool, body: serde_json::Value) {
    let response = post_json(build_test_app(pool.clone()), "/api/v1/measurements", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

async fn data(pool: &PgPool, uri: &str) -> serde_json::Value {
    let response = get(build_test_app(pool.clone()), uri).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"].clone()
}

// ---------------------------------------------------------------------------
// Measurement statistics
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn measurement_stats_summarise_one_parameter(pool: PgPool) {
    let patient_id = create_patient(&pool, "stats@example.com", "female").await;
    create_device(&pool, patient_id, "WATCH-100", "smartwatch").await;
    let now = Utc::now();

    for (minutes_ago, heart_rate) in [(30, 70), (20, 80), (10, 90)] {
        record(
            &pool,
            json!({
                "patient_id": patient_id,
                "device_id": "WATCH-100",
                "heart_rate": heart_rate,
                "measurement_time": now - Duration::minutes(minutes_ago),
            }),
        )
        .await;
    }
    // Outside a one-day window.
    record(
        &pool,
        json!({
            "patient_id": patient_id,
            "device_id": "WATCH-100",
            "heart_rate": 40,
            "measurement_time": now - Duration::days(3),
        }),
    )
    .await;

    let stats = data(
        &pool,
        &format!("/api/v1/patients/{patient_id}/measurements/stats?days=1&parameter=heart_rate"),
    )
    .await;

    assert_eq!(stats["patient_id"], patient_id);
    assert_eq!(stats["days"], 1);
    let parameters = stats["parameters"].as_array().unwrap();
    assert_eq!(parameters.len(), 1);
    let heart_rate = &parameters[0];
    assert_eq!(heart_rate["parameter"], "heart_rate");
    assert_eq!(heart_rate["count"], 3);
    assert_eq!(heart_rate["min"], 70.0);
    assert_eq!(heart_rate["max"], 90.0);
    assert_eq!(heart_rate["average"], 80.0);
    assert_eq!(heart_rate["latest"], 90.0);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn measurement_stats_cover_every_parameter_by_default(pool: PgPool) {
    let patient_id = create_patient(&pool, "all@example.com", "male").await;
    create_device(&pool, patient_id, "WATCH-101", "smartwatch").await;
    record(
        &pool,
        json!({ "patient_id": patient_id, "device_id": "WATCH-101", "blood_oxygen": 97 }),
    )
    .await;

    let stats = data(&pool, &format!("/api/v1/patients/{patient_id}/measurements/stats")).await;
    assert_eq!(stats["days"], 7);

    let parameters = stats["parameters"].as_array().unwrap();
    let oxygen = parameters
        .iter()
        .find(|p| p["parameter"] == "blood_oxygen")
        .unwrap();
    assert_eq!(oxygen["count"], 1);
    assert_eq!(oxygen["latest"], 97.0);

    let glucose = parameters
        .iter()
        .find(|p| p["parameter"] == "blood_glucose")
        .unwrap();
    assert_eq!(glucose["count"], 0);
    assert!(glucose["average"].is_null());
    assert!(glucose["latest"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn measurement_stats_for_unknown_patient_is_not_found(pool: PgPool) {
    let response = get(build_test_app(pool), "/api/v1/patients/999/measurements/stats").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Recent and per-device readings
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn recent_measurements_respect_the_window(pool: PgPool) {
    let patient_id = create_patient(&pool, "recent@example.com", "other").await;
    create_device(&pool, patient_id, "WATCH-102", "smartwatch").await;
    let now = Utc::now();

    for hours_ago in [2, 30] {
        record(
            &pool,
            json!({
                "patient_id": patient_id,
                "device_id": "WATCH-102",
                "heart_rate": 75,
                "measurement_time": now - Duration::hours(hours_ago),
            }),
        )
        .await;
    }

    let day = data(&pool, &format!("/api/v1/measurements/recent/patient/{patient_id}")).await;
    assert_eq!(day.as_array().unwrap().len(), 1);

    let two_days = data(
        &pool,
        &format!("/api/v1/measurements/recent/patient/{patient_id}?hours=48"),
    )
    .await;
    assert_eq!(two_days.as_array().unwrap().len(), 2);

    let limited = data(
        &pool,
        &format!("/api/v1/measurements/recent/patient/{patient_id}?hours=48&limit=1"),
    )
    .await;
    let limited = limited.as_array().unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0]["id"], two_days[0]["id"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn device_measurements_list_only_that_device(pool: PgPool) {
    let patient_id = create_patient(&pool, "twodev@example.com", "female").await;
    let watch = create_device(&pool, patient_id, "WATCH-103", "smartwatch").await;
    create_device(&pool, patient_id, "CUFF-103", "blood_pressure_monitor").await;

    record(
        &pool,
        json!({ "patient_id": patient_id, "device_id": "WATCH-103", "heart_rate": 64 }),
    )
    .await;
    record(
        &pool,
        json!({ "patient_id": patient_id, "device_id": "CUFF-103", "systolic_bp": 120, "diastolic_bp": 80 }),
    )
    .await;

    let rows = data(&pool, &format!("/api/v1/devices/{watch}/measurements")).await;
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["device_id"], watch);
    assert_eq!(rows[0]["heart_rate"], 64.0);

    let response = get(build_test_app(pool), "/api/v1/devices/999/measurements").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Registry statistics
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn patient_and_device_stats_count_the_registry(pool: PgPool) {
    let first = create_patient(&pool, "one@example.com", "female").await;
    let second = create_patient(&pool, "two@example.com", "female").await;
    create_patient(&pool, "three@example.com", "male").await;
    create_device(&pool, first, "WATCH-104", "smartwatch").await;
    let retired = create_device(&pool, second, "WATCH-105", "smartwatch").await;
    create_device(&pool, second, "METER-105", "glucose_meter").await;

    let response = common::delete(
        build_test_app(pool.clone()),
        &format!("/api/v1/devices/{retired}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let patients = data(&pool, "/api/v1/patients/stats").await;
    assert_eq!(patients["total"], 3);
    assert_eq!(patients["active"], 3);
    let female = patients["by_gender"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["label"] == "female")
        .unwrap();
    assert_eq!(female["count"], 2);

    let devices = data(&pool, "/api/v1/devices/stats").await;
    assert_eq!(devices["total"], 3);
    assert_eq!(devices["active"], 2);
    let watches = devices["by_type"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["label"] == "smartwatch")
        .unwrap();
    assert_eq!(watches["count"], 2);
    let retired_count = devices["by_status"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["label"] == "retired")
        .unwrap();
    assert_eq!(retired_count["count"], 1);
}

// ---------------------------------------------------------------------------
// Offline check
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn offline_check_alerts_once_per_silent_device(pool: PgPool) {
    let patient_id = create_patient(&pool, "offline@example.com", "male").await;
    let silent = create_device(&pool, patient_id, "WATCH-106", "smartwatch").await;
    let synced = create_device(&pool, patient_id, "WATCH-107", "smartwatch").await;
    // Registered a moment ago and never synced: still within the window.
    create_device(&pool, patient_id, "WATCH-108", "smartwatch").await;

    sqlx::query("UPDATE devices SET last_sync_time = NOW() - INTERVAL '30 hours' WHERE id = $1")
        .bind(silent)
        .execute(&pool)
        .await
        .unwrap();
    let response = post_json(
        build_test_app(pool.clone()),
        &format!("/api/v1/devices/{synced}/sync"),
        json!({ "battery_level": 60 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/devices/offline-check",
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let raised = body_json(response).await["data"].clone();
    let raised = raised.as_array().unwrap();
    assert_eq!(raised.len(), 1);
    assert_eq!(raised[0]["alert_type"], "device_offline");
    assert_eq!(raised[0]["severity"], "medium");
    assert_eq!(raised[0]["patient_id"], patient_id);
    assert_eq!(raised[0]["alert_data"]["device_id"], silent);
    assert_eq!(raised[0]["alert_data"]["hours_offline"], 30);

    // The open alert suppresses a second one.
    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/devices/offline-check",
        json!({}),
    )
    .await;
    let again = body_json(response).await["data"].clone();
    assert!(again.as_array().unwrap().is_empty());

    let count = data(
        &pool,
        &format!("/api/v1/alerts/active/count?patient_id={patient_id}"),
    )
    .await;
    assert_eq!(count["count"], 1);
}
