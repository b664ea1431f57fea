//! Shared helpers for the API integration tests.
#![allow(dead_code)]

use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use pulsewatch_api::app::build_app;
use pulsewatch_api::config::ServerConfig;
use pulsewatch_api::state::AppState;
use pulsewatch_core::alerting::EvaluatorConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        seed_default_rules: false,
        evaluator: EvaluatorConfig::default(),
        device_offline_after_hours: 24,
        device_offline_check_interval_secs: 0,
    }
}

/// Build the full application router, middleware included, over `pool`.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, test_config())
}

pub fn build_test_app_with(pool: PgPool, config: ServerConfig) -> Router {
    build_app(AppState::new(pool, config)).expect("test CORS origins are valid")
}

/// A pool that never connects successfully.
///
/// For requests that are rejected before touching the database.
pub fn unreachable_pool() -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(500))
        .connect_lazy("postgres://pulsewatch@127.0.0.1:1/pulsewatch")
        .expect("lazy pool URL is valid")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read response body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("response body is JSON")
}

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.expect("router is infallible")
}

fn json_request(method: Method, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("valid request");
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, json_request(Method::POST, uri, &body)).await
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, json_request(Method::PUT, uri, &body)).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .expect("valid request");
    send(app, request).await
}
