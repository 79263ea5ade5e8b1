//! Shared helpers for HTTP-level tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use teller::config::{AppConfig, PasswordConfig};
use teller::server::{router, AppState};
use teller::storage::{SqliteStore, StorageGateway};

pub fn test_config(dir: &Path) -> AppConfig {
    let mut cfg = AppConfig::with_secret("integration-secret-0123456789abcdef");
    cfg.db_path = dir.join("teller-test.db");
    cfg.pool_size = 4;
    // Cheap Argon2 so tests stay fast
    cfg.password = PasswordConfig { memory_kib: 64, iterations: 1, parallelism: 1 };
    cfg
}

pub fn open_store(cfg: &AppConfig) -> SqliteStore {
    SqliteStore::open(&cfg.db_path, cfg.pool_size).expect("open store")
}

pub fn app_with(cfg: &AppConfig, store: Arc<dyn StorageGateway>) -> Router {
    router(AppState::new(cfg, store).expect("app state"))
}

pub fn app(cfg: &AppConfig) -> Router {
    app_with(cfg, Arc::new(open_store(cfg)))
}

/// Send one request through the router and decode the body as JSON when possible.
pub async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        builder = builder.header("x-jwt-token", t);
    }
    let req = match body {
        Some(v) => builder.header("content-type", "application/json").body(Body::from(v.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    send_raw(app, req).await
}

pub async fn send_raw(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

pub fn customer(email: &str) -> Value {
    json!({
        "email": email,
        "password": "Passw0rd",
        "firstName": "Ada",
        "lastName": "Lovelace",
        "phoneNumber": "5551234567"
    })
}

/// Register a user and log in. Returns (account id, token).
pub async fn register_and_login(app: &Router, body: Value) -> (i64, String) {
    let email = body["email"].as_str().unwrap().to_string();
    let password = body["password"].as_str().unwrap().to_string();
    let (status, created) = send(app, "POST", "/account", None, Some(body)).await;
    assert_eq!(status, StatusCode::OK, "register failed: {created}");
    let account_id = created["account"]["id"].as_i64().unwrap_or(-1);
    let (status, login) = send(app, "POST", "/login", None, Some(json!({"email": email, "password": password}))).await;
    assert_eq!(status, StatusCode::OK, "login failed: {login}");
    (account_id, login["token"].as_str().unwrap().to_string())
}
