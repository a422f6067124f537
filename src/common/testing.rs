// Shared helpers for in-crate tests

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use jsonwebtoken::Algorithm;
use reqwest::Client;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceExt;

use super::config::{AppConfig, GoogleEndpoints, MIN_BCRYPT_COST};
use super::migrations::run_migrations;
use super::state::AppState;

/// Single-connection in-memory database; the pool must never recycle its connection
pub async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

pub async fn migrated_pool() -> SqlitePool {
    let pool = memory_pool().await;
    run_migrations(&pool, false).await.unwrap();
    pool
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        secret_key: "test-secret-key".to_string(),
        algorithm: Algorithm::HS256,
        access_token_expire_minutes: 30,
        bcrypt_cost: MIN_BCRYPT_COST,
        google_client_id: Some("test-client-id.apps.googleusercontent.com".to_string()),
        google_client_secret: Some("test-client-secret".to_string()),
        google_redirect_uri: "http://localhost:8000/auth/google-calendar/callback".to_string(),
        google_dev_allow_insecure: false,
        google_endpoints: GoogleEndpoints::default(),
        frontend_url: "http://localhost:5173".to_string(),
        cors_origins: vec!["http://localhost:5173".to_string()],
        port: 8000,
        reset_db: false,
    }
}

/// Point every Google endpoint at a mock server
pub fn with_google_base(mut config: AppConfig, base: &str) -> AppConfig {
    config.google_endpoints = GoogleEndpoints {
        auth_url: format!("{}/o/oauth2/v2/auth", base),
        token_url: format!("{}/token", base),
        certs_url: format!("{}/oauth2/v3/certs", base),
        calendar_api_base: format!("{}/calendar/v3", base),
    };
    config
}

pub async fn test_app() -> (Router, SqlitePool) {
    test_app_with(test_config()).await
}

pub async fn test_app_with(config: AppConfig) -> (Router, SqlitePool) {
    let pool = migrated_pool().await;
    let origins = config.cors_origins.clone();
    let state = AppState::new(pool.clone(), Client::new(), config);
    let router = crate::build_router(Arc::new(RwLock::new(state)), &origins);
    (router, pool)
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn login_request(email: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!(
            "username={}&password={}",
            urlencoding::encode(email),
            urlencoding::encode(password)
        )))
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Register a password account and return a bearer token for it
pub async fn register_and_login(app: &Router, email: &str) -> String {
    let response = send(
        app,
        json_request(
            Method::POST,
            "/register",
            None,
            &serde_json::json!({ "email": email, "password": "testpassword" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(app, login_request(email, "testpassword")).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}
