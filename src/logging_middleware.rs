// src/logging_middleware.rs
//! Middleware for logging JSON request and response bodies at debug level

use axum::body::to_bytes;
use axum::{
    body::Body,
    extract::Request,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use tracing::{debug, Level};

/// Keys whose values never reach the logs
const REDACTED_KEYS: &[&str] = &["password", "access_token", "refresh_token", "credential"];

/// Log request and response bodies when debug logging is enabled.
///
/// Only JSON bodies are logged, with secret fields masked. Everything else
/// (form logins, CSV/XLSX/PDF exports) passes through untouched.
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    if !tracing::enabled!(Level::DEBUG) {
        return Ok(next.run(request).await);
    }

    let request = if is_json(request.headers()) {
        let (parts, body) = request.into_parts();
        let bytes = to_bytes(body, usize::MAX)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        if let Some(logged) = redacted_json(&bytes) {
            debug!(
                method = %parts.method,
                uri = %parts.uri,
                request_body = %logged,
                "📥 Request"
            );
        }

        Request::from_parts(parts, Body::from(bytes))
    } else {
        debug!(method = %request.method(), uri = %request.uri(), "📥 Request");
        request
    };

    let response = next.run(request).await;

    if !is_json(response.headers()) {
        debug!(status = %response.status(), "📤 Response");
        return Ok(response);
    }

    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if let Some(logged) = redacted_json(&bytes) {
        debug!(status = %parts.status, response_body = %logged, "📤 Response");
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |ct| ct.starts_with("application/json"))
}

fn redacted_json(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    let mut json: Value = serde_json::from_slice(bytes).ok()?;
    redact(&mut json);
    serde_json::to_string_pretty(&json).ok()
}

/// Mask secret values in place, recursing into nested objects and arrays
pub fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                if REDACTED_KEYS.contains(&key.as_str()) {
                    if !inner.is_null() {
                        *inner = Value::String("***".to_string());
                    }
                } else {
                    redact(inner);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}
