//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::credentials::resolve_user;
use super::models::User;
use crate::common::{safe_email_log, ApiError, AppState};

/// Authenticated user extractor
///
/// Validates the `Authorization: Bearer <token>` header and loads the owning user
/// row. Wrap in `Option` for routes where authentication is optional.
#[derive(Debug)]
pub struct AuthedUser(pub User);

/// Extract the token from a `Bearer <token>` header value (scheme is case-insensitive)
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(state_lock): Extension<Arc<RwLock<AppState>>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let app_state = state_lock.read().await.clone();

        let header = match parts.headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok()) {
            Some(h) => h,
            None => {
                warn!("Authentication failed: missing Authorization header");
                return Err(ApiError::Unauthorized("Not authenticated".into()));
            }
        };

        let token = bearer_token(header).ok_or_else(|| {
            warn!("Authentication failed: Authorization header is not a bearer token");
            ApiError::Unauthorized("Not authenticated".to_string())
        })?;

        let user = resolve_user(&app_state.db, token, &app_state.config).await?;

        debug!(
            user_id = user.id,
            email = %safe_email_log(&user.email),
            "User authentication successful via extractor"
        );

        Ok(AuthedUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("BEARER   abc  "), Some("abc"));
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc.def.ghi"), None);
    }
}
