//! Password hashing and local JWT issuance/verification

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::{error, warn};

use sqlx::SqlitePool;

use super::models::{Claims, User};
use super::services::UserService;
use crate::common::{safe_email_log, ApiError, AppConfig};

pub fn hash_password(password: &str, cost: u32) -> Result<String, ApiError> {
    bcrypt::hash(password, cost).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        ApiError::InternalServer("Failed to hash password".to_string())
    })
}

/// Never fails: an empty or malformed stored hash (OAuth-only accounts) simply doesn't match.
pub fn verify_password(password: &str, hashed_password: &str) -> bool {
    if hashed_password.is_empty() {
        return false;
    }
    match bcrypt::verify(password, hashed_password) {
        Ok(matches) => matches,
        Err(e) => {
            warn!(error = %e, "Stored password hash could not be verified");
            false
        }
    }
}

/// Issue a signed token for `subject`, valid for `ttl`
pub fn issue_token(subject: &str, ttl: Duration, config: &AppConfig) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: subject.to_string(),
        exp: (now + ttl).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::new(config.algorithm),
        &claims,
        &EncodingKey::from_secret(config.secret_key.as_bytes()),
    )
    .map_err(|e| {
        error!(error = %e, "JWT encoding error");
        ApiError::InternalServer("jwt error".to_string())
    })
}

/// Issue a session token using the configured lifetime
pub fn issue_access_token(subject: &str, config: &AppConfig) -> Result<String, ApiError> {
    issue_token(
        subject,
        Duration::minutes(config.access_token_expire_minutes),
        config,
    )
}

/// Decode and validate a locally issued token. Expired tokens are rejected without leeway.
pub fn decode_token(token: &str, config: &AppConfig) -> Result<Claims, ApiError> {
    let mut validation = Validation::new(config.algorithm);
    validation.leeway = 0;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret_key.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        warn!(error = %e, "JWT token validation failed");
        ApiError::Unauthorized("Could not validate credentials".to_string())
    })?;

    if data.claims.sub.trim().is_empty() {
        warn!("JWT token has an empty subject");
        return Err(ApiError::Unauthorized(
            "Could not validate credentials".to_string(),
        ));
    }

    Ok(data.claims)
}

/// Resolve the user a bearer token belongs to
pub async fn resolve_user(
    db: &SqlitePool,
    token: &str,
    config: &AppConfig,
) -> Result<User, ApiError> {
    let claims = decode_token(token, config)?;

    match UserService::new(db.clone()).find_by_email(&claims.sub).await? {
        Some(user) => Ok(user),
        None => {
            warn!(
                email = %safe_email_log(&claims.sub),
                "Authentication failed: user not found in database"
            );
            Err(ApiError::Unauthorized(
                "Could not validate credentials".to_string(),
            ))
        }
    }
}
