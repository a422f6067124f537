use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::credentials::hash_password;
use super::models::{AuthProvider, User, UserCreate};
use crate::common::{safe_email_log, ApiError, Validator};

const USER_COLUMNS: &str = "id, email, hashed_password, auth_provider, google_access_token, \
     google_refresh_token, google_token_expiry, created_at";

/// Emails are the identity key and are stored trimmed and lowercased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct UserService {
    db: SqlitePool,
}

impl UserService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::DatabaseError)
    }

    pub async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, ApiError> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .map_err(ApiError::DatabaseError)
    }

    /// Register a password account; 400 when the email is taken
    pub async fn create_local(&self, request: UserCreate, bcrypt_cost: u32) -> Result<User, ApiError> {
        request.validate(&request).into_result()?;

        let email = normalize_email(&request.email);
        if self.find_by_email(&email).await?.is_some() {
            warn!(email = %safe_email_log(&email), "Registration rejected: email already registered");
            return Err(ApiError::BadRequest("Email already registered".to_string()));
        }

        let hashed = hash_password(&request.password, bcrypt_cost)?;
        self.insert(&email, &hashed, AuthProvider::Local).await
    }

    /// Look up a Google sign-in user, creating an OAuth-only account on first sign-in
    pub async fn find_or_create_google(&self, email: &str) -> Result<User, ApiError> {
        if let Some(user) = self.find_by_email(email).await? {
            return Ok(user);
        }

        self.insert(&normalize_email(email), "", AuthProvider::Google)
            .await
    }

    async fn insert(
        &self,
        email: &str,
        hashed_password: &str,
        provider: AuthProvider,
    ) -> Result<User, ApiError> {
        let result = sqlx::query(
            "INSERT INTO users (email, hashed_password, auth_provider) VALUES (?, ?, ?)",
        )
        .bind(email)
        .bind(hashed_password)
        .bind(provider.as_str())
        .execute(&self.db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ApiError::BadRequest("Email already registered".to_string())
            }
            _ => ApiError::DatabaseError(e),
        })?;

        info!(
            user_id = result.last_insert_rowid(),
            email = %safe_email_log(email),
            provider = provider.as_str(),
            "Created user"
        );

        self.find_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| ApiError::InternalServer("Failed to load created user".to_string()))
    }

    /// Persist Google tokens for a user.
    ///
    /// The refresh token is replaced only when a non-empty one is supplied, and the
    /// expiry is only moved when `expires_in` is positive.
    pub async fn save_google_tokens(
        &self,
        user_id: i64,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_in: Option<i64>,
    ) -> Result<User, ApiError> {
        let refresh_token = refresh_token.filter(|t| !t.trim().is_empty());
        let expiry = expires_in
            .filter(|secs| *secs > 0)
            .map(|secs| Utc::now() + Duration::seconds(secs));

        sqlx::query(
            r#"
            UPDATE users
            SET google_access_token = ?,
                google_refresh_token = COALESCE(?, google_refresh_token),
                google_token_expiry = COALESCE(?, google_token_expiry)
            WHERE id = ?
            "#,
        )
        .bind(access_token)
        .bind(refresh_token)
        .bind(expiry)
        .bind(user_id)
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        self.find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }
}
