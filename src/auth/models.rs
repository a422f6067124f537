//! Authentication data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// JWT claims structure
#[derive(Serialize, Deserialize, Debug)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Local,
    Google,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Local => "local",
            AuthProvider::Google => "google",
        }
    }
}

/// User database model. Never serialized directly: it carries the password hash and Google tokens.
#[derive(FromRow, Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub hashed_password: String,
    pub auth_provider: String,
    pub google_access_token: Option<String>,
    pub google_refresh_token: Option<String>,
    pub google_token_expiry: Option<DateTime<Utc>>,
    pub created_at: Option<String>,
}

impl User {
    pub fn google_connected(&self) -> bool {
        self.google_access_token
            .as_deref()
            .map_or(false, |token| !token.is_empty())
    }
}

/// Registration payload
#[derive(Debug, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserRead {
    pub id: i64,
    pub email: String,
}

impl From<&User> for UserRead {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

/// Form-encoded login payload (`username` carries the email)
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// Google Identity Services credential (an ID token)
#[derive(Deserialize)]
pub struct GoogleAuthPayload {
    pub credential: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub email: String,
    pub auth_provider: String,
    pub google_access_token: Option<String>,
    pub google_connected: bool,
    pub created_at: Option<String>,
}

impl From<&User> for MeResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            auth_provider: user.auth_provider.clone(),
            google_access_token: user.google_access_token.clone(),
            google_connected: user.google_connected(),
            created_at: user.created_at.clone(),
        }
    }
}
