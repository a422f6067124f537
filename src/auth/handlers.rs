//! Authentication handlers

use axum::extract::{Extension, Form, Json};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::credentials::{issue_access_token, verify_password};
use super::extractors::AuthedUser;
use super::models::{GoogleAuthPayload, LoginForm, MeResponse, TokenResponse, UserCreate, UserRead};
use super::services::UserService;
use crate::common::{safe_email_log, ApiError, AppState};

/// POST /register
/// Creates a password account and returns `{id, email}`
pub async fn register(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<UserCreate>,
) -> Result<Json<UserRead>, ApiError> {
    let state = state_lock.read().await.clone();

    let user = UserService::new(state.db.clone())
        .create_local(payload, state.config.bcrypt_cost)
        .await?;

    info!(user_id = user.id, email = %safe_email_log(&user.email), "User registered");
    Ok(Json(UserRead::from(&user)))
}

/// POST /login
/// Form fields `username` (the email) and `password`
pub async fn login(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    let user = UserService::new(state.db.clone())
        .find_by_email(&form.username)
        .await?;

    let user = match user {
        Some(user) if verify_password(&form.password, &user.hashed_password) => user,
        _ => {
            warn!(email = %safe_email_log(&form.username), "Login failed");
            return Err(ApiError::Unauthorized(
                "Incorrect email or password".to_string(),
            ));
        }
    };

    let token = issue_access_token(&user.email, &state.config)?;
    info!(user_id = user.id, "User logged in");
    Ok(Json(TokenResponse::bearer(token)))
}

/// POST /auth/google
/// Exchanges a Google ID token (`credential`) for a local session token
pub async fn google_auth(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<GoogleAuthPayload>,
) -> Result<Json<TokenResponse>, ApiError> {
    info!("🔐 Received Google auth request");
    let state = state_lock.read().await.clone();

    let email = state
        .google_service
        .verify_id_token(&payload.credential)
        .await?;

    let user = UserService::new(state.db.clone())
        .find_or_create_google(&email)
        .await?;

    let token = issue_access_token(&user.email, &state.config)?;
    info!(
        user_id = user.id,
        email = %safe_email_log(&user.email),
        "Google sign-in successful"
    );
    Ok(Json(TokenResponse::bearer(token)))
}

/// GET /me
pub async fn me(AuthedUser(user): AuthedUser) -> Json<MeResponse> {
    Json(MeResponse::from(&user))
}
