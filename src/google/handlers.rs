//! Google account linking, token maintenance and Calendar event handlers

use axum::{
    extract::{Extension, Path, Query},
    response::Redirect,
    Json,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::models::{
    CalendarEventRequest, CallbackQuery, ConnectResponse, GoogleAuthStatus, GoogleTokensSaved,
    RefreshResponse, SaveGoogleTokens,
};
use crate::auth::credentials::{decode_token, issue_token};
use crate::auth::{AuthedUser, User, UserService};
use crate::common::{safe_email_log, ApiError, AppState, Validator};
use crate::services::google::{is_valid_refresh_token, CalendarEvent};
use crate::tasks::TaskService;

/// Subject prefix that keeps connect-state tokens from doubling as session tokens
const STATE_SUBJECT_PREFIX: &str = "calendar-connect:";
const STATE_TTL_MINUTES: i64 = 10;

// ============================================================================
// OAuth Connect Flow
// ============================================================================

/// GET /auth/google-calendar/connect
/// Authentication is optional; with a valid token the URL carries a signed `state`
pub async fn connect(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: Option<AuthedUser>,
) -> Result<Json<ConnectResponse>, ApiError> {
    let state = state_lock.read().await.clone();
    let google = &state.google_service;

    let oauth_state = match &authed {
        Some(AuthedUser(user)) => Some(issue_token(
            &format!("{}{}", STATE_SUBJECT_PREFIX, user.email),
            Duration::minutes(STATE_TTL_MINUTES),
            &state.config,
        )?),
        None => None,
    };

    let oauth_url = google.authorization_url(oauth_state.as_deref())?;
    debug!(with_state = oauth_state.is_some(), "Generated Calendar connect URL");

    Ok(Json(ConnectResponse {
        oauth_url,
        client_id: google.client_id()?.to_string(),
        redirect_uri: google.redirect_uri().to_string(),
    }))
}

/// GET /auth/google-calendar/callback
/// Exchanges the code, stores the tokens on the user named by `state`, then
/// redirects back to the frontend
pub async fn callback(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect, ApiError> {
    let state = state_lock.read().await.clone();
    let frontend = state.config.frontend_url.trim_end_matches('/').to_string();

    if let Some(reason) = query.error.as_deref() {
        warn!(reason = %reason, "Google reported an OAuth error on callback");
        return Ok(Redirect::to(&format!(
            "{}?google_calendar=error&reason={}",
            frontend,
            urlencoding::encode(reason)
        )));
    }

    let code = query
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing authorization code".to_string()))?;

    let user = user_from_state(&state, query.state.as_deref()).await?;

    let grant = state.google_service.exchange_code(code).await?;
    UserService::new(state.db.clone())
        .save_google_tokens(
            user.id,
            &grant.access_token,
            grant.refresh_token.as_deref(),
            grant.expires_in,
        )
        .await?;

    info!(
        user_id = user.id,
        email = %safe_email_log(&user.email),
        has_refresh_token = grant.refresh_token.is_some(),
        "Google Calendar connected"
    );

    Ok(Redirect::to(&format!("{}?google_calendar=connected", frontend)))
}

async fn user_from_state(state: &AppState, oauth_state: Option<&str>) -> Result<User, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid or missing OAuth state".to_string());

    let token = oauth_state.filter(|s| !s.is_empty()).ok_or_else(invalid)?;
    let claims = decode_token(token, &state.config).map_err(|_| invalid())?;
    let email = claims
        .sub
        .strip_prefix(STATE_SUBJECT_PREFIX)
        .ok_or_else(invalid)?;

    UserService::new(state.db.clone())
        .find_by_email(email)
        .await?
        .ok_or_else(invalid)
}

// ============================================================================
// Token Maintenance
// ============================================================================

/// POST /google-auth
pub async fn save_tokens(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    AuthedUser(user): AuthedUser,
    Json(payload): Json<SaveGoogleTokens>,
) -> Result<Json<GoogleTokensSaved>, ApiError> {
    let state = state_lock.read().await.clone();

    if payload.access_token.trim().is_empty() {
        return Err(ApiError::ValidationError(
            "access_token: Access token is required".to_string(),
        ));
    }

    let updated = UserService::new(state.db.clone())
        .save_google_tokens(
            user.id,
            payload.access_token.trim(),
            payload.refresh_token.as_deref(),
            payload.expires_in,
        )
        .await?;

    info!(user_id = user.id, "Saved Google tokens");

    Ok(Json(GoogleTokensSaved {
        detail: "Google tokens saved".to_string(),
        google_connected: updated.google_connected(),
        has_refresh_token: updated.google_refresh_token.is_some(),
    }))
}

/// Status summary with human-readable next steps
pub fn token_status(user: &User) -> GoogleAuthStatus {
    let google_connected = user.google_connected();
    let has_refresh_token = user
        .google_refresh_token
        .as_deref()
        .map_or(false, |t| !t.is_empty());
    let refresh_token_valid = is_valid_refresh_token(user.google_refresh_token.as_deref());
    let token_expired = user
        .google_token_expiry
        .map_or(false, |expiry| expiry <= Utc::now());

    let mut recommendations = Vec::new();
    if !google_connected {
        recommendations.push("Connect your Google account to enable Calendar sync".to_string());
    }
    if !has_refresh_token {
        recommendations.push(
            "Reconnect your Google account to obtain a refresh token for offline access"
                .to_string(),
        );
    } else if !refresh_token_valid {
        recommendations.push(
            "The stored refresh token looks invalid. Reconnect your Google account".to_string(),
        );
    }
    if token_expired && refresh_token_valid {
        recommendations
            .push("The access token has expired. Call /google-auth/refresh to renew it".to_string());
    }

    GoogleAuthStatus {
        google_connected,
        has_refresh_token,
        refresh_token_valid,
        token_expired,
        token_expiry: user.google_token_expiry,
        recommendations,
    }
}

/// GET /google-auth/status
pub async fn status(AuthedUser(user): AuthedUser) -> Json<GoogleAuthStatus> {
    Json(token_status(&user))
}

/// POST /google-auth/refresh
pub async fn refresh(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    AuthedUser(user): AuthedUser,
) -> Result<Json<RefreshResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    let grant = state
        .google_service
        .refresh_access_token(user.google_refresh_token.as_deref())
        .await?;

    let updated = UserService::new(state.db.clone())
        .save_google_tokens(
            user.id,
            &grant.access_token,
            grant.refresh_token.as_deref(),
            grant.expires_in,
        )
        .await?;

    info!(user_id = user.id, "Refreshed Google access token");

    Ok(Json(RefreshResponse {
        detail: "Google access token refreshed".to_string(),
        new_expiry: updated.google_token_expiry,
        expires_in: grant.expires_in,
    }))
}

// ============================================================================
// Calendar Events
// ============================================================================

/// POST /google-calendar/events
///
/// When `task_id` names a task that is already linked to an event, that event is
/// updated instead of creating a duplicate.
pub async fn create_event(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    AuthedUser(user): AuthedUser,
    Json(request): Json<CalendarEventRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();
    submit_event(&state, &user, None, request).await.map(Json)
}

/// PUT /google-calendar/events/:event_id
pub async fn update_event(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    AuthedUser(user): AuthedUser,
    Path(event_id): Path<String>,
    Json(request): Json<CalendarEventRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();
    submit_event(&state, &user, Some(event_id), request)
        .await
        .map(Json)
}

async fn submit_event(
    state: &AppState,
    user: &User,
    event_id: Option<String>,
    request: CalendarEventRequest,
) -> Result<serde_json::Value, ApiError> {
    request.validate(&request).into_result()?;

    let tasks = TaskService::new(state.db.clone());
    let task = match request.task_id {
        Some(task_id) => Some(tasks.get(user.id, task_id).await?),
        None => None,
    };

    let linked_event_id = task.as_ref().and_then(|t| t.google_event_id.clone());
    let target_event_id = event_id.or_else(|| linked_event_id.clone());

    let access_token = user
        .google_access_token
        .clone()
        .filter(|t| !t.is_empty())
        .or_else(|| request.access_token.clone().filter(|t| !t.is_empty()))
        .ok_or_else(|| {
            ApiError::BadRequest(
                "No Google access token available. Connect your Google account first."
                    .to_string(),
            )
        })?;

    let event = CalendarEvent {
        summary: request.summary.trim().to_string(),
        description: request.description.clone(),
        start: request.start.clone(),
        end: request.end.clone(),
        location: request
            .location
            .clone()
            .filter(|l| !l.trim().is_empty())
            .or_else(|| task.as_ref().and_then(|t| t.address.clone())),
    };

    let response = send_with_refresh(state, user, &access_token, target_event_id.as_deref(), &event).await?;

    if let Some(task) = &task {
        if linked_event_id.is_none() {
            let new_id = target_event_id
                .clone()
                .or_else(|| response.get("id").and_then(|v| v.as_str()).map(str::to_string));
            if let Some(new_id) = new_id {
                tasks
                    .set_google_event_id(user.id, task.id, Some(new_id.clone()))
                    .await?;
                info!(task_id = task.id, event_id = %new_id, "Linked task to Calendar event");
            }
        }
    }

    Ok(response)
}

/// Send the event; on a 401 refresh the access token once, persist it and retry
async fn send_with_refresh(
    state: &AppState,
    user: &User,
    access_token: &str,
    event_id: Option<&str>,
    event: &CalendarEvent,
) -> Result<serde_json::Value, ApiError> {
    let google = &state.google_service;

    match google.upsert_event(access_token, event_id, event).await {
        Ok(response) => Ok(response),
        Err(e) if e.is_unauthorized() && user.google_refresh_token.is_some() => {
            warn!(user_id = user.id, "Calendar rejected the access token, refreshing once");

            let grant = google
                .refresh_access_token(user.google_refresh_token.as_deref())
                .await?;
            UserService::new(state.db.clone())
                .save_google_tokens(
                    user.id,
                    &grant.access_token,
                    grant.refresh_token.as_deref(),
                    grant.expires_in,
                )
                .await?;

            Ok(google
                .upsert_event(&grant.access_token, event_id, event)
                .await?)
        }
        Err(e) => Err(e.into()),
    }
}
