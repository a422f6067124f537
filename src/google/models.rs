use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::google::EventDateTime;

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub oauth_url: String,
    pub client_id: String,
    pub redirect_uri: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Tokens obtained by the client-side Google flow
#[derive(Debug, Deserialize)]
pub struct SaveGoogleTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct GoogleTokensSaved {
    pub detail: String,
    pub google_connected: bool,
    pub has_refresh_token: bool,
}

#[derive(Debug, Serialize)]
pub struct GoogleAuthStatus {
    pub google_connected: bool,
    pub has_refresh_token: bool,
    pub refresh_token_valid: bool,
    pub token_expired: bool,
    pub token_expiry: Option<DateTime<Utc>>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub detail: String,
    pub new_expiry: Option<DateTime<Utc>>,
    pub expires_in: Option<i64>,
}

/// Body of `POST /google-calendar/events` and `PUT /google-calendar/events/:event_id`
#[derive(Debug, Deserialize)]
pub struct CalendarEventRequest {
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub task_id: Option<i64>,
    /// Used only when no token is stored for the user
    #[serde(default)]
    pub access_token: Option<String>,
}
