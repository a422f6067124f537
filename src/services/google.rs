// src/services/google.rs
use axum::http::StatusCode;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::common::config::GoogleEndpoints;
use crate::common::{safe_email_log, safe_token_log, ApiError, AppConfig};

const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";
const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];
const TOKEN_ENDPOINT_TIMEOUT: Duration = Duration::from_secs(10);

const PLACEHOLDER_PATTERNS: [&str; 5] = [
    "IL_TUO_REFRESH_TOKEN",
    "YOUR_REFRESH_TOKEN",
    "REPLACE_WITH_REAL_TOKEN",
    "placeholder",
    "test_token",
];

#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("Missing {0} configuration")]
    NotConfigured(&'static str),

    #[error("Missing Google refresh token")]
    MissingRefreshToken,

    #[error("Invalid refresh token format. Please reconnect your Google account to get a valid refresh token.")]
    InvalidRefreshToken,

    #[error("Failed to connect to Google OAuth service: {0}")]
    RequestFailed(String),

    #[error("{0}")]
    RefreshRejected(String),

    #[error("Google token exchange failed: {body}")]
    ExchangeFailed { status: u16, body: String },

    #[error("Google token verification failed")]
    IdTokenInvalid,

    #[error("Google Calendar API error: {body}")]
    CalendarError { status: u16, body: String },

    #[error("Failed to connect to Google Calendar API: {0}")]
    CalendarUnavailable(String),

    #[error("Unexpected response from Google: {0}")]
    SerializationError(String),
}

impl GoogleError {
    /// Calendar rejected the access token; a refresh may help
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GoogleError::CalendarError { status: 401, .. })
    }
}

impl From<GoogleError> for ApiError {
    fn from(err: GoogleError) -> Self {
        let message = err.to_string();
        match err {
            GoogleError::NotConfigured(_) => ApiError::Configuration(message),
            GoogleError::MissingRefreshToken | GoogleError::InvalidRefreshToken => {
                ApiError::BadRequest(message)
            }
            GoogleError::RequestFailed(_) | GoogleError::CalendarUnavailable(_) => {
                ApiError::ServiceUnavailable(message)
            }
            GoogleError::RefreshRejected(_) | GoogleError::IdTokenInvalid => {
                ApiError::Unauthorized(message)
            }
            GoogleError::ExchangeFailed { status, .. }
            | GoogleError::CalendarError { status, .. } => ApiError::Upstream {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                message,
            },
            GoogleError::SerializationError(_) => ApiError::Upstream {
                status: StatusCode::BAD_GATEWAY,
                message,
            },
        }
    }
}

/// Token endpoint response for both code exchange and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    email: Option<String>,
}

/// Start/end of a Calendar event: either a timed `dateTime` or an all-day `date`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDateTime {
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "timeZone", skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Calendar API event body
#[derive(Debug, Clone, Serialize)]
pub struct CalendarEvent {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Reject missing, short or obviously placeholder refresh tokens before calling Google
pub fn is_valid_refresh_token(refresh_token: Option<&str>) -> bool {
    let token = match refresh_token {
        Some(t) => t,
        None => return false,
    };

    let lowered = token.to_lowercase();
    if PLACEHOLDER_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(&pattern.to_lowercase()))
    {
        return false;
    }

    token.trim().chars().count() >= 20
}

/// Map a non-2xx refresh response to the message shown to the user
pub fn classify_refresh_failure(status: u16, body: &str) -> String {
    match serde_json::from_str::<OAuthErrorBody>(body) {
        Ok(parsed) => {
            let error_type = parsed.error.unwrap_or_else(|| "unknown_error".to_string());
            let description = parsed
                .error_description
                .unwrap_or_else(|| "No description provided".to_string());

            match error_type.as_str() {
                "invalid_grant" => "The refresh token is invalid, expired, or has been revoked. \
                     Please reconnect your Google account to get a new refresh token."
                    .to_string(),
                "invalid_client" => "Invalid Google OAuth client configuration. \
                     Please check your client credentials."
                    .to_string(),
                "invalid_request" => format!("Invalid token refresh request: {}", description),
                other => format!("Token refresh failed ({}): {}", other, description),
            }
        }
        Err(_) => format!("Token refresh failed with status {}: {}", status, body),
    }
}

fn unverified_email(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: IdTokenClaims = serde_json::from_slice(&bytes).ok()?;
    claims.email.filter(|email| !email.is_empty())
}

#[derive(Debug, Clone)]
pub struct GoogleService {
    client: Client,
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: String,
    allow_insecure: bool,
    endpoints: GoogleEndpoints,
}

impl GoogleService {
    pub fn new(client: Client, config: &AppConfig) -> Self {
        Self {
            client,
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.google_redirect_uri.clone(),
            allow_insecure: config.google_dev_allow_insecure,
            endpoints: config.google_endpoints.clone(),
        }
    }

    pub fn client_id(&self) -> Result<&str, GoogleError> {
        self.client_id
            .as_deref()
            .ok_or(GoogleError::NotConfigured("GOOGLE_CLIENT_ID"))
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    fn client_secret(&self) -> Result<&str, GoogleError> {
        self.client_secret
            .as_deref()
            .ok_or(GoogleError::NotConfigured("GOOGLE_CLIENT_SECRET"))
    }

    /// Consent URL for the Calendar scope, requesting offline access
    pub fn authorization_url(&self, state: Option<&str>) -> Result<String, GoogleError> {
        let client_id = self.client_id()?;

        let mut auth_url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&include_granted_scopes=true",
            self.endpoints.auth_url,
            urlencoding::encode(client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(CALENDAR_SCOPE)
        );

        if let Some(state) = state {
            auth_url.push_str("&state=");
            auth_url.push_str(&urlencoding::encode(state));
        }

        debug!(scope = CALENDAR_SCOPE, has_state = state.is_some(), "Generated Google OAuth authorization URL");
        Ok(auth_url)
    }

    /// Exchange authorization code for tokens
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, GoogleError> {
        let client_secret = self.client_secret()?;
        let client_id = self.client_id.as_deref().unwrap_or_default();

        let params = [
            ("code", code),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        debug!("Exchanging authorization code for tokens");

        let response = self
            .client
            .post(&self.endpoints.token_url)
            .timeout(TOKEN_ENDPOINT_TIMEOUT)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send token exchange request");
                GoogleError::RequestFailed(e.to_string())
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Token exchange failed");
            return Err(GoogleError::ExchangeFailed {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let grant = response
            .json::<TokenGrant>()
            .await
            .map_err(|e| GoogleError::SerializationError(e.to_string()))?;

        info!(
            has_refresh_token = grant.refresh_token.is_some(),
            "Successfully exchanged authorization code for tokens"
        );
        Ok(grant)
    }

    /// Refresh access token using refresh token
    pub async fn refresh_access_token(
        &self,
        refresh_token: Option<&str>,
    ) -> Result<TokenGrant, GoogleError> {
        let refresh_token = match refresh_token {
            Some(token) if !token.is_empty() => token,
            _ => return Err(GoogleError::MissingRefreshToken),
        };

        if !is_valid_refresh_token(Some(refresh_token)) {
            warn!(
                refresh_token = %safe_token_log(refresh_token),
                "Rejected refresh token with invalid format"
            );
            return Err(GoogleError::InvalidRefreshToken);
        }

        let client_secret = self.client_secret()?;
        let client_id = self.client_id.as_deref().unwrap_or_default();

        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        debug!(
            client_id = %client_id,
            refresh_token = %safe_token_log(refresh_token),
            "Refreshing access token with Google OAuth"
        );

        let response = self
            .client
            .post(&self.endpoints.token_url)
            .timeout(TOKEN_ENDPOINT_TIMEOUT)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send token refresh request");
                GoogleError::RequestFailed(e.to_string())
            })?;

        let status = response.status();
        debug!(status = %status, "Received token refresh response");

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = classify_refresh_failure(status.as_u16(), &error_text);
            error!(
                status = %status,
                error = %error_text,
                "Token refresh failed - check your refresh token and credentials"
            );
            return Err(GoogleError::RefreshRejected(message));
        }

        let grant = response
            .json::<TokenGrant>()
            .await
            .map_err(|e| GoogleError::SerializationError(e.to_string()))?;

        info!("Successfully refreshed access token");
        Ok(grant)
    }

    /// Verify a Google ID token and return its email claim.
    ///
    /// With `GOOGLE_DEV_ALLOW_INSECURE` the unverified payload is accepted when
    /// signature verification fails.
    pub async fn verify_id_token(&self, id_token: &str) -> Result<String, GoogleError> {
        match self.verify_signed_id_token(id_token).await {
            Ok(email) => Ok(email),
            Err(e) => {
                warn!(error = %e, "Google ID token verification failed");
                if self.allow_insecure {
                    if let Some(email) = unverified_email(id_token) {
                        warn!(
                            email = %safe_email_log(&email),
                            "INSECURE: accepting unverified Google ID token (GOOGLE_DEV_ALLOW_INSECURE)"
                        );
                        return Ok(email);
                    }
                }
                Err(GoogleError::IdTokenInvalid)
            }
        }
    }

    async fn verify_signed_id_token(&self, id_token: &str) -> Result<String, GoogleError> {
        let client_id = self.client_id()?;

        let header = decode_header(id_token).map_err(|_| GoogleError::IdTokenInvalid)?;
        let kid = header.kid.ok_or(GoogleError::IdTokenInvalid)?;

        let jwks = self
            .client
            .get(&self.endpoints.certs_url)
            .send()
            .await
            .map_err(|e| GoogleError::RequestFailed(e.to_string()))?
            .json::<Jwks>()
            .await
            .map_err(|e| GoogleError::SerializationError(e.to_string()))?;

        let jwk = jwks
            .keys
            .iter()
            .find(|k| k.kid == kid)
            .ok_or(GoogleError::IdTokenInvalid)?;

        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|_| GoogleError::IdTokenInvalid)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[client_id]);
        validation.set_issuer(&GOOGLE_ISSUERS[..]);

        let data = decode::<IdTokenClaims>(id_token, &key, &validation)
            .map_err(|_| GoogleError::IdTokenInvalid)?;

        data.claims
            .email
            .filter(|email| !email.is_empty())
            .ok_or(GoogleError::IdTokenInvalid)
    }

    /// Create an event, or update `event_id` when given, on the primary calendar
    pub async fn upsert_event(
        &self,
        access_token: &str,
        event_id: Option<&str>,
        event: &CalendarEvent,
    ) -> Result<serde_json::Value, GoogleError> {
        let request = match event_id {
            Some(id) => self.client.put(format!(
                "{}/calendars/primary/events/{}",
                self.endpoints.calendar_api_base,
                urlencoding::encode(id)
            )),
            None => self.client.post(format!(
                "{}/calendars/primary/events",
                self.endpoints.calendar_api_base
            )),
        };

        let response = request
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send Calendar API request");
                GoogleError::CalendarUnavailable(e.to_string())
            })?;

        let status = response.status();
        debug!(status = %status, updating = event_id.is_some(), "Received Calendar API response");

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Calendar API request failed");
            return Err(GoogleError::CalendarError {
                status: status.as_u16(),
                body: error_text,
            });
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| GoogleError::SerializationError(e.to_string()))
    }
}
