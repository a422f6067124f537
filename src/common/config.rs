// src/common/config.rs
//! Application configuration loaded from environment variables

use jsonwebtoken::Algorithm;
use std::env;
use tracing::warn;

const DEFAULT_SECRET_KEY: &str = "dev_secret_change_me";
const DEFAULT_REDIRECT_URI: &str = "http://localhost:8000/auth/google-calendar/callback";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";

/// Cost bounds accepted by bcrypt; the crate only exports its default
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

/// Google endpoints used by the OAuth, ID token and Calendar flows
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub certs_url: String,
    pub calendar_api_base: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            certs_url: "https://www.googleapis.com/oauth2/v3/certs".to_string(),
            calendar_api_base: "https://www.googleapis.com/calendar/v3".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub secret_key: String,
    pub algorithm: Algorithm,
    pub access_token_expire_minutes: i64,
    pub bcrypt_cost: u32,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub google_redirect_uri: String,
    /// Accept Google ID tokens without signature verification when verification fails.
    /// Insecure; development only.
    pub google_dev_allow_insecure: bool,
    pub google_endpoints: GoogleEndpoints,
    pub frontend_url: String,
    pub cors_origins: Vec<String>,
    pub port: u16,
    pub reset_db: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let secret_key = match non_empty_var("SECRET_KEY") {
            Some(secret) => secret,
            None => {
                warn!("SECRET_KEY not set, using the development signing secret");
                DEFAULT_SECRET_KEY.to_string()
            }
        };

        let algorithm = parse_algorithm(
            &env::var("ALGORITHM").unwrap_or_else(|_| "HS256".to_string()),
        );

        let access_token_expire_minutes = env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|m| *m > 0)
            .unwrap_or(30);

        let bcrypt_cost = parse_bcrypt_cost(env::var("BCRYPT_COST").ok().as_deref());

        let google_client_id = non_empty_var("GOOGLE_CLIENT_ID");
        if google_client_id.is_none() {
            warn!("GOOGLE_CLIENT_ID not set, Google sign-in and Calendar are unavailable");
        }

        let google_dev_allow_insecure =
            parse_flag(&env::var("GOOGLE_DEV_ALLOW_INSECURE").unwrap_or_default());
        if google_dev_allow_insecure {
            warn!("GOOGLE_DEV_ALLOW_INSECURE is enabled: unverified Google ID tokens may be accepted");
        }

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://smarttask.db".to_string()),
            secret_key,
            algorithm,
            access_token_expire_minutes,
            bcrypt_cost,
            google_client_id,
            google_client_secret: non_empty_var("GOOGLE_CLIENT_SECRET"),
            google_redirect_uri: env::var("GOOGLE_REDIRECT_URI")
                .unwrap_or_else(|_| DEFAULT_REDIRECT_URI.to_string()),
            google_dev_allow_insecure,
            google_endpoints: GoogleEndpoints::default(),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| DEFAULT_FRONTEND_URL.to_string()),
            cors_origins: parse_origins(
                &env::var("CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_FRONTEND_URL.to_string()),
            ),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(8000),
            reset_db: parse_flag(&env::var("RESET_DB").unwrap_or_default()),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Out-of-range costs are clamped; missing or unparsable values use bcrypt's default
pub fn parse_bcrypt_cost(value: Option<&str>) -> u32 {
    value
        .and_then(|v| v.trim().parse::<u32>().ok())
        .map(|c| c.clamp(MIN_BCRYPT_COST, MAX_BCRYPT_COST))
        .unwrap_or(bcrypt::DEFAULT_COST)
}

pub fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

/// Only HMAC algorithms are accepted for locally issued tokens
pub fn parse_algorithm(value: &str) -> Algorithm {
    match value.trim().to_uppercase().as_str() {
        "HS256" => Algorithm::HS256,
        "HS384" => Algorithm::HS384,
        "HS512" => Algorithm::HS512,
        other => {
            warn!(algorithm = %other, "Unsupported ALGORITHM, falling back to HS256");
            Algorithm::HS256
        }
    }
}

pub fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}
