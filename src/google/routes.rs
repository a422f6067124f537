//! Google account and Calendar routes

use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers;

/// Creates the Google router
///
/// # Routes
/// - `GET /auth/google-calendar/connect` - Consent URL (auth optional)
/// - `GET /auth/google-calendar/callback` - OAuth redirect target
/// - `POST /google-auth` - Save client-obtained tokens
/// - `GET /google-auth/status` - Token health and next steps
/// - `POST /google-auth/refresh` - Refresh the stored access token
/// - `POST /google-calendar/events` - Create (or update the linked) event
/// - `PUT /google-calendar/events/:event_id` - Update an event
pub fn google_routes() -> Router {
    Router::new()
        .route("/auth/google-calendar/connect", get(handlers::connect))
        .route("/auth/google-calendar/callback", get(handlers::callback))
        .route("/google-auth", post(handlers::save_tokens))
        .route("/google-auth/status", get(handlers::status))
        .route("/google-auth/refresh", post(handlers::refresh))
        .route("/google-calendar/events", post(handlers::create_event))
        .route(
            "/google-calendar/events/:event_id",
            put(handlers::update_event),
        )
}
