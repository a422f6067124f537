//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /register` - Create a password account
/// - `POST /login` - Form login, returns a bearer token
/// - `POST /auth/google` - Google ID token sign-in
/// - `GET /me` - Current user information
pub fn auth_routes() -> Router {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/auth/google", post(handlers::google_auth))
        .route("/me", get(handlers::me))
}
