//! # Google Module
//!
//! Google account linking for Calendar sync: the OAuth connect flow, token
//! storage and refresh, and Calendar event creation tied to tasks.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod validators;


pub use routes::google_routes;
