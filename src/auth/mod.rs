//! # Auth Module
//!
//! Account and session handling:
//! - Registration and password login (bcrypt)
//! - Local JWT issuance and validation
//! - Google ID token sign-in
//! - AuthedUser extractor for protected routes

pub mod credentials;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod validators;


pub use extractors::AuthedUser;
pub use models::User;
pub use routes::auth_routes;
pub use services::UserService;
