// src/services/mod.rs
//
// Shared services: Google OAuth/Calendar client and task export renderers

pub mod export;
pub mod google;
pub mod pdf;

// Re-export commonly used types for convenience
pub use google::GoogleService;
