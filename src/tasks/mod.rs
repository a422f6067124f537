//! # Tasks Module
//!
//! Per-user task records:
//! - Task CRUD with owner scoping
//! - Sorting and completion filtering
//! - CSV, Excel and PDF export

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod validators;

#[cfg(test)]
mod tests;

pub use routes::tasks_routes;
pub use services::TaskService;
