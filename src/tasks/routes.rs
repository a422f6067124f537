use super::handlers;
use axum::{
    routing::{get, put},
    Router,
};

/// Creates the tasks router; every route requires a bearer token
pub fn tasks_routes() -> Router {
    Router::new()
        .route(
            "/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route(
            "/tasks/:id",
            get(handlers::get_task)
                .put(handlers::update_task)
                .patch(handlers::update_task_completed)
                .delete(handlers::delete_task),
        )
        .route(
            "/tasks/:id/google-event",
            put(handlers::update_task_google_event),
        )
        // Export routes
        .route("/tasks/export/:format", get(handlers::export_tasks))
}
