use axum::{
    extract::{Extension, Path, Query},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use super::models::{
    DeleteResponse, ListTasksQuery, Task, TaskCompletedUpdate, TaskCreate, TaskEventLink,
};
use super::services::TaskService;
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState};
use crate::services::{export, pdf};

// ============================================================================
// Task CRUD Handlers
// ============================================================================

/// GET /tasks - List the current user's tasks
pub async fn list_tasks(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    AuthedUser(user): AuthedUser,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let app_state = state.read().await;
    let tasks = TaskService::new(app_state.db.clone())
        .list(user.id, &query)
        .await?;

    Ok(Json(tasks))
}

/// POST /tasks - Create a task
pub async fn create_task(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    AuthedUser(user): AuthedUser,
    Json(request): Json<TaskCreate>,
) -> Result<Json<Task>, ApiError> {
    let app_state = state.read().await;
    let task = TaskService::new(app_state.db.clone())
        .create(user.id, request)
        .await?;

    Ok(Json(task))
}

/// GET /tasks/:id
pub async fn get_task(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    AuthedUser(user): AuthedUser,
    Path(task_id): Path<i64>,
) -> Result<Json<Task>, ApiError> {
    let app_state = state.read().await;
    let task = TaskService::new(app_state.db.clone())
        .get(user.id, task_id)
        .await?;

    Ok(Json(task))
}

/// PUT /tasks/:id - Replace the editable fields of a task
pub async fn update_task(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    AuthedUser(user): AuthedUser,
    Path(task_id): Path<i64>,
    Json(request): Json<TaskCreate>,
) -> Result<Json<Task>, ApiError> {
    let app_state = state.read().await;
    let task = TaskService::new(app_state.db.clone())
        .update(user.id, task_id, request)
        .await?;

    Ok(Json(task))
}

/// PATCH /tasks/:id - Toggle completion
pub async fn update_task_completed(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    AuthedUser(user): AuthedUser,
    Path(task_id): Path<i64>,
    Json(request): Json<TaskCompletedUpdate>,
) -> Result<Json<Task>, ApiError> {
    let app_state = state.read().await;
    let task = TaskService::new(app_state.db.clone())
        .set_completed(user.id, task_id, request.completed)
        .await?;

    Ok(Json(task))
}

/// PUT /tasks/:id/google-event - Link or unlink a Calendar event
pub async fn update_task_google_event(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    AuthedUser(user): AuthedUser,
    Path(task_id): Path<i64>,
    Json(request): Json<TaskEventLink>,
) -> Result<Json<Task>, ApiError> {
    let app_state = state.read().await;
    let task = TaskService::new(app_state.db.clone())
        .set_google_event_id(user.id, task_id, request.google_event_id)
        .await?;

    Ok(Json(task))
}

/// DELETE /tasks/:id
pub async fn delete_task(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    AuthedUser(user): AuthedUser,
    Path(task_id): Path<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let app_state = state.read().await;
    TaskService::new(app_state.db.clone())
        .delete(user.id, task_id)
        .await?;

    Ok(Json(DeleteResponse {
        detail: "Task deleted".to_string(),
    }))
}

// ============================================================================
// Export Handler
// ============================================================================

/// GET /tasks/export/:format - CSV, Excel or PDF download of the filtered list
pub async fn export_tasks(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    AuthedUser(user): AuthedUser,
    Path(format): Path<String>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Response, ApiError> {
    let (content_type, filename) = match format.as_str() {
        "csv" => ("text/csv; charset=utf-8", "tasks.csv"),
        "excel" => (
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "tasks.xlsx",
        ),
        "pdf" => ("application/pdf", "tasks.pdf"),
        other => {
            return Err(ApiError::BadRequest(format!(
                "Unsupported export format '{}'. Use csv, excel or pdf",
                other
            )))
        }
    };

    let app_state = state.read().await;
    let tasks = TaskService::new(app_state.db.clone())
        .list(user.id, &query)
        .await?;

    let body: Vec<u8> = match format.as_str() {
        "csv" => export::render_csv(&tasks).into_bytes(),
        "excel" => export::render_xlsx(&tasks).map_err(|e| {
            error!(error = %e, "XLSX export failed");
            ApiError::ExportError("Failed to generate Excel export".to_string())
        })?,
        _ => pdf::render_tasks_pdf(&tasks, Utc::now().naive_utc()).map_err(|e| {
            error!(error = %e, "PDF export failed");
            ApiError::ExportError("Failed to generate PDF export".to_string())
        })?,
    };

    info!(
        user_id = user.id,
        format = %format,
        tasks = tasks.len(),
        bytes = body.len(),
        "Tasks exported"
    );

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", filename),
            ),
        ],
        body,
    )
        .into_response())
}
