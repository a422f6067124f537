use sqlx::SqlitePool;
use tracing::info;

use super::models::{ListTasksQuery, Task, TaskCreate};
use crate::common::{ApiError, Validator};

const TASK_COLUMNS: &str = "id, user_id, title, description, deadline, priority, completed, \
     all_day, google_event_id, address, latitude, longitude, created_at, updated_at";

pub fn not_found() -> ApiError {
    ApiError::NotFound("Task not found or not authorized".to_string())
}

fn normalized(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Task persistence. Every statement filters on both the task id and the owner.
pub struct TaskService {
    db: SqlitePool,
}

impl TaskService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn list(&self, user_id: i64, query: &ListTasksQuery) -> Result<Vec<Task>, ApiError> {
        let mut sql = format!("SELECT {} FROM tasks WHERE user_id = ?", TASK_COLUMNS);
        if query.completed.is_some() {
            sql.push_str(" AND completed = ?");
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(&query.order_by_clause());

        let mut q = sqlx::query_as::<_, Task>(&sql).bind(user_id);
        if let Some(completed) = query.completed {
            q = q.bind(completed);
        }

        q.fetch_all(&self.db).await.map_err(ApiError::DatabaseError)
    }

    pub async fn get(&self, user_id: i64, task_id: i64) -> Result<Task, ApiError> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE id = ? AND user_id = ?",
            TASK_COLUMNS
        ))
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(not_found)
    }

    pub async fn create(&self, user_id: i64, request: TaskCreate) -> Result<Task, ApiError> {
        request.validate(&request).into_result()?;

        let result = sqlx::query(
            r#"
            INSERT INTO tasks (user_id, title, description, deadline, priority, completed,
                               all_day, address, latitude, longitude)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(request.title.trim())
        .bind(normalized(request.description))
        .bind(request.deadline)
        .bind(request.priority.unwrap_or_default())
        .bind(request.completed.unwrap_or(false))
        .bind(request.all_day.unwrap_or(false))
        .bind(normalized(request.address))
        .bind(request.latitude)
        .bind(request.longitude)
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        let task_id = result.last_insert_rowid();
        info!(task_id = task_id, user_id = user_id, "Task created");
        self.get(user_id, task_id).await
    }

    /// Full replacement of the user-editable fields; `google_event_id` is left alone
    pub async fn update(
        &self,
        user_id: i64,
        task_id: i64,
        request: TaskCreate,
    ) -> Result<Task, ApiError> {
        request.validate(&request).into_result()?;

        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET title = ?, description = ?, deadline = ?, priority = ?, completed = ?,
                all_day = ?, address = ?, latitude = ?, longitude = ?,
                updated_at = datetime('now')
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(request.title.trim())
        .bind(normalized(request.description))
        .bind(request.deadline)
        .bind(request.priority.unwrap_or_default())
        .bind(request.completed.unwrap_or(false))
        .bind(request.all_day.unwrap_or(false))
        .bind(normalized(request.address))
        .bind(request.latitude)
        .bind(request.longitude)
        .bind(task_id)
        .bind(user_id)
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(not_found());
        }

        self.get(user_id, task_id).await
    }

    pub async fn set_completed(
        &self,
        user_id: i64,
        task_id: i64,
        completed: bool,
    ) -> Result<Task, ApiError> {
        let result = sqlx::query(
            "UPDATE tasks SET completed = ?, updated_at = datetime('now') WHERE id = ? AND user_id = ?",
        )
        .bind(completed)
        .bind(task_id)
        .bind(user_id)
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(not_found());
        }

        self.get(user_id, task_id).await
    }

    /// Set or clear (`None` or blank) the linked Calendar event id
    pub async fn set_google_event_id(
        &self,
        user_id: i64,
        task_id: i64,
        event_id: Option<String>,
    ) -> Result<Task, ApiError> {
        let result = sqlx::query(
            "UPDATE tasks SET google_event_id = ?, updated_at = datetime('now') WHERE id = ? AND user_id = ?",
        )
        .bind(normalized(event_id))
        .bind(task_id)
        .bind(user_id)
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(not_found());
        }

        self.get(user_id, task_id).await
    }

    pub async fn delete(&self, user_id: i64, task_id: i64) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ? AND user_id = ?")
            .bind(task_id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(not_found());
        }

        info!(task_id = task_id, user_id = user_id, "Task deleted");
        Ok(())
    }
}
