//! Task endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    routing::{get, put},
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use organizer_core::model::{Priority, TaskStatus, TodoDraft, TodoItem};
use organizer_core::store::TodoFilter;

use crate::routes::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", put(update_task))
}

/// POST /tasks - create a todo
async fn create_task(
    State(state): State<AppState>,
    uri: Uri,
    Json(draft): Json<TodoDraft>,
) -> Result<(StatusCode, Json<TodoItem>), ApiError> {
    let todo = TodoItem::new(draft).map_err(|e| ApiError::from_error(e.into(), uri.path()))?;
    state
        .store
        .create_todo(&todo)
        .map_err(|e| ApiError::from_error(e, uri.path()))?;
    Ok((StatusCode::CREATED, Json(todo)))
}

#[derive(Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub limit: Option<usize>,
}

/// GET /tasks - list todos with optional status/priority filters
async fn list_tasks(
    State(state): State<AppState>,
    uri: Uri,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Vec<TodoItem>>, ApiError> {
    let mut filter = TodoFilter {
        limit: query.limit,
        ..Default::default()
    };
    if let Some(status) = query.status.as_deref() {
        filter.status = Some(
            TaskStatus::parse(status).map_err(|e| ApiError::from_error(e.into(), uri.path()))?,
        );
    }
    if let Some(priority) = query.priority.as_deref() {
        filter.priority = Some(
            Priority::parse(priority).map_err(|e| ApiError::from_error(e.into(), uri.path()))?,
        );
    }

    let todos = state
        .store
        .list_todos(&filter)
        .map_err(|e| ApiError::from_error(e, uri.path()))?;
    Ok(Json(todos))
}

/// PUT /tasks/:id - replace a todo's fields
async fn update_task(
    State(state): State<AppState>,
    uri: Uri,
    Path(id): Path<Uuid>,
    Json(draft): Json<TodoDraft>,
) -> Result<Json<TodoItem>, ApiError> {
    let existing = state
        .store
        .get_todo(id)
        .map_err(|e| ApiError::from_error(e, uri.path()))?
        .ok_or_else(|| ApiError::not_found("Task", uri.path()))?;

    let mut todo = TodoItem::new(draft).map_err(|e| ApiError::from_error(e.into(), uri.path()))?;
    todo.id = existing.id;
    todo.created_at = existing.created_at;
    todo.updated_at = Utc::now();

    let updated = state
        .store
        .update_todo(&todo)
        .map_err(|e| ApiError::from_error(e, uri.path()))?;
    if !updated {
        return Err(ApiError::not_found("Task", uri.path()));
    }
    Ok(Json(todo))
}
