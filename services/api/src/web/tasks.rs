//! services/api/src/web/tasks.rs
//!
//! REST handlers for the to-do task lifecycle: create, list, start,
//! complete, delete, and the running countdown.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_group_core::domain::{Task, TaskOrder, TaskSortKey};
use study_group_core::timer::{format_remaining, reminder_at};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::web::middleware::CurrentUser;
use crate::web::progress::ProgressResponse;
use crate::web::rest::{failure, Failure};
use crate::web::state::AppState;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    pub title: String,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    CreatedAt,
    Title,
    Duration,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListTasksQuery {
    /// Field to sort by; newest first by creation time when omitted.
    pub sort: Option<SortField>,
    pub ascending: Option<bool>,
}

impl ListTasksQuery {
    fn order(&self) -> TaskOrder {
        let key = match self.sort {
            Some(SortField::CreatedAt) | None => TaskSortKey::CreatedAt,
            Some(SortField::Title) => TaskSortKey::Title,
            Some(SortField::Duration) => TaskSortKey::Duration,
        };
        TaskOrder {
            key,
            ascending: self.ascending.unwrap_or(false),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TaskResponse {
    pub id: Uuid,
    pub title: String,
    pub duration_minutes: u32,
    /// One of `pending`, `in_progress`, `completed`.
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            duration_minutes: task.duration_minutes,
            status: task.status.as_str().to_string(),
            created_at: task.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StartTaskResponse {
    pub task: TaskResponse,
    pub remaining_secs: u64,
    /// When the "5 minutes remaining" reminder is due; absent for short tasks.
    pub reminder_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, ToSchema)]
pub struct CompletionResponse {
    pub xp_earned: u64,
    pub progress: ProgressResponse,
}

#[derive(Serialize, ToSchema)]
pub struct CountdownResponse {
    pub task_id: Uuid,
    pub remaining_secs: u64,
    /// `m:ss`
    pub display: String,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the current user's tasks.
#[utoipa::path(
    get,
    path = "/tasks",
    params(ListTasksQuery),
    responses(
        (status = 200, description = "The user's tasks", body = [TaskResponse]),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn list_tasks_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Vec<TaskResponse>>, Failure> {
    let tasks = state
        .service
        .list_tasks(user_id, query.order())
        .await
        .map_err(|e| failure("load tasks", e))?;
    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

/// Add a pending task.
#[utoipa::path(
    post,
    path = "/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "Empty title or non-positive duration"),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn create_task_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, Failure> {
    let task = state
        .service
        .add_task(user_id, &req.title, req.duration_minutes)
        .await
        .map_err(|e| failure("add task", e))?;
    Ok((StatusCode::CREATED, Json(TaskResponse::from(task))))
}

/// Start a task's countdown. Any other running countdown is replaced.
#[utoipa::path(
    post,
    path = "/tasks/{id}/start",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Countdown started", body = StartTaskResponse),
        (status = 404, description = "No such task"),
        (status = 409, description = "Task already completed")
    )
)]
pub async fn start_task_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<StartTaskResponse>, Failure> {
    let task = state
        .service
        .start_task(user_id, task_id)
        .await
        .map_err(|e| failure("start task", e))?;

    state
        .countdowns
        .start(state.service.clone(), user_id, &task);

    Ok(Json(StartTaskResponse {
        remaining_secs: u64::from(task.duration_minutes) * 60,
        reminder_at: reminder_at(Utc::now(), task.duration_minutes),
        task: task.into(),
    }))
}

/// Complete a task by hand and collect its XP.
#[utoipa::path(
    post,
    path = "/tasks/{id}/complete",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task completed", body = CompletionResponse),
        (status = 404, description = "No such task"),
        (status = 409, description = "Task already completed"),
        (status = 500, description = "Progress could not be saved; the task stays open")
    )
)]
pub async fn complete_task_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<CompletionResponse>, Failure> {
    let completion = state
        .service
        .complete_task_with_progress(user_id, task_id)
        .await
        .map_err(|e| failure("complete task", e))?;
    state.countdowns.stop(user_id, task_id);

    Ok(Json(CompletionResponse {
        xp_earned: completion.xp_earned,
        progress: completion.progress.into(),
    }))
}

/// Delete a task in any state.
#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 404, description = "No such task")
    )
)]
pub async fn delete_task_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(task_id): Path<Uuid>,
) -> Result<StatusCode, Failure> {
    state
        .service
        .delete_task(user_id, task_id)
        .await
        .map_err(|e| failure("delete task", e))?;
    state.countdowns.stop(user_id, task_id);
    Ok(StatusCode::NO_CONTENT)
}

/// The current user's running countdown.
#[utoipa::path(
    get,
    path = "/timer",
    responses(
        (status = 200, description = "A countdown is running", body = CountdownResponse),
        (status = 204, description = "No countdown is running")
    )
)]
pub async fn countdown_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Response {
    match state.countdowns.current(user_id) {
        Some(countdown) => Json(CountdownResponse {
            task_id: countdown.task_id,
            remaining_secs: countdown.remaining_secs,
            display: format_remaining(countdown.remaining_secs),
        })
        .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
