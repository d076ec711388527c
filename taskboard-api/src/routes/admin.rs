/// Admin endpoints
///
/// Every route here is guarded for the admin role.
///
/// - `GET /v1/admin/tasks` - all tasks, newest first
/// - `POST /v1/admin/tasks` - create a task
/// - `PUT /v1/admin/tasks/:id` - overwrite editable fields
/// - `DELETE /v1/admin/tasks/:id` - delete a task
/// - `GET /v1/admin/users` - member roster with task counts
/// - `POST /v1/admin/users` - add a profile (no credentials)
/// - `GET /v1/admin/assignees` - members tasks can be assigned to

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::guard::CurrentUser,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    models::{
        task::{NewTask, Task, TaskChanges, TaskStatus},
        user::{NewProfile, Role, UserProfile},
    },
    repository::admin::{Assignee, RosterEntry},
};
use tracing::info;
use validator::Validate;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: String,

    /// Assignee's user id
    #[validate(length(min = 1, message = "Assignee is required"))]
    pub assignee: String,

    #[serde(default)]
    pub status: TaskStatus,

    /// `YYYY-MM-DD`
    pub due_date: NaiveDate,
}

/// Update task request; absent fields are left alone
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[validate(length(min = 1, message = "Assignee is required"))]
    pub assignee: Option<String>,

    pub status: Option<TaskStatus>,

    #[validate(range(max = 100, message = "Progress must be between 0 and 100"))]
    pub progress: Option<u8>,

    pub due_date: Option<NaiveDate>,
}

/// Add user request
#[derive(Debug, Deserialize, Validate)]
pub struct AddUserRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    /// Default: member
    pub role: Option<Role>,
}

/// Delete response
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// `GET /v1/admin/tasks`
pub async fn list_tasks(State(state): State<AppState>) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.admin_tasks().list_tasks().await?))
}

/// `POST /v1/admin/tasks`
///
/// ```json
/// {
///   "title": "Write report",
///   "description": "Quarterly numbers",
///   "assignee": "<member uid>",
///   "status": "pending",
///   "dueDate": "2025-03-01"
/// }
/// ```
///
/// Answers `201 Created` with the stored task: progress 0, the assignee's
/// display name snapshotted, and a server creation time.
pub async fn create_task(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    let task = state
        .admin_tasks()
        .create_task(NewTask {
            title: req.title,
            description: req.description,
            assignee: req.assignee,
            status: req.status,
            due_date: req.due_date,
        })
        .await?;

    info!(task_id = %task.id, admin = %user.session.uid, "Admin created task");

    Ok((StatusCode::CREATED, Json(task)))
}

/// `PUT /v1/admin/tasks/:id`
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;

    let task = state
        .admin_tasks()
        .update_task(
            &id,
            TaskChanges {
                title: req.title,
                description: req.description,
                assignee: req.assignee,
                status: req.status,
                progress: req.progress,
                due_date: req.due_date,
            },
        )
        .await?;

    Ok(Json(task))
}

/// `DELETE /v1/admin/tasks/:id`
///
/// Deleting a task that doesn't exist answers `404 Not Found`.
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    if !state.admin_tasks().delete_task(&id).await? {
        return Err(ApiError::NotFound(format!("Task {} not found", id)));
    }

    Ok(Json(DeleteResponse { deleted: true }))
}

/// `GET /v1/admin/users`
pub async fn list_members(State(state): State<AppState>) -> ApiResult<Json<Vec<RosterEntry>>> {
    Ok(Json(state.admin_tasks().roster().await?))
}

/// `POST /v1/admin/users`
///
/// Creates a profile record only; the user still has to sign up to get
/// credentials.
pub async fn add_user(
    State(state): State<AppState>,
    Json(req): Json<AddUserRequest>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    req.validate()?;

    let profile = state
        .admin_tasks()
        .add_user(NewProfile::new(
            req.email.trim(),
            req.name,
            req.role.unwrap_or(Role::Member),
        ))
        .await?;

    Ok((StatusCode::CREATED, Json(profile)))
}

/// `GET /v1/admin/assignees`
pub async fn list_assignees(State(state): State<AppState>) -> ApiResult<Json<Vec<Assignee>>> {
    Ok(Json(state.admin_tasks().list_assignees().await?))
}
