/// Member endpoints
///
/// Guarded for the member role. The repository is bound to the caller's
/// session, so members only ever see and touch their own tasks.
///
/// - `GET /v1/member/tasks?filter=active|completed|all`
/// - `PUT /v1/member/tasks/:id/progress`

use crate::{app::AppState, error::ApiResult, middleware::guard::CurrentUser};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use taskboard_shared::{
    models::task::{ProgressUpdate, Task, TaskFilter},
    repository::member::MemberTaskRepository,
};
use validator::Validate;

/// Query string for the task list
#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    /// Default: all
    #[serde(default)]
    pub filter: TaskFilter,
}

/// Progress report
#[derive(Debug, Deserialize, Validate)]
pub struct ProgressRequest {
    #[validate(range(max = 100, message = "Progress must be between 0 and 100"))]
    pub progress: u8,

    #[validate(length(max = 2000, message = "Feedback must be at most 2000 characters"))]
    pub feedback: Option<String>,
}

fn repository(state: &AppState, user: CurrentUser) -> MemberTaskRepository {
    MemberTaskRepository::new(state.store.clone(), user.session)
}

/// `GET /v1/member/tasks`
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = repository(&state, user).list_tasks(query.filter).await?;
    Ok(Json(tasks))
}

/// `PUT /v1/member/tasks/:id/progress`
///
/// ```json
/// { "progress": 100, "feedback": "Done" }
/// ```
///
/// The status follows the progress: 100 completes the task, anything lower
/// moves a pending task to in progress.
///
/// # Errors
///
/// - `403 Forbidden`: the task is assigned to someone else
/// - `404 Not Found`: no such task
/// - `422 Unprocessable Entity`: progress above 100
pub async fn update_progress(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<ProgressRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;

    let task = repository(&state, user)
        .update_progress(
            &id,
            ProgressUpdate {
                progress: req.progress,
                feedback: req.feedback,
            },
        )
        .await?;

    Ok(Json(task))
}
