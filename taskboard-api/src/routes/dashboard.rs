/// Dashboard pages
///
/// - `GET /admin/dashboard` - task and member totals with every task
/// - `GET /member/dashboard` - the member's task counts and own tasks
///
/// Both sit behind page guards: a caller with the wrong role (or no session)
/// gets `303 See Other` to the route the guard picked instead of an error.

use crate::{app::AppState, error::ApiResult, middleware::guard::CurrentUser};
use axum::{extract::State, Extension, Json};
use serde::Serialize;
use taskboard_shared::{
    dashboard::{AdminSummary, MemberSummary},
    models::task::{Task, TaskFilter},
    repository::member::MemberTaskRepository,
};

/// Admin dashboard body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    #[serde(flatten)]
    pub summary: AdminSummary,

    /// Newest first
    pub tasks: Vec<Task>,
}

/// Member dashboard body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDashboard {
    #[serde(flatten)]
    pub summary: MemberSummary,

    /// Own tasks, newest first
    pub tasks: Vec<Task>,
}

/// `GET /admin/dashboard`
pub async fn admin_dashboard(State(state): State<AppState>) -> ApiResult<Json<AdminDashboard>> {
    let summary = AdminSummary::load(state.store.as_ref()).await?;
    let tasks = state.admin_tasks().list_tasks().await?;

    Ok(Json(AdminDashboard { summary, tasks }))
}

/// `GET /member/dashboard`
pub async fn member_dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<MemberDashboard>> {
    let summary = MemberSummary::load(state.store.as_ref(), &user.session).await?;
    let tasks = MemberTaskRepository::new(state.store.clone(), user.session)
        .list_tasks(TaskFilter::All)
        .await?;

    Ok(Json(MemberDashboard { summary, tasks }))
}
