/// Member task access
///
/// A [`MemberTaskRepository`] is bound to one session and only ever reads or
/// writes tasks whose `assignee` is that session's user id.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use super::admin::decode_tasks;
use super::{RepositoryError, RepositoryResult};
use crate::auth::provider::Session;
use crate::models::task::{
    derive_status, ProgressUpdate, Task, TaskFilter, MAX_PROGRESS, TASKS_COLLECTION,
};
use crate::session::handle::SessionHandle;
use crate::store::{DocumentStore, Fields, Query};

/// Tasks assigned to one member
#[derive(Clone)]
pub struct MemberTaskRepository {
    store: Arc<dyn DocumentStore>,
    session: Session,
}

impl MemberTaskRepository {
    /// Binds a repository to a session
    pub fn new(store: Arc<dyn DocumentStore>, session: Session) -> Self {
        Self { store, session }
    }

    /// Binds a repository to a handle's current session, if signed in
    pub fn for_handle(handle: &SessionHandle) -> Option<Self> {
        handle
            .current()
            .map(|session| Self::new(handle.store().clone(), session))
    }

    /// The session this repository acts for
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Own tasks matching the filter, newest first
    pub async fn list_tasks(&self, filter: TaskFilter) -> RepositoryResult<Vec<Task>> {
        let mut query = Query::new().where_eq("assignee", json!(self.session.uid));
        if let Some(statuses) = filter.statuses() {
            query = query.where_in(
                "status",
                statuses.iter().map(|s| json!(s.as_str())).collect(),
            );
        }

        let docs = self
            .store
            .query(TASKS_COLLECTION, &query.order_by_desc("createdAt"))
            .await?;

        debug!(user_id = %self.session.uid, ?filter, count = docs.len(), "Listed member tasks");
        Ok(decode_tasks(&docs))
    }

    /// Sets progress and feedback on an own task, deriving the new status
    pub async fn update_progress(
        &self,
        task_id: &str,
        update: ProgressUpdate,
    ) -> RepositoryResult<Task> {
        if update.progress > MAX_PROGRESS {
            return Err(RepositoryError::InvalidProgress(update.progress));
        }

        let doc = self
            .store
            .get(TASKS_COLLECTION, task_id)
            .await?
            .ok_or_else(|| RepositoryError::TaskNotFound(task_id.to_string()))?;
        let task = Task::from_document(&doc)?;

        if task.assignee != self.session.uid {
            return Err(RepositoryError::NotAssignee(task_id.to_string()));
        }

        let status = derive_status(task.status, update.progress);
        let mut fields = Fields::new()
            .set("progress", json!(update.progress))
            .set("status", json!(status.as_str()));
        if let Some(feedback) = update.feedback {
            fields = fields.set("feedback", json!(feedback));
        }

        let doc = self.store.update(TASKS_COLLECTION, task_id, fields).await?;
        info!(
            task_id = %task_id,
            user_id = %self.session.uid,
            progress = update.progress,
            status = %status,
            "Task progress updated"
        );
        Ok(Task::from_document(&doc)?)
    }
}
