/// Admin task and user access
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use chrono::NaiveDate;
/// use taskboard_shared::models::task::{NewTask, TaskStatus};
/// use taskboard_shared::repository::admin::AdminTaskRepository;
/// use taskboard_shared::store::memory::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let repo = AdminTaskRepository::new(Arc::new(MemoryStore::new()));
///
/// let task = repo
///     .create_task(NewTask {
///         title: "Write report".to_string(),
///         description: String::new(),
///         assignee: "uid-123".to_string(),
///         status: TaskStatus::Pending,
///         due_date: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
///     })
///     .await?;
/// assert_eq!(task.progress, 0);
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::{assignee_name, require, RepositoryError, RepositoryResult};
use crate::models::task::{NewTask, Task, TaskChanges, MAX_PROGRESS, TASKS_COLLECTION};
use crate::models::user::{NewProfile, Role, UserProfile};
use crate::store::{Document, DocumentStore, Fields, Query, StoreError};

/// Roster display name for profiles without a name
pub const NO_NAME: &str = "N/A";

/// A member that tasks can be assigned to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    pub id: String,
    /// Name, or email when unnamed
    pub name: String,
    pub email: String,
}

/// A roster row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: String,
    pub email: String,
    /// Name, or `"N/A"`
    pub name: String,
    pub role: Role,
    /// Tasks currently assigned to this member
    pub task_count: usize,
}

/// Task and profile access for administrators
#[derive(Clone)]
pub struct AdminTaskRepository {
    store: Arc<dyn DocumentStore>,
}

impl AdminTaskRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// All tasks, newest first
    pub async fn list_tasks(&self) -> RepositoryResult<Vec<Task>> {
        let docs = self
            .store
            .query(TASKS_COLLECTION, &Query::new().order_by_desc("createdAt"))
            .await?;

        Ok(decode_tasks(&docs))
    }

    /// Fetches one task
    pub async fn get_task(&self, id: &str) -> RepositoryResult<Task> {
        let doc = self
            .store
            .get(TASKS_COLLECTION, id)
            .await?
            .ok_or_else(|| RepositoryError::TaskNotFound(id.to_string()))?;
        Ok(Task::from_document(&doc)?)
    }

    /// Creates a task with progress 0 and a server creation time
    pub async fn create_task(&self, task: NewTask) -> RepositoryResult<Task> {
        require(&task.title, "Title")?;
        require(&task.assignee, "Assignee")?;

        let name = assignee_name(self.store.as_ref(), &task.assignee).await?;
        let fields = Fields::from_record(&task)?
            .set("assigneeName", json!(name))
            .set("progress", json!(0))
            .server_timestamp("createdAt");

        let doc = self.store.create(TASKS_COLLECTION, fields).await?;
        info!(task_id = %doc.id, assignee = %task.assignee, "Task created");
        Ok(Task::from_document(&doc)?)
    }

    /// Overwrites the given editable fields
    ///
    /// A new assignee re-snapshots `assigneeName`.
    pub async fn update_task(&self, id: &str, changes: TaskChanges) -> RepositoryResult<Task> {
        if let Some(title) = &changes.title {
            require(title, "Title")?;
        }
        if let Some(progress) = changes.progress {
            if progress > MAX_PROGRESS {
                return Err(RepositoryError::InvalidProgress(progress));
            }
        }

        let mut fields = Fields::from_record(&changes)?;
        if let Some(assignee) = &changes.assignee {
            require(assignee, "Assignee")?;
            let name = assignee_name(self.store.as_ref(), assignee).await?;
            fields = fields.set("assigneeName", json!(name));
        }

        let doc = self
            .store
            .update(TASKS_COLLECTION, id, fields)
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => {
                    RepositoryError::TaskNotFound(id.to_string())
                }
                other => other.into(),
            })?;

        info!(task_id = %id, "Task updated");
        Ok(Task::from_document(&doc)?)
    }

    /// Deletes a task permanently. Returns false if it didn't exist.
    pub async fn delete_task(&self, id: &str) -> RepositoryResult<bool> {
        let existed = self.store.delete(TASKS_COLLECTION, id).await?;
        if existed {
            info!(task_id = %id, "Task deleted");
        }
        Ok(existed)
    }

    /// Members available for assignment
    pub async fn list_assignees(&self) -> RepositoryResult<Vec<Assignee>> {
        let members = UserProfile::list_by_role(self.store.as_ref(), Role::Member).await?;

        Ok(members
            .into_iter()
            .map(|p| Assignee {
                name: p.display_name().to_string(),
                id: p.id,
                email: p.email,
            })
            .collect())
    }

    /// Members with their assigned task counts
    pub async fn roster(&self) -> RepositoryResult<Vec<RosterEntry>> {
        let members = UserProfile::list_by_role(self.store.as_ref(), Role::Member).await?;
        let tasks = self.store.query(TASKS_COLLECTION, &Query::new()).await?;

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for doc in &tasks {
            if let Some(assignee) = doc.get_str("assignee") {
                *counts.entry(assignee).or_default() += 1;
            }
        }

        Ok(members
            .into_iter()
            .map(|p| RosterEntry {
                task_count: counts.get(p.id.as_str()).copied().unwrap_or(0),
                name: p
                    .name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| NO_NAME.to_string()),
                id: p.id,
                email: p.email,
                role: p.role,
            })
            .collect())
    }

    /// Adds a profile without credentials
    pub async fn add_user(&self, profile: NewProfile) -> RepositoryResult<UserProfile> {
        require(&profile.email, "Email")?;
        let created = UserProfile::create(self.store.as_ref(), profile).await?;
        info!(user_id = %created.id, role = %created.role, "User profile added");
        Ok(created)
    }
}

pub(crate) fn decode_tasks(docs: &[Document]) -> Vec<Task> {
    docs.iter()
        .filter_map(|doc| match Task::from_document(doc) {
            Ok(task) => Some(task),
            Err(e) => {
                warn!(task_id = %doc.id, error = %e, "Skipping malformed task");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::TaskStatus;
    use crate::repository::UNKNOWN_ASSIGNEE;
    use crate::store::memory::MemoryStore;
    use chrono::NaiveDate;

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()
    }

    fn new_task(title: &str, assignee: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: "details".to_string(),
            assignee: assignee.to_string(),
            status: TaskStatus::Pending,
            due_date: due(),
        }
    }

    async fn setup() -> (AdminTaskRepository, String) {
        let repo = AdminTaskRepository::new(Arc::new(MemoryStore::new()));
        let member = repo
            .add_user(NewProfile::new("ada@example.com", Some("Ada".to_string()), Role::Member))
            .await
            .unwrap();
        (repo, member.id)
    }

    #[tokio::test]
    async fn test_create_task_defaults() {
        let (repo, member) = setup().await;
        let task = repo.create_task(new_task("Write report", &member)).await.unwrap();

        assert_eq!(task.progress, 0);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.assignee_name, "Ada");
        assert!(task.created_at.is_some());
        assert_eq!(repo.get_task(&task.id).await.unwrap(), task);
    }

    #[tokio::test]
    async fn test_create_task_unknown_assignee() {
        let (repo, _) = setup().await;
        let task = repo.create_task(new_task("Orphan", "nobody")).await.unwrap();
        assert_eq!(task.assignee_name, UNKNOWN_ASSIGNEE);
    }

    #[tokio::test]
    async fn test_create_task_requires_title_and_assignee() {
        let (repo, member) = setup().await;
        assert!(matches!(
            repo.create_task(new_task("  ", &member)).await,
            Err(RepositoryError::MissingField("Title"))
        ));
        assert!(matches!(
            repo.create_task(new_task("Title", "")).await,
            Err(RepositoryError::MissingField("Assignee"))
        ));
    }

    #[tokio::test]
    async fn test_list_tasks_newest_first() {
        let (repo, member) = setup().await;
        let first = repo.create_task(new_task("first", &member)).await.unwrap();
        let second = repo.create_task(new_task("second", &member)).await.unwrap();

        let tasks = repo.list_tasks().await.unwrap();
        let ids: Vec<_> = tasks.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_update_task_overwrites_and_renames() {
        let (repo, member) = setup().await;
        let other = repo
            .add_user(NewProfile::new("bob@example.com", None, Role::Member))
            .await
            .unwrap();
        let task = repo.create_task(new_task("Write report", &member)).await.unwrap();

        let updated = repo
            .update_task(
                &task.id,
                TaskChanges {
                    title: Some("Rewrite report".to_string()),
                    assignee: Some(other.id.clone()),
                    status: Some(TaskStatus::InProgress),
                    progress: Some(20),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Rewrite report");
        assert_eq!(updated.assignee, other.id);
        assert_eq!(updated.assignee_name, "bob@example.com");
        assert_eq!(updated.status, TaskStatus::InProgress);
        assert_eq!(updated.progress, 20);
        assert_eq!(updated.description, "details");
        assert_eq!(updated.created_at, task.created_at);
    }

    #[tokio::test]
    async fn test_update_missing_task() {
        let (repo, _) = setup().await;
        assert!(matches!(
            repo.update_task("nope", TaskChanges::default()).await,
            Err(RepositoryError::TaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_rejects_progress_over_100() {
        let (repo, member) = setup().await;
        let task = repo.create_task(new_task("t", &member)).await.unwrap();
        let changes = TaskChanges {
            progress: Some(101),
            ..Default::default()
        };
        assert!(matches!(
            repo.update_task(&task.id, changes).await,
            Err(RepositoryError::InvalidProgress(101))
        ));
    }

    #[tokio::test]
    async fn test_delete_task() {
        let (repo, member) = setup().await;
        let task = repo.create_task(new_task("t", &member)).await.unwrap();

        assert!(repo.delete_task(&task.id).await.unwrap());
        assert!(!repo.delete_task(&task.id).await.unwrap());
        assert!(repo.list_tasks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_roster_counts_tasks() {
        let (repo, member) = setup().await;
        let unnamed = repo
            .add_user(NewProfile::new("bob@example.com", None, Role::Member))
            .await
            .unwrap();
        repo.add_user(NewProfile::new("boss@example.com", None, Role::Admin))
            .await
            .unwrap();
        repo.create_task(new_task("a", &member)).await.unwrap();
        repo.create_task(new_task("b", &member)).await.unwrap();

        let mut roster = repo.roster().await.unwrap();
        roster.sort_by(|a, b| a.email.cmp(&b.email));

        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].name, "Ada");
        assert_eq!(roster[0].task_count, 2);
        assert_eq!(roster[1].id, unnamed.id);
        assert_eq!(roster[1].name, NO_NAME);
        assert_eq!(roster[1].task_count, 0);
    }

    #[tokio::test]
    async fn test_list_assignees_uses_display_name() {
        let (repo, _) = setup().await;
        repo.add_user(NewProfile::new("bob@example.com", None, Role::Member))
            .await
            .unwrap();

        let mut names: Vec<_> = repo
            .list_assignees()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["Ada".to_string(), "bob@example.com".to_string()]);
    }
}
