/// Task records
///
/// Tasks live in the `tasks` collection. The assignee's display name is
/// snapshotted into `assigneeName` when the task is written, so it can drift
/// from the profile afterwards.
///
/// # Stored shape
///
/// ```json
/// {
///   "title": "Write report",
///   "description": "Quarterly numbers",
///   "assignee": "uid-123",
///   "assigneeName": "Ada",
///   "status": "in-progress",
///   "progress": 40,
///   "dueDate": "2025-03-31",
///   "feedback": "Halfway there",
///   "createdAt": "2025-03-01T09:30:00.000000Z"
/// }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{Document, StoreResult};

/// Collection holding tasks
pub const TASKS_COLLECTION: &str = "tasks";

/// Highest allowed progress value
pub const MAX_PROGRESS: u8 = 100;

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Not started
    #[default]
    Pending,

    /// Being worked on
    InProgress,

    /// Done
    Completed,
}

impl TaskStatus {
    /// Converts status to its stored string
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const ACTIVE_STATUSES: &[TaskStatus] = &[TaskStatus::Pending, TaskStatus::InProgress];
const COMPLETED_STATUSES: &[TaskStatus] = &[TaskStatus::Completed];

/// Status filter for a member's task list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskFilter {
    /// Pending or in progress
    Active,

    /// Completed only
    Completed,

    /// No status filter
    #[default]
    All,
}

impl TaskFilter {
    /// Statuses the filter admits, or `None` for no restriction
    pub fn statuses(&self) -> Option<&'static [TaskStatus]> {
        match self {
            TaskFilter::Active => Some(ACTIVE_STATUSES),
            TaskFilter::Completed => Some(COMPLETED_STATUSES),
            TaskFilter::All => None,
        }
    }
}

/// A stored task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Task id
    #[serde(skip_deserializing)]
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Assignee's user id
    pub assignee: String,

    /// Assignee display name at the time of the last admin write
    #[serde(default)]
    pub assignee_name: String,

    pub status: TaskStatus,

    /// 0 to 100
    #[serde(default)]
    pub progress: u8,

    pub due_date: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,

    /// Server-assigned creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Decodes a stored task document
    pub fn from_document(doc: &Document) -> StoreResult<Self> {
        let mut task: Task = doc.decode()?;
        task.id = doc.id.clone();
        Ok(task)
    }
}

/// Input for creating a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Assignee's user id
    pub assignee: String,

    /// Initial status, chosen by the admin
    #[serde(default)]
    pub status: TaskStatus,

    pub due_date: NaiveDate,
}

/// Admin edit of a task
///
/// Every field present overwrites the stored value. Changing the assignee
/// re-snapshots `assigneeName`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

/// Member progress report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// New progress, 0 to 100
    pub progress: u8,

    /// Optional note for the admin
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Status after a member sets progress
///
/// - reaching 100 completes the task (once)
/// - any progress below 100 moves a pending task to in progress
/// - otherwise the status is kept
///
/// Applying the same progress twice yields the same status.
pub fn derive_status(current: TaskStatus, progress: u8) -> TaskStatus {
    if progress >= MAX_PROGRESS && current != TaskStatus::Completed {
        TaskStatus::Completed
    } else if progress < MAX_PROGRESS && current == TaskStatus::Pending {
        TaskStatus::InProgress
    } else {
        current
    }
}
