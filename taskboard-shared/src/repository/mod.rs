/// Task and user repositories
///
/// Thin facades over the document store, one per role:
///
/// - [`admin::AdminTaskRepository`]: every task and every profile
/// - [`member::MemberTaskRepository`]: bound to one session, sees only the
///   tasks assigned to it
///
/// Repositories don't check roles themselves; callers reach them through
/// the route guard. Each call is one independent read or write with no
/// retries, and concurrent writes to the same task are last-write-wins.

pub mod admin;
pub mod member;

use crate::models::user::{Role, UserProfile};
use crate::store::{DocumentStore, StoreError, StoreResult};

/// Assignee name recorded when the assignee isn't a known member
pub const UNKNOWN_ASSIGNEE: &str = "Unknown";

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// No task with this id
    #[error("Task {0} not found")]
    TaskNotFound(String),

    /// The task isn't assigned to the caller
    #[error("Task {0} is not assigned to you")]
    NotAssignee(String),

    /// Progress outside 0..=100
    #[error("Progress must be between 0 and 100, got {0}")]
    InvalidProgress(u8),

    /// A required field is empty
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Repository result type alias
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Snapshot of a member's display name for `assigneeName`
///
/// Only member profiles can be assignees; anything else is recorded as
/// [`UNKNOWN_ASSIGNEE`].
pub(crate) async fn assignee_name(store: &dyn DocumentStore, uid: &str) -> StoreResult<String> {
    Ok(match UserProfile::find(store, uid).await {
        Ok(Some(profile)) if profile.role == Role::Member => profile.display_name().to_string(),
        Ok(_) => UNKNOWN_ASSIGNEE.to_string(),
        Err(StoreError::Serialization(_) | StoreError::Malformed { .. }) => {
            UNKNOWN_ASSIGNEE.to_string()
        }
        Err(e) => return Err(e),
    })
}

pub(crate) fn require(value: &str, field: &'static str) -> RepositoryResult<()> {
    if value.trim().is_empty() {
        return Err(RepositoryError::MissingField(field));
    }
    Ok(())
}
