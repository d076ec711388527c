/// Dashboard summaries
///
/// Counts shown at the top of each dashboard. Both read the store directly
/// rather than going through the ordered task listings, so tasks that are
/// still missing a creation time are counted too.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::provider::Session;
use crate::models::task::{TaskStatus, TASKS_COLLECTION};
use crate::models::user::{Role, USERS_COLLECTION};
use crate::store::{Document, DocumentStore, Query, StoreResult};

/// Task counts by status
///
/// Tasks with an unrecognised status count towards `total` only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCounts {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl TaskCounts {
    /// Tallies task documents by their `status` field
    pub fn tally<'a>(docs: impl IntoIterator<Item = &'a Document>) -> Self {
        let mut counts = TaskCounts::default();
        for doc in docs {
            counts.total += 1;
            match doc.get_str("status") {
                Some(s) if s == TaskStatus::Pending.as_str() => counts.pending += 1,
                Some(s) if s == TaskStatus::InProgress.as_str() => counts.in_progress += 1,
                Some(s) if s == TaskStatus::Completed.as_str() => counts.completed += 1,
                _ => {}
            }
        }
        counts
    }
}

/// Admin dashboard header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSummary {
    /// Every task in the system
    pub total_tasks: usize,

    /// Profiles with the member role
    pub total_members: usize,
}

impl AdminSummary {
    pub async fn load(store: &dyn DocumentStore) -> StoreResult<Self> {
        let tasks = store.query(TASKS_COLLECTION, &Query::new()).await?;
        let members = store
            .query(
                USERS_COLLECTION,
                &Query::new().where_eq("role", json!(Role::Member.as_str())),
            )
            .await?;

        Ok(Self {
            total_tasks: tasks.len(),
            total_members: members.len(),
        })
    }
}

/// Member dashboard header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummary {
    pub email: String,

    #[serde(flatten)]
    pub counts: TaskCounts,
}

impl MemberSummary {
    pub async fn load(store: &dyn DocumentStore, session: &Session) -> StoreResult<Self> {
        let tasks = store
            .query(
                TASKS_COLLECTION,
                &Query::new().where_eq("assignee", json!(session.uid)),
            )
            .await?;

        Ok(Self {
            email: session.email.clone(),
            counts: TaskCounts::tally(&tasks),
        })
    }
}
