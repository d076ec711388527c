/// User profiles and roles
///
/// One profile per user, stored in the `users` collection under the user's
/// session id. The profile is the application's only record of a user's role.
///
/// # Stored shape
///
/// ```json
/// { "email": "ada@example.com", "name": "Ada", "role": "member", "createdAt": "2025-01-01T09:30:00.000000Z" }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::store::{Document, DocumentStore, Fields, Query, StoreResult};

/// Collection holding user profiles
pub const USERS_COLLECTION: &str = "users";

/// Application role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Creates, edits, assigns and deletes tasks
    Admin,

    /// Works on tasks assigned to them
    Member,
}

impl Role {
    /// Converts role to its stored string
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }

    /// Parses a stored role string
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Role::Admin),
            "member" => Some(Role::Member),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Profile id (the owning session's user id)
    #[serde(skip_deserializing)]
    pub id: String,

    /// Email address
    pub email: String,

    /// Optional display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Role
    pub role: Role,

    /// Server-assigned creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Input for creating a profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProfile {
    /// Email address
    pub email: String,

    /// Optional display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Role
    pub role: Role,
}

impl NewProfile {
    /// Builds a profile input, dropping blank names
    pub fn new(email: impl Into<String>, name: Option<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            name: name.filter(|n| !n.trim().is_empty()),
            role,
        }
    }

    fn into_fields(self) -> StoreResult<Fields> {
        Ok(Fields::from_record(&self)?.server_timestamp("createdAt"))
    }
}

impl UserProfile {
    /// Decodes a stored profile document
    ///
    /// Fails if the body doesn't have the profile shape, which includes an
    /// unrecognised role string.
    pub fn from_document(doc: &Document) -> StoreResult<Self> {
        let mut profile: UserProfile = doc.decode()?;
        profile.id = doc.id.clone();
        Ok(profile)
    }

    /// Display name: the name if set, the email otherwise
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.email,
        }
    }

    /// Finds the profile for a user id
    pub async fn find(store: &dyn DocumentStore, uid: &str) -> StoreResult<Option<Self>> {
        store
            .get(USERS_COLLECTION, uid)
            .await?
            .map(|doc| Self::from_document(&doc))
            .transpose()
    }

    /// Writes the profile for a known user id (sign-up)
    pub async fn create_with_id(
        store: &dyn DocumentStore,
        uid: &str,
        profile: NewProfile,
    ) -> StoreResult<Self> {
        let doc = store
            .set(USERS_COLLECTION, uid, profile.into_fields()?)
            .await?;
        Self::from_document(&doc)
    }

    /// Creates a profile with a generated id (admin "add user")
    pub async fn create(store: &dyn DocumentStore, profile: NewProfile) -> StoreResult<Self> {
        let doc = store
            .create(USERS_COLLECTION, profile.into_fields()?)
            .await?;
        Self::from_document(&doc)
    }

    /// Lists profiles with a given role
    ///
    /// Documents that don't decode as profiles are skipped.
    pub async fn list_by_role(store: &dyn DocumentStore, role: Role) -> StoreResult<Vec<Self>> {
        let docs = store
            .query(
                USERS_COLLECTION,
                &Query::new().where_eq("role", json!(role.as_str())),
            )
            .await?;

        Ok(docs
            .iter()
            .filter_map(|doc| match Self::from_document(doc) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    tracing::warn!(profile_id = %doc.id, error = %e, "Skipping malformed profile");
                    None
                }
            })
            .collect())
    }
}
