/// Identity provider boundary
///
/// [`AuthProvider`] is the credential side of authentication: it creates
/// accounts, checks passwords and tracks which sessions are active. It knows
/// nothing about roles; those live in user profiles and are joined in by the
/// session resolver.
///
/// [`StoreAuthProvider`] keeps credentials in the document store's private
/// `credentials` collection, keyed by lower-cased email, and active sessions
/// in memory. A session lives as long as the token issued for it
/// ([`DEFAULT_SESSION_TTL_HOURS`] unless set with
/// [`StoreAuthProvider::with_session_ttl`]); expired sessions are treated as
/// ended and pruned on the next sign-in.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskboard_shared::auth::provider::{AuthProvider, StoreAuthProvider};
/// use taskboard_shared::auth::password::PasswordParams;
/// use taskboard_shared::store::memory::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = StoreAuthProvider::new(Arc::new(MemoryStore::new()), PasswordParams::default());
///
/// let session = provider.sign_up("ada@example.com", "hunter22").await?;
/// assert!(provider.session(session.token_id).await.is_some());
///
/// provider.sign_out(session.token_id).await?;
/// assert!(provider.session(session.token_id).await.is_none());
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::password::{hash_password, verify_password, PasswordParams};
use crate::store::{generate_document_id, DocumentStore, Fields, StoreError};

/// Collection holding credentials. Not exposed through any repository.
pub const CREDENTIALS_COLLECTION: &str = "credentials";

/// Shortest accepted password
pub const MIN_PASSWORD_LEN: usize = 6;

/// Session lifetime when none is configured
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// An authenticated identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Session {
    /// User id; also the id of the user's profile
    pub uid: String,

    /// Email the user signed in with
    pub email: String,

    /// Identifies this particular sign-in
    pub token_id: Uuid,
}

/// Authentication failure
///
/// The `Display` text is meant to be shown to the user as is.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email already in use")]
    EmailInUse,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Password should be at least 6 characters")]
    WeakPassword,

    #[error("Authentication service unavailable")]
    Unavailable(#[source] StoreError),

    #[error("Authentication failed")]
    Internal(String),
}

/// Credential operations
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Creates an account and signs it in
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Checks credentials and starts a session
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Ends a session. Ending an unknown session is not an error.
    async fn sign_out(&self, token_id: Uuid) -> Result<(), AuthError>;

    /// Looks up an active session
    async fn session(&self, token_id: Uuid) -> Option<Session>;
}

/// Stored credential record
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Credential {
    uid: String,
    email: String,
    password_hash: String,
}

#[derive(Debug)]
struct ActiveSession {
    session: Session,
    expires_at: DateTime<Utc>,
}

impl ActiveSession {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// [`AuthProvider`] backed by the document store
pub struct StoreAuthProvider {
    store: Arc<dyn DocumentStore>,
    params: PasswordParams,
    session_ttl: Duration,
    sessions: RwLock<HashMap<Uuid, ActiveSession>>,
}

impl StoreAuthProvider {
    /// Creates a provider over a store
    pub fn new(store: Arc<dyn DocumentStore>, params: PasswordParams) -> Self {
        Self {
            store,
            params,
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Sets how long a session stays active; match the token lifetime
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Number of tracked sessions, including expired ones not yet pruned
    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn start_session(&self, uid: String, email: String) -> Session {
        let now = Utc::now();
        let session = Session {
            uid,
            email,
            token_id: Uuid::new_v4(),
        };

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, active| !active.is_expired(now));
        let pruned = before - sessions.len();
        if pruned > 0 {
            debug!(pruned, "Pruned expired sessions");
        }

        sessions.insert(
            session.token_id,
            ActiveSession {
                session: session.clone(),
                expires_at: now + self.session_ttl,
            },
        );
        session
    }
}

fn credential_key(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_email(email: &str) -> Result<(), AuthError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AuthError::InvalidEmail),
    }
}

#[async_trait]
impl AuthProvider for StoreAuthProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        check_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let key = credential_key(email);
        let existing = self
            .store
            .get(CREDENTIALS_COLLECTION, &key)
            .await
            .map_err(AuthError::Unavailable)?;
        if existing.is_some() {
            debug!(email = %key, "Sign-up rejected: email in use");
            return Err(AuthError::EmailInUse);
        }

        let password_hash = hash_password(password, &self.params)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let credential = Credential {
            uid: generate_document_id(),
            email: email.trim().to_string(),
            password_hash,
        };
        let fields = Fields::from_record(&credential)
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .server_timestamp("createdAt");

        self.store
            .set(CREDENTIALS_COLLECTION, &key, fields)
            .await
            .map_err(AuthError::Unavailable)?;

        info!(user_id = %credential.uid, "Account created");
        Ok(self.start_session(credential.uid, credential.email).await)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let key = credential_key(email);
        let doc = self
            .store
            .get(CREDENTIALS_COLLECTION, &key)
            .await
            .map_err(AuthError::Unavailable)?
            .ok_or(AuthError::InvalidCredentials)?;

        let credential: Credential = doc.decode().map_err(|e| {
            warn!(email = %key, error = %e, "Malformed credential record");
            AuthError::Internal(e.to_string())
        })?;

        let valid = verify_password(password, &credential.password_hash)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        if !valid {
            debug!(email = %key, "Sign-in rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = %credential.uid, "Signed in");
        Ok(self.start_session(credential.uid, credential.email).await)
    }

    async fn sign_out(&self, token_id: Uuid) -> Result<(), AuthError> {
        if let Some(active) = self.sessions.write().await.remove(&token_id) {
            info!(user_id = %active.session.uid, "Signed out");
        }
        Ok(())
    }

    async fn session(&self, token_id: Uuid) -> Option<Session> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(&token_id) {
                None => return None,
                Some(active) if !active.is_expired(now) => return Some(active.session.clone()),
                Some(_) => {}
            }
        }

        let mut sessions = self.sessions.write().await;
        if sessions
            .get(&token_id)
            .is_some_and(|active| active.is_expired(now))
        {
            if let Some(expired) = sessions.remove(&token_id) {
                debug!(user_id = %expired.session.uid, "Session expired");
            }
        }
        None
    }
}
