/// Session resolution
///
/// Joins the auth provider's current session with the user's profile to
/// produce a [`SessionState`]. [`resolve_session`] does this once;
/// [`SessionResolver`] does it continuously for a stream of session changes
/// and publishes the result on a `watch` channel.
///
/// # State
///
/// ```text
/// Suspended ──first session event resolved──▶ Unauthenticated
///                                           ├▶ Authorized { session, role }
///                                           └▶ Unauthorized { session, reason }
/// ```
///
/// Once resolved, the state never goes back to `Suspended`. Later session
/// changes replace the state only after their own lookup completes.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::provider::Session;
use crate::models::user::{Role, UserProfile};
use crate::store::{DocumentStore, StoreError};

/// Why an authenticated session has no role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthorizedReason {
    /// No profile is stored for the user
    ProfileNotFound,

    /// A profile exists but doesn't decode (e.g. unknown role)
    InvalidProfile,

    /// The store couldn't be read
    LookupFailed,
}

/// Resolved session and role
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// The first session event hasn't been resolved yet
    Suspended,

    /// Nobody is signed in
    Unauthenticated,

    /// Signed in with a known role
    Authorized { session: Session, role: Role },

    /// Signed in, but no role could be determined
    Unauthorized {
        session: Session,
        reason: UnauthorizedReason,
    },
}

impl SessionState {
    /// True until the first session event is resolved
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Suspended)
    }

    /// The signed-in session, if any
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authorized { session, .. } | SessionState::Unauthorized { session, .. } => {
                Some(session)
            }
            SessionState::Suspended | SessionState::Unauthenticated => None,
        }
    }

    /// The resolved role, if any
    pub fn role(&self) -> Option<Role> {
        match self {
            SessionState::Authorized { role, .. } => Some(*role),
            _ => None,
        }
    }
}

/// Resolves one session against the profile store
///
/// A failed lookup is logged and yields `Unauthorized`; it never falls back
/// to a role.
pub async fn resolve_session(store: &dyn DocumentStore, session: Option<Session>) -> SessionState {
    let Some(session) = session else {
        return SessionState::Unauthenticated;
    };

    match UserProfile::find(store, &session.uid).await {
        Ok(Some(profile)) => SessionState::Authorized {
            role: profile.role,
            session,
        },
        Ok(None) => {
            debug!(user_id = %session.uid, "No profile for session");
            SessionState::Unauthorized {
                session,
                reason: UnauthorizedReason::ProfileNotFound,
            }
        }
        Err(e @ (StoreError::Serialization(_) | StoreError::Malformed { .. })) => {
            warn!(user_id = %session.uid, error = %e, "Stored profile is invalid");
            SessionState::Unauthorized {
                session,
                reason: UnauthorizedReason::InvalidProfile,
            }
        }
        Err(e) => {
            warn!(user_id = %session.uid, error = %e, "Error fetching user role");
            SessionState::Unauthorized {
                session,
                reason: UnauthorizedReason::LookupFailed,
            }
        }
    }
}

/// Background resolver for a stream of session changes
///
/// The current value of the session channel counts as the first event. Each
/// change triggers a profile lookup; a change that arrives while a lookup is
/// in flight supersedes it and the stale result is never published.
///
/// Dropping the resolver (or calling [`SessionResolver::stop`]) ends the
/// subscription and discards any in-flight lookup.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tokio::sync::watch;
/// use taskboard_shared::session::resolver::{SessionResolver, SessionState};
/// use taskboard_shared::store::memory::MemoryStore;
///
/// # async fn example() {
/// let (_sessions, rx) = watch::channel(None);
/// let resolver = SessionResolver::spawn(Arc::new(MemoryStore::new()), rx);
///
/// assert_eq!(resolver.resolved().await, SessionState::Unauthenticated);
/// # }
/// ```
pub struct SessionResolver {
    state: watch::Receiver<SessionState>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SessionResolver {
    /// Starts resolving the given session stream
    pub fn spawn(
        store: Arc<dyn DocumentStore>,
        sessions: watch::Receiver<Option<Session>>,
    ) -> Self {
        let (tx, state) = watch::channel(SessionState::Suspended);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(store, sessions, tx, cancel.clone()));

        debug!("Session resolver started");
        Self {
            state,
            cancel,
            task,
        }
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Waits until the first session event has been resolved
    pub async fn resolved(&self) -> SessionState {
        self.wait_until(|state| !state.is_loading()).await
    }

    /// Waits until the state reflects the given session (or no session)
    pub async fn settled_for(&self, token_id: Option<Uuid>) -> SessionState {
        self.wait_until(|state| {
            !state.is_loading() && state.session().map(|s| s.token_id) == token_id
        })
        .await
    }

    async fn wait_until(&self, predicate: impl FnMut(&SessionState) -> bool) -> SessionState {
        let mut rx = self.state.clone();
        if let Ok(state) = rx.wait_for(predicate).await {
            return state.clone();
        }
        // Resolver task ended; report the last published state
        let last = rx.borrow().clone();
        last
    }

    /// Ends the subscription
    pub fn stop(self) {}

    /// True while the background task is running
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for SessionResolver {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
        debug!("Session resolver stopped");
    }
}

async fn run(
    store: Arc<dyn DocumentStore>,
    mut sessions: watch::Receiver<Option<Session>>,
    state: watch::Sender<SessionState>,
    cancel: CancellationToken,
) {
    let mut current = sessions.borrow_and_update().clone();
    let mut upstream_open = true;

    loop {
        let lookup = resolve_session(store.as_ref(), current.clone());
        tokio::pin!(lookup);

        let resolved = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                changed = sessions.changed(), if upstream_open => {
                    if changed.is_ok() {
                        debug!("Session changed during lookup, discarding stale result");
                        current = sessions.borrow_and_update().clone();
                        break None;
                    }
                    upstream_open = false;
                }
                resolved = &mut lookup => break Some(resolved),
            }
        };

        let Some(resolved) = resolved else {
            continue;
        };
        state.send_replace(resolved);

        if !upstream_open {
            return;
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            changed = sessions.changed() => {
                if changed.is_err() {
                    return;
                }
                current = sessions.borrow_and_update().clone();
            }
        }
    }
}
