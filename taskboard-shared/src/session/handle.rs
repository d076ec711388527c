/// Session context
///
/// [`SessionHandle`] is the explicit replacement for a process-wide auth
/// object: it owns the current session for one client, publishes changes on a
/// `watch` channel, and is passed to whatever needs it (resolvers, member
/// repositories, views).
///
/// # Sign-in flow
///
/// 1. the [`AuthProvider`] checks credentials and starts a session
/// 2. the session is published
/// 3. the user's profile is read to pick the landing route
///
/// A missing profile fails with [`SignInError::ProfileNotFound`] but leaves
/// the session signed in; the resolver then reports it as unauthorized.
///
/// Sign-up writes the profile before the session is published, so a
/// resolver never sees a session whose profile is still being created.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskboard_shared::auth::password::PasswordParams;
/// use taskboard_shared::auth::provider::StoreAuthProvider;
/// use taskboard_shared::models::user::Role;
/// use taskboard_shared::session::handle::{SessionHandle, SignUp};
/// use taskboard_shared::store::{memory::MemoryStore, DocumentStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
/// let auth = Arc::new(StoreAuthProvider::new(store.clone(), PasswordParams::default()));
/// let handle = SessionHandle::new(auth, store);
///
/// let resolver = handle.resolver();
/// let signed_in = handle
///     .sign_up(SignUp {
///         email: "ada@example.com".to_string(),
///         password: "hunter22".to_string(),
///         name: None,
///         role: Role::Admin,
///     })
///     .await?;
///
/// println!("landing on {}", signed_in.landing);
/// let state = resolver.settled_for(Some(signed_in.session.token_id)).await;
/// assert_eq!(state.role(), Some(Role::Admin));
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use super::guard::Route;
use super::resolver::SessionResolver;
use crate::auth::provider::{AuthError, AuthProvider, Session};
use crate::models::user::{NewProfile, Role, UserProfile};
use crate::store::{DocumentStore, StoreError};

/// Message shown when a signed-in user has no profile
pub const PROFILE_NOT_FOUND_MESSAGE: &str = "User profile not found. Please contact administrator.";

/// Sign-in or sign-up failure
#[derive(Debug, thiserror::Error)]
pub enum SignInError {
    /// Credential check failed; the message is user-facing
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Authenticated, but no profile exists
    #[error("User profile not found. Please contact administrator.")]
    ProfileNotFound,

    /// Profile couldn't be read or written
    #[error("Failed to load user profile: {0}")]
    Store(#[from] StoreError),
}

/// Sign-up form
#[derive(Debug, Clone, PartialEq)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    /// Role picked at sign-up
    pub role: Role,
}

/// A completed sign-in
#[derive(Debug, Clone, PartialEq)]
pub struct SignedIn {
    pub session: Session,
    pub profile: UserProfile,
    /// Dashboard for the profile's role
    pub landing: Route,
}

/// Reads the profile for a fresh session and picks its landing route
///
/// Admins land on the admin dashboard; every other role on the member
/// dashboard.
pub async fn land(store: &dyn DocumentStore, session: Session) -> Result<SignedIn, SignInError> {
    let profile = UserProfile::find(store, &session.uid)
        .await?
        .ok_or(SignInError::ProfileNotFound)?;

    let landing = match profile.role {
        Role::Admin => Route::AdminDashboard,
        _ => Route::MemberDashboard,
    };

    Ok(SignedIn {
        session,
        profile,
        landing,
    })
}

/// Creates an account and its profile, returning the new session
///
/// Nothing is published; callers decide what to do with the session.
pub async fn register(
    auth: &dyn AuthProvider,
    store: &dyn DocumentStore,
    form: SignUp,
) -> Result<SignedIn, SignInError> {
    let session = auth.sign_up(&form.email, &form.password).await?;

    let profile = UserProfile::create_with_id(
        store,
        &session.uid,
        NewProfile::new(form.email.trim(), form.name, form.role),
    )
    .await
    .map_err(|e| {
        warn!(user_id = %session.uid, error = %e, "Failed to write profile at sign-up");
        e
    })?;

    Ok(SignedIn {
        landing: Route::dashboard_for(profile.role),
        session,
        profile,
    })
}

struct Inner {
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn DocumentStore>,
    current: watch::Sender<Option<Session>>,
}

/// Injected session context for one client
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Inner>,
}

impl SessionHandle {
    /// Creates a signed-out handle
    pub fn new(auth: Arc<dyn AuthProvider>, store: Arc<dyn DocumentStore>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                auth,
                store,
                current,
            }),
        }
    }

    /// The current session
    pub fn current(&self) -> Option<Session> {
        self.inner.current.borrow().clone()
    }

    /// Subscribes to session changes. The current value is the first event.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.inner.current.subscribe()
    }

    /// Starts a resolver over this handle's sessions
    pub fn resolver(&self) -> SessionResolver {
        SessionResolver::spawn(self.inner.store.clone(), self.subscribe())
    }

    /// The document store this handle reads profiles from
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.inner.store
    }

    /// Signs in and picks the landing route
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, SignInError> {
        let session = self.inner.auth.sign_in(email, password).await?;
        self.publish(Some(session.clone()));

        land(self.inner.store.as_ref(), session).await.map_err(|e| {
            if matches!(e, SignInError::ProfileNotFound) {
                warn!("Signed in without a profile");
            }
            e
        })
    }

    /// Creates an account and profile, then signs in
    pub async fn sign_up(&self, form: SignUp) -> Result<SignedIn, SignInError> {
        let signed_in = register(self.inner.auth.as_ref(), self.inner.store.as_ref(), form).await?;
        self.publish(Some(signed_in.session.clone()));
        Ok(signed_in)
    }

    /// Ends the current session and returns the sign-in route
    pub async fn sign_out(&self) -> Result<Route, AuthError> {
        if let Some(session) = self.current() {
            self.inner.auth.sign_out(session.token_id).await?;
            info!(user_id = %session.uid, "Session ended");
        }
        self.publish(None);
        Ok(Route::SignIn)
    }

    fn publish(&self, session: Option<Session>) {
        self.inner.current.send_replace(session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::PasswordParams;
    use crate::auth::provider::StoreAuthProvider;
    use crate::session::resolver::{SessionState, UnauthorizedReason};
    use crate::store::memory::MemoryStore;

    fn handle() -> (Arc<dyn AuthProvider>, SessionHandle) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let auth: Arc<dyn AuthProvider> =
            Arc::new(StoreAuthProvider::new(store.clone(), PasswordParams::minimal()));
        (auth.clone(), SessionHandle::new(auth, store))
    }

    fn sign_up_form(email: &str, role: Role) -> SignUp {
        SignUp {
            email: email.to_string(),
            password: "secret1".to_string(),
            name: Some("Ada".to_string()),
            role,
        }
    }

    #[tokio::test]
    async fn test_sign_up_writes_profile_and_lands() {
        let (_, handle) = handle();
        let signed_in = handle
            .sign_up(sign_up_form("ada@example.com", Role::Admin))
            .await
            .unwrap();

        assert_eq!(signed_in.landing, Route::AdminDashboard);
        assert_eq!(handle.current(), Some(signed_in.session.clone()));

        let profile = UserProfile::find(handle.store().as_ref(), &signed_in.session.uid)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.email, "ada@example.com");
        assert_eq!(profile.name.as_deref(), Some("Ada"));
        assert_eq!(profile.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_sign_in_lands_by_role() {
        let (_, handle) = handle();
        handle
            .sign_up(sign_up_form("m@example.com", Role::Member))
            .await
            .unwrap();
        handle.sign_out().await.unwrap();

        let signed_in = handle.sign_in("m@example.com", "secret1").await.unwrap();
        assert_eq!(signed_in.landing, Route::MemberDashboard);
    }

    #[tokio::test]
    async fn test_sign_in_without_profile() {
        let (auth, handle) = handle();
        // Account exists at the provider but no profile was ever written
        auth.sign_up("ghost@example.com", "secret1").await.unwrap();

        let resolver = handle.resolver();
        let err = handle.sign_in("ghost@example.com", "secret1").await.unwrap_err();
        assert!(matches!(err, SignInError::ProfileNotFound));
        assert_eq!(err.to_string(), PROFILE_NOT_FOUND_MESSAGE);

        // Still signed in, and the resolver does not invent a role
        let session = handle.current().unwrap();
        let state = resolver.settled_for(Some(session.token_id)).await;
        assert!(matches!(
            state,
            SessionState::Unauthorized {
                reason: UnauthorizedReason::ProfileNotFound,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_auth_error_message_is_verbatim() {
        let (_, handle) = handle();
        let err = handle.sign_in("nobody@example.com", "secret1").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");
        assert!(handle.current().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_revokes_and_publishes() {
        let (auth, handle) = handle();
        let resolver = handle.resolver();
        let signed_in = handle
            .sign_up(sign_up_form("ada@example.com", Role::Admin))
            .await
            .unwrap();
        resolver.settled_for(Some(signed_in.session.token_id)).await;

        assert_eq!(handle.sign_out().await.unwrap(), Route::SignIn);
        assert!(handle.current().is_none());
        assert!(auth.session(signed_in.session.token_id).await.is_none());
        assert_eq!(resolver.settled_for(None).await, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_resolver_sees_profile_written_at_sign_up() {
        let (_, handle) = handle();
        let mut sessions = handle.subscribe();
        let resolver = handle.resolver();

        let signed_in = handle
            .sign_up(sign_up_form("ada@example.com", Role::Member))
            .await
            .unwrap();

        sessions.changed().await.unwrap();
        let state = resolver.settled_for(Some(signed_in.session.token_id)).await;
        assert_eq!(state.role(), Some(Role::Member));
    }
}
