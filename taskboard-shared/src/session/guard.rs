/// Route protection
///
/// [`guard`] is the decision: given the role a view requires and the current
/// [`SessionState`], render it, redirect somewhere else, or wait. It is a
/// pure function and is re-evaluated on every state change.
///
/// [`RouteGuard`] wraps the decision for a single mounted view and makes
/// navigation a one-shot side effect: re-evaluating with unchanged inputs
/// never asks for the same redirect twice.
///
/// | State | Required | Decision |
/// |---|---|---|
/// | `Suspended` | any | `Suspend` |
/// | `Unauthenticated` | any | `Redirect(SignIn)` |
/// | `Authorized(role)` | `Any` or `role` | `Render` |
/// | `Authorized(admin)` | `Member` | `Redirect(AdminDashboard)` |
/// | `Authorized(member)` | `Admin` | `Redirect(MemberDashboard)` |
/// | `Unauthorized` | `Any` | `Render` |
/// | `Unauthorized` | `Admin` / `Member` | `Redirect(SignIn)` |

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use super::resolver::SessionState;
use crate::models::user::Role;

/// Navigable views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    /// `/`
    SignIn,

    /// `/admin/dashboard`
    AdminDashboard,

    /// `/member/dashboard`
    MemberDashboard,
}

impl Route {
    /// URL path of the view
    pub fn path(&self) -> &'static str {
        match self {
            Route::SignIn => "/",
            Route::AdminDashboard => "/admin/dashboard",
            Route::MemberDashboard => "/member/dashboard",
        }
    }

    /// The dashboard a role lands on
    pub fn dashboard_for(role: Role) -> Self {
        match role {
            Role::Admin => Route::AdminDashboard,
            Role::Member => Route::MemberDashboard,
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Role a view accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredRole {
    Admin,
    Member,
    /// Any signed-in user
    Any,
}

impl RequiredRole {
    fn admits(&self, role: Role) -> bool {
        match self {
            RequiredRole::Any => true,
            RequiredRole::Admin => role == Role::Admin,
            RequiredRole::Member => role == Role::Member,
        }
    }
}

impl From<Role> for RequiredRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin => RequiredRole::Admin,
            Role::Member => RequiredRole::Member,
        }
    }
}

/// Outcome of a guard evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Show the view
    Render,

    /// Navigate elsewhere
    Redirect(Route),

    /// Show a neutral placeholder, don't navigate
    Suspend,
}

/// Decides what a view requiring `required` should do in `state`
pub fn guard(required: RequiredRole, state: &SessionState) -> GuardDecision {
    match state {
        SessionState::Suspended => GuardDecision::Suspend,
        SessionState::Unauthenticated => GuardDecision::Redirect(Route::SignIn),
        SessionState::Authorized { role, .. } if required.admits(*role) => GuardDecision::Render,
        SessionState::Authorized { role, .. } => GuardDecision::Redirect(Route::dashboard_for(*role)),
        SessionState::Unauthorized { .. } if required == RequiredRole::Any => GuardDecision::Render,
        SessionState::Unauthorized { .. } => GuardDecision::Redirect(Route::SignIn),
    }
}

/// Lifecycle of a guarded view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardPhase {
    /// Waiting for the session to resolve
    Suspended,

    /// Navigation to the route has been requested
    Redirecting(Route),

    /// The view is shown
    Rendered,
}

/// Inputs the decision depends on
#[derive(Debug, Clone, PartialEq, Eq)]
struct GuardInputs {
    required: RequiredRole,
    token_id: Option<Uuid>,
    role: Option<Role>,
    loading: bool,
}

impl GuardInputs {
    fn new(required: RequiredRole, state: &SessionState) -> Self {
        Self {
            required,
            token_id: state.session().map(|s| s.token_id),
            role: state.role(),
            loading: state.is_loading(),
        }
    }
}

/// Guard for one mounted view
///
/// # Example
///
/// ```
/// use taskboard_shared::session::guard::{GuardPhase, RequiredRole, Route, RouteGuard};
/// use taskboard_shared::session::resolver::SessionState;
///
/// let mut guard = RouteGuard::new(RequiredRole::Admin);
/// assert_eq!(guard.evaluate(&SessionState::Suspended), None);
///
/// assert_eq!(guard.evaluate(&SessionState::Unauthenticated), Some(Route::SignIn));
/// assert_eq!(guard.phase(), GuardPhase::Redirecting(Route::SignIn));
///
/// // Same inputs: no second navigation
/// assert_eq!(guard.evaluate(&SessionState::Unauthenticated), None);
/// ```
#[derive(Debug, Clone)]
pub struct RouteGuard {
    required: RequiredRole,
    phase: GuardPhase,
    last: Option<GuardInputs>,
}

impl RouteGuard {
    /// Creates a guard in the `Suspended` phase
    pub fn new(required: RequiredRole) -> Self {
        Self {
            required,
            phase: GuardPhase::Suspended,
            last: None,
        }
    }

    /// Current phase
    pub fn phase(&self) -> GuardPhase {
        self.phase
    }

    /// Role the view requires
    pub fn required(&self) -> RequiredRole {
        self.required
    }

    /// Changes the required role; the next evaluation decides afresh
    pub fn set_required(&mut self, required: RequiredRole) {
        self.required = required;
    }

    /// Re-evaluates the guard
    ///
    /// Returns the route to navigate to when, and only when, this evaluation
    /// calls for a navigation that hasn't already been requested for the
    /// same inputs.
    pub fn evaluate(&mut self, state: &SessionState) -> Option<Route> {
        let inputs = GuardInputs::new(self.required, state);
        if self.last.as_ref() == Some(&inputs) {
            return None;
        }
        self.last = Some(inputs);

        match guard(self.required, state) {
            GuardDecision::Suspend => {
                self.phase = GuardPhase::Suspended;
                None
            }
            GuardDecision::Render => {
                self.phase = GuardPhase::Rendered;
                None
            }
            GuardDecision::Redirect(route) => {
                self.phase = GuardPhase::Redirecting(route);
                Some(route)
            }
        }
    }

    /// Follows a state stream until a navigation is due
    ///
    /// Returns `None` if the stream ends first.
    pub async fn next_navigation(
        &mut self,
        states: &mut watch::Receiver<SessionState>,
    ) -> Option<Route> {
        loop {
            let state = states.borrow_and_update().clone();
            if let Some(route) = self.evaluate(&state) {
                return Some(route);
            }
            states.changed().await.ok()?;
        }
    }
}
