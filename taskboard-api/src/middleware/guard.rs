/// Route guard middleware
///
/// Resolves the caller's session for every guarded request and applies the
/// same decision a client-side route guard would:
///
/// ```text
/// token -> provider session -> profile role -> guard(required, state)
/// ```
///
/// The token is read from `Authorization: Bearer <jwt>` or, failing that,
/// from the [`SESSION_COOKIE`] cookie set at sign-in.
///
/// Two rejection styles exist:
///
/// - [`GuardMode::Page`]: browser navigation, answered with `303 See Other`
///   to the route the guard picked
/// - [`GuardMode::Api`]: JSON endpoints, answered with `401`/`403` and a
///   `redirect` field naming the same route
///
/// # Example
///
/// ```no_run
/// use axum::{middleware::from_fn_with_state, routing::get, Router};
/// use taskboard_api::{app::AppState, middleware::guard::{route_guard, GuardConfig}};
/// use taskboard_shared::session::guard::RequiredRole;
///
/// # fn example(state: AppState) -> Router<AppState> {
/// Router::new()
///     .route("/v1/admin/tasks", get(|| async { "ok" }))
///     .layer(from_fn_with_state(
///         GuardConfig::api(state, RequiredRole::Admin),
///         route_guard,
///     ))
/// # }
/// ```

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use taskboard_shared::{
    auth::{jwt, provider::Session},
    models::user::Role,
    session::{
        guard::{guard, GuardDecision, RequiredRole, Route},
        resolver::{resolve_session, SessionState},
    },
};
use tracing::{debug, warn};

use crate::{app::AppState, error::ApiError};

/// Cookie carrying the session token for page navigation
pub const SESSION_COOKIE: &str = "taskboard_session";

/// How a rejected request is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardMode {
    /// `303 See Other`
    Page,

    /// JSON error with a `redirect` field
    Api,
}

/// State for one guarded group of routes
#[derive(Clone)]
pub struct GuardConfig {
    pub app: AppState,
    pub required: RequiredRole,
    pub mode: GuardMode,
}

impl GuardConfig {
    /// Guard for browser-navigated views
    pub fn page(app: AppState, required: RequiredRole) -> Self {
        Self {
            app,
            required,
            mode: GuardMode::Page,
        }
    }

    /// Guard for JSON endpoints
    pub fn api(app: AppState, required: RequiredRole) -> Self {
        Self {
            app,
            required,
            mode: GuardMode::Api,
        }
    }
}

/// Identity of a request that passed the guard
///
/// Inserted into request extensions; handlers take it with
/// `Extension<CurrentUser>`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub session: Session,

    /// `None` when the guard admits any signed-in user and the profile is
    /// missing or unreadable
    pub role: Option<Role>,
}

/// Extracts the session token from the request
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    bearer.or_else(|| cookie_value(headers, SESSION_COOKIE))
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Resolves the session state behind a request's token
///
/// A missing, invalid or expired token, or a revoked session, all resolve to
/// [`SessionState::Unauthenticated`].
pub async fn session_state(state: &AppState, headers: &HeaderMap) -> SessionState {
    let Some(token) = extract_token(headers) else {
        return SessionState::Unauthenticated;
    };

    let claims = match jwt::validate_token(token, state.jwt_secret()) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(error = %e, "Rejected session token");
            return SessionState::Unauthenticated;
        }
    };

    let session = match state.auth.session(claims.sid).await {
        Some(session) if session.uid == claims.sub => session,
        Some(_) => {
            warn!(session_id = %claims.sid, "Token subject doesn't match its session");
            return SessionState::Unauthenticated;
        }
        None => {
            debug!(session_id = %claims.sid, "Session no longer active");
            return SessionState::Unauthenticated;
        }
    };

    resolve_session(state.store.as_ref(), Some(session)).await
}

/// Axum middleware applying the route guard
pub async fn route_guard(
    State(config): State<GuardConfig>,
    mut req: Request,
    next: Next,
) -> Response {
    let resolved = session_state(&config.app, req.headers()).await;

    match guard(config.required, &resolved) {
        GuardDecision::Render => {
            if let Some(session) = resolved.session() {
                req.extensions_mut().insert(CurrentUser {
                    session: session.clone(),
                    role: resolved.role(),
                });
            }
            next.run(req).await
        }
        GuardDecision::Redirect(route) => {
            debug!(
                path = %req.uri().path(),
                redirect = %route,
                "Guard redirected request"
            );
            reject(config.mode, route, &resolved)
        }
        // Server-side resolution always completes
        GuardDecision::Suspend => {
            ApiError::ServiceUnavailable("Session is still resolving".to_string()).into_response()
        }
    }
}

fn reject(mode: GuardMode, route: Route, state: &SessionState) -> Response {
    match mode {
        GuardMode::Page => Redirect::to(route.path()).into_response(),
        GuardMode::Api => match state {
            SessionState::Unauthenticated => {
                ApiError::Unauthorized("Sign in required".to_string()).into_response()
            }
            _ => ApiError::wrong_role(route).into_response(),
        },
    }
}
