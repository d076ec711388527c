/// Authentication endpoints
///
/// - `GET /` - sign-in entry point
/// - `POST /v1/auth/sign-up` - create an account and its profile
/// - `POST /v1/auth/sign-in` - sign in and get a session token
/// - `POST /v1/auth/sign-out` - end the current session
///
/// Sign-up and sign-in answer with a session token, the route the client
/// should land on, and the user's profile. The token is also set as the
/// session cookie so dashboard pages work from a browser.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::guard::{CurrentUser, SESSION_COOKIE},
};
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::jwt,
    models::user::{Role, UserProfile},
    session::{
        guard::Route,
        handle::{land, register, SignUp, SignedIn},
    },
};
use tracing::{info, warn};
use validator::Validate;

/// Sign-up request
#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password should be at least 6 characters"))]
    pub password: String,

    /// Optional display name
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    /// Role picked at sign-up (default: member)
    pub role: Option<Role>,
}

/// Sign-in request
#[derive(Debug, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Response to a successful sign-up or sign-in
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Bearer token for subsequent requests
    pub token: String,

    /// Token expiry (RFC 3339)
    pub expires_at: String,

    /// Where the client should navigate
    pub landing: String,

    pub user: UserProfile,
}

/// Response to sign-out
#[derive(Debug, Serialize)]
pub struct SignOutResponse {
    pub landing: String,
}

/// Sign-in entry point
#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub service: String,
    pub version: String,
    pub sign_in: String,
    pub sign_up: String,
}

/// `GET /`
pub async fn entry() -> Json<EntryResponse> {
    Json(EntryResponse {
        service: "taskboard".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sign_in: "/v1/auth/sign-in".to_string(),
        sign_up: "/v1/auth/sign-up".to_string(),
    })
}

/// Creates an account with a profile and signs it in
///
/// ```text
/// POST /v1/auth/sign-up
/// Content-Type: application/json
///
/// {
///   "email": "ada@example.com",
///   "password": "secret1",
///   "name": "Ada",
///   "role": "member"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: the provider rejected the email or password
/// - `409 Conflict`: email already in use
/// - `422 Unprocessable Entity`: validation failed
pub async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> ApiResult<Response> {
    req.validate()?;

    let form = SignUp {
        email: req.email,
        password: req.password,
        name: req.name,
        role: req.role.unwrap_or(Role::Member),
    };

    let signed_in = register(state.auth.as_ref(), state.store.as_ref(), form).await?;

    info!(
        user_id = %signed_in.session.uid,
        role = %signed_in.profile.role,
        "User signed up"
    );

    session_response(&state, signed_in)
}

/// Signs in and returns a session token with the landing route
///
/// ```text
/// POST /v1/auth/sign-in
/// Content-Type: application/json
///
/// { "email": "ada@example.com", "password": "secret1" }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: invalid email or password
/// - `403 Forbidden`: the account has no profile; the provider session is
///   ended and no token is issued
/// - `422 Unprocessable Entity`: validation failed
pub async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> ApiResult<Response> {
    req.validate()?;

    let session = state.auth.sign_in(&req.email, &req.password).await?;

    let token_id = session.token_id;
    let signed_in = match land(state.store.as_ref(), session).await {
        Ok(signed_in) => signed_in,
        Err(e) => {
            if let Err(sign_out_err) = state.auth.sign_out(token_id).await {
                warn!(error = %sign_out_err, "Failed to end session after failed landing");
            }
            return Err(e.into());
        }
    };

    info!(
        user_id = %signed_in.session.uid,
        landing = %signed_in.landing,
        "User signed in"
    );

    session_response(&state, signed_in)
}

/// Ends the caller's session
///
/// ```text
/// POST /v1/auth/sign-out
/// Authorization: Bearer <token>
/// ```
///
/// ```json
/// { "landing": "/" }
/// ```
pub async fn sign_out(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Response> {
    state.auth.sign_out(user.session.token_id).await?;

    info!(user_id = %user.session.uid, "User signed out");

    let cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(SignOutResponse {
            landing: Route::SignIn.path().to_string(),
        }),
    )
        .into_response())
}

fn session_response(state: &AppState, signed_in: SignedIn) -> ApiResult<Response> {
    let SignedIn {
        session,
        profile,
        landing,
    } = signed_in;

    let ttl = state.session_ttl();
    let claims = jwt::Claims::new(&session.uid, &session.email, session.token_id, ttl);
    let token = jwt::create_token(&claims, state.jwt_secret())
        .map_err(|e| ApiError::InternalError(format!("Failed to issue token: {}", e)))?;

    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        ttl.num_seconds()
    );
    if state.config.api.production {
        cookie.push_str("; Secure");
    }

    let expires_at = chrono::DateTime::<chrono::Utc>::from_timestamp(claims.exp, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_default();

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(SessionResponse {
            token,
            expires_at,
            landing: landing.path().to_string(),
            user: profile,
        }),
    )
        .into_response())
}
