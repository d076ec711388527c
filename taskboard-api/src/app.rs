/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskboard_api::{app::{build_router, AppState}, config::Config};
/// use taskboard_shared::auth::{password::PasswordParams, provider::StoreAuthProvider};
/// use taskboard_shared::store::memory::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let store = Arc::new(MemoryStore::new());
/// let auth = Arc::new(StoreAuthProvider::new(store.clone(), PasswordParams::default()));
/// let state = AppState::new(store, auth, config);
///
/// let app = build_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{
        guard::{route_guard, GuardConfig},
        security::SecurityHeadersLayer,
    },
};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use taskboard_shared::{
    auth::provider::AuthProvider,
    repository::admin::AdminTaskRepository,
    session::guard::RequiredRole,
    store::DocumentStore,
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into every handler through `State`; everything inside is behind
/// an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Task and profile storage
    pub store: Arc<dyn DocumentStore>,

    /// Credential and session provider
    pub auth: Arc<dyn AuthProvider>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(store: Arc<dyn DocumentStore>, auth: Arc<dyn AuthProvider>, config: Config) -> Self {
        Self {
            store,
            auth,
            config: Arc::new(config),
        }
    }

    /// Session token signing key
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Lifetime of issued session tokens
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.config.jwt.session_ttl_hours)
    }

    /// Admin view of the task collection
    pub fn admin_tasks(&self) -> AdminTaskRepository {
        AdminTaskRepository::new(self.store.clone())
    }
}

/// Builds the complete router with all routes and middleware
///
/// ```text
/// /
/// ├── GET  /                        # sign-in entry point
/// ├── GET  /health
/// ├── GET  /admin/dashboard         # admin page (303 otherwise)
/// ├── GET  /member/dashboard        # member page (303 otherwise)
/// └── /v1/
///     ├── /auth/
///     │   ├── POST /sign-up
///     │   ├── POST /sign-in
///     │   └── POST /sign-out        # any signed-in user
///     ├── /admin/                   # admin only
///     │   ├── GET|POST       /tasks
///     │   ├── PUT|DELETE     /tasks/:id
///     │   ├── GET|POST       /users
///     │   └── GET            /assignees
///     └── /member/                  # member only
///         ├── GET            /tasks?filter=active|completed|all
///         └── PUT            /tasks/:id/progress
/// ```
///
/// Layers, outermost first: security headers, CORS, compression, tracing.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let public_routes = Router::new()
        .route("/", get(routes::auth::entry))
        .route("/health", get(routes::health::health_check));

    let admin_page = Router::new()
        .route("/admin/dashboard", get(routes::dashboard::admin_dashboard))
        .layer(from_fn_with_state(
            GuardConfig::page(state.clone(), RequiredRole::Admin),
            route_guard,
        ));

    let member_page = Router::new()
        .route("/member/dashboard", get(routes::dashboard::member_dashboard))
        .layer(from_fn_with_state(
            GuardConfig::page(state.clone(), RequiredRole::Member),
            route_guard,
        ));

    let sign_out = Router::new()
        .route("/sign-out", post(routes::auth::sign_out))
        .layer(from_fn_with_state(
            GuardConfig::api(state.clone(), RequiredRole::Any),
            route_guard,
        ));

    let auth_routes = Router::new()
        .route("/sign-up", post(routes::auth::sign_up))
        .route("/sign-in", post(routes::auth::sign_in))
        .merge(sign_out);

    let admin_routes = Router::new()
        .route(
            "/tasks",
            get(routes::admin::list_tasks).post(routes::admin::create_task),
        )
        .route(
            "/tasks/:id",
            put(routes::admin::update_task).delete(routes::admin::delete_task),
        )
        .route(
            "/users",
            get(routes::admin::list_members).post(routes::admin::add_user),
        )
        .route("/assignees", get(routes::admin::list_assignees))
        .layer(from_fn_with_state(
            GuardConfig::api(state.clone(), RequiredRole::Admin),
            route_guard,
        ));

    let member_routes = Router::new()
        .route("/tasks", get(routes::member::list_tasks))
        .route("/tasks/:id/progress", put(routes::member::update_progress))
        .layer(from_fn_with_state(
            GuardConfig::api(state.clone(), RequiredRole::Member),
            route_guard,
        ));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/admin", admin_routes)
        .nest("/member", member_routes);

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(public_routes)
        .merge(admin_page)
        .merge(member_page)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
