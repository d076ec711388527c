/// Common test utilities for API tests
///
/// Every test gets its own in-memory store, auth provider and router, so
/// tests are independent and need no external services.

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::Config;
use taskboard_shared::auth::password::PasswordParams;
use taskboard_shared::auth::provider::StoreAuthProvider;
use taskboard_shared::store::memory::MemoryStore;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";
pub const PASSWORD: &str = "secret1";

/// A response, with the body parsed as JSON (`Null` when empty, a string
/// when not JSON)
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// `Location` header of a redirect
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}

/// A signed-up user
pub struct TestUser {
    pub uid: String,
    pub email: String,
    pub token: String,
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub auth: Arc<StoreAuthProvider>,
    pub app: Router,
    pub config: Config,
}

impl TestContext {
    pub fn new() -> Self {
        let config = Config::from_lookup(|key| match key {
            "JWT_SECRET" => Some(JWT_SECRET.to_string()),
            _ => None,
        })
        .expect("test config");

        let store = Arc::new(MemoryStore::new());
        let auth = Arc::new(
            StoreAuthProvider::new(store.clone(), PasswordParams::minimal())
                .with_session_ttl(chrono::Duration::hours(config.jwt.session_ttl_hours)),
        );
        let state = AppState::new(store.clone(), auth.clone(), config.clone());
        let app = build_router(state);

        Self {
            store,
            auth,
            app,
            config,
        }
    }

    /// Sends a request and collects the response
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send_request(request).await
    }

    /// Sends a prebuilt request
    pub async fn send_request(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            // Extractor rejections answer in plain text
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::PUT, uri, token, Some(body)).await
    }

    /// Signs up through the API and returns the new user
    pub async fn sign_up(&self, email: &str, name: &str, role: &str) -> TestUser {
        let response = self
            .post(
                "/v1/auth/sign-up",
                None,
                json!({
                    "email": email,
                    "password": PASSWORD,
                    "name": name,
                    "role": role,
                }),
            )
            .await;
        assert_eq!(
            response.status,
            StatusCode::OK,
            "sign-up failed: {}",
            response.body
        );

        TestUser {
            uid: response.body["user"]["id"].as_str().unwrap().to_string(),
            email: email.to_string(),
            token: response.body["token"].as_str().unwrap().to_string(),
        }
    }

    pub async fn admin(&self) -> TestUser {
        self.sign_up("admin@example.com", "Grace", "admin").await
    }

    pub async fn member(&self, email: &str, name: &str) -> TestUser {
        self.sign_up(email, name, "member").await
    }

    /// Creates a task as `admin`, returning its id
    pub async fn create_task(&self, admin: &TestUser, title: &str, assignee: &str) -> String {
        let response = self
            .post(
                "/v1/admin/tasks",
                Some(&admin.token),
                json!({
                    "title": title,
                    "description": "details",
                    "assignee": assignee,
                    "status": "pending",
                    "dueDate": "2025-03-31",
                }),
            )
            .await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "create failed: {}",
            response.body
        );
        response.body["id"].as_str().unwrap().to_string()
    }
}
