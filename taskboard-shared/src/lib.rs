//! # Taskboard Shared Library
//!
//! Domain layer of the task board: records, the document store and identity
//! boundaries, session gating, and the role-specific repositories. The API
//! server in `taskboard-api` is a thin HTTP front end over this crate.
//!
//! ## Module Organization
//!
//! - `store`: document store contract with in-memory and PostgreSQL backends
//! - `db`: PostgreSQL pool and migrations
//! - `models`: user profiles and tasks
//! - `auth`: password hashing, session tokens, the auth provider
//! - `session`: session resolution, route guard, session handle
//! - `repository`: admin and member task access
//! - `dashboard`: dashboard summaries

pub mod auth;
pub mod dashboard;
pub mod db;
pub mod models;
pub mod repository;
pub mod session;
pub mod store;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
