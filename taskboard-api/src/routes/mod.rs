/// API route handlers
///
/// Organized by resource:
///
/// - `health`: health check
/// - `auth`: sign-in entry point, sign-up, sign-in, sign-out
/// - `dashboard`: admin and member dashboard pages
/// - `admin`: task management, member roster, assignees
/// - `member`: own task list and progress reports

pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod member;
