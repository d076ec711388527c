/// Middleware for the API server
///
/// - [`security`]: security response headers on every response
/// - [`guard`]: session resolution and role checks for guarded routes

pub mod guard;
pub mod security;
