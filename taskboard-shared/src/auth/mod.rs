/// Authentication
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`jwt`]: HS256 session tokens for HTTP clients
/// - [`provider`]: the [`provider::AuthProvider`] boundary and its
///   document-store implementation
///
/// Roles are not part of authentication. A session only says who the caller
/// is; [`crate::session`] joins it with the caller's profile to decide what
/// they may see.

pub mod jwt;
pub mod password;
pub mod provider;
