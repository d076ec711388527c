/// Session gating
///
/// # Modules
///
/// - [`resolver`]: joins provider sessions with user profiles into a
///   [`resolver::SessionState`]
/// - [`guard`]: route protection over that state
/// - [`handle`]: the session context passed to resolvers and repositories
///
/// Data flows one way: the handle publishes sessions, the resolver turns
/// them into states, guards turn states into render/redirect decisions.

pub mod guard;
pub mod handle;
pub mod resolver;
