/// Persisted records
///
/// Both record types live in the document store; field names are the wire
/// contract and use camelCase.
///
/// # Models
///
/// - `user`: user profiles and roles (`users` collection, keyed by session id)
/// - `task`: tracked work items (`tasks` collection)
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::user::{NewProfile, Role, UserProfile};
/// use taskboard_shared::store::memory::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
///
/// UserProfile::create_with_id(
///     &store,
///     "uid-123",
///     NewProfile::new("ada@example.com", Some("Ada".to_string()), Role::Member),
/// )
/// .await?;
///
/// let found = UserProfile::find(&store, "uid-123").await?;
/// assert_eq!(found.map(|p| p.role), Some(Role::Member));
/// # Ok(())
/// # }
/// ```

pub mod task;
pub mod user;
