//! User Session Abstraction
//!
//! The player attributes plays to the signed-in user and feeds the user's
//! "recently played" list. Both are owned by the host's account layer; the
//! core only sees this read-mostly accessor.

/// Accessor for the signed-in user.
///
/// Implementations are expected to be cheap and non-blocking: they are
/// called from event subscribers on the publishing thread.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::user::UserSession;
///
/// fn attribute(session: &dyn UserSession) -> String {
///     session.current_user_id().unwrap_or_else(|| "anonymous".to_string())
/// }
/// ```
pub trait UserSession: Send + Sync {
    /// Identifier of the signed-in user, `None` when browsing anonymously
    fn current_user_id(&self) -> Option<String>;

    /// Record that a track started playing for the current user
    fn add_to_recently_played(&self, track_id: &str);
}

/// Session used when the host does not provide one.
///
/// Reports no user and drops recently-played updates.
#[derive(Debug, Clone, Default)]
pub struct AnonymousSession;

impl UserSession for AnonymousSession {
    fn current_user_id(&self) -> Option<String> {
        None
    }

    fn add_to_recently_played(&self, _track_id: &str) {}
}
