use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{SessionError, SessionId, SessionValues};

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Caller-owned storage for externally persisted sessions.
///
/// When a session store is built over a repository, the cookie only carries
/// the signed session ID and the payload lives here.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Store a new payload and return the ID it was stored under.
    async fn create(&self, values: &SessionValues, expires_at: Option<DateTime<Utc>>)
        -> Result<SessionId>;

    /// Load a payload. Missing or expired sessions return `None`.
    async fn read(&self, id: &SessionId) -> Result<Option<SessionValues>>;

    /// Replace the payload of an existing session.
    async fn update(
        &self,
        id: &SessionId,
        values: &SessionValues,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Remove a session. Removing an unknown ID is not an error.
    async fn delete(&self, id: &SessionId) -> Result<()>;
}
