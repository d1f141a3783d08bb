//! In-memory session repository for development and testing.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use splatkit_core::session::{
    generate_session_id, is_expired, Result, SessionId, SessionRepository, SessionValues,
};

#[derive(Debug, Clone)]
struct Entry {
    values: SessionValues,
    expires_at: Option<DateTime<Utc>>,
}

/// In-memory session repository.
///
/// Stores payloads in a HashMap wrapped in `Arc<RwLock<_>>`. Clones share the
/// same map. Data is lost when the last clone is dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionRepository {
    sessions: Arc<RwLock<HashMap<SessionId, Entry>>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Remove expired sessions. Returns how many were removed.
    pub async fn delete_expired(&self) -> Result<u64> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !is_expired(entry.expires_at, now));
        Ok((before - sessions.len()) as u64)
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn create(
        &self,
        values: &SessionValues,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<SessionId> {
        let id = generate_session_id();
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            id.clone(),
            Entry {
                values: values.clone(),
                expires_at,
            },
        );
        Ok(id)
    }

    async fn read(&self, id: &SessionId) -> Result<Option<SessionValues>> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(id) {
            Some(entry) if is_expired(entry.expires_at, Utc::now()) => {
                sessions.remove(id);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.values.clone())),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        id: &SessionId,
        values: &SessionValues,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            id.clone(),
            Entry {
                values: values.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id);
        Ok(())
    }
}
