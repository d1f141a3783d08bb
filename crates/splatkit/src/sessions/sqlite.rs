//! SQLite session repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use splatkit_core::session::{
    generate_session_id, Result, SessionError, SessionId, SessionRepository, SessionValues,
};

fn storage_error(e: impl std::fmt::Display) -> SessionError {
    SessionError::Storage(e.to_string())
}

/// SQLite-backed session repository.
pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the `sessions` table if it does not exist.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                expires_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    /// Removes every expired session. Returns the number of rows deleted.
    pub async fn delete_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at IS NOT NULL AND expires_at <= ?")
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(result.rows_affected())
    }
}

fn encode(values: &SessionValues) -> Result<String> {
    serde_json::to_string(values).map_err(|e| SessionError::Serialize(e.to_string()))
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    async fn create(
        &self,
        values: &SessionValues,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<SessionId> {
        let id = generate_session_id();

        sqlx::query("INSERT INTO sessions (id, data, expires_at) VALUES (?, ?, ?)")
            .bind(id.as_str())
            .bind(encode(values)?)
            .bind(expires_at.map(|t| t.to_rfc3339()))
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(id)
    }

    async fn read(&self, id: &SessionId) -> Result<Option<SessionValues>> {
        let row = sqlx::query_as::<_, (String,)>(
            "SELECT data FROM sessions WHERE id = ? AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(id.as_str())
        .bind(Utc::now().to_rfc3339())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        match row {
            Some((data,)) => Ok(Some(serde_json::from_str(&data).map_err(storage_error)?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        id: &SessionId,
        values: &SessionValues,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO sessions (id, data, expires_at) VALUES (?, ?, ?)")
            .bind(id.as_str())
            .bind(encode(values)?)
            .bind(expires_at.map(|t| t.to_rfc3339()))
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(())
    }
}
