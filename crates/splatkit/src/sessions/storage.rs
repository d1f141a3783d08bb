use std::{sync::Arc, time::Duration};

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use splatkit_core::session::{
    decode_payload, encode_payload, sign, unsign, Result, Session, SessionError, SessionId,
    SessionRepository,
};

use crate::{api::cookie_header, config::SessionConfig};

/// Browsers may drop cookies larger than this.
const MAX_COOKIE_SIZE: usize = 4096;

enum Backend {
    /// The signed payload is the cookie value.
    Cookie,
    /// The cookie carries a signed session ID; payloads live in the repository.
    Persisted(Arc<dyn SessionRepository>),
}

struct Inner {
    name: String,
    secret: String,
    secure: bool,
    max_age: Option<Duration>,
    backend: Backend,
}

/// Signed-cookie session storage.
///
/// Cheap to clone; clones share configuration and repository.
#[derive(Clone)]
pub struct SessionStorage {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStorage")
            .field("name", &self.inner.name)
            .field("secure", &self.inner.secure)
            .field("max_age", &self.inner.max_age)
            .field("persisted", &matches!(self.inner.backend, Backend::Persisted(_)))
            .finish_non_exhaustive()
    }
}

impl SessionStorage {
    /// Sessions stored entirely in the signed cookie.
    ///
    /// # Errors
    ///
    /// Returns `MissingSecret` when the config has no secret and
    /// `COOKIE_AUTH_SECRET` is unset or empty.
    pub fn cookie(config: SessionConfig) -> Result<Self> {
        Self::build(config, Backend::Cookie, |key| std::env::var(key).ok())
    }

    /// Sessions whose payloads live in `repository`.
    ///
    /// # Errors
    ///
    /// Same as [`SessionStorage::cookie`].
    pub fn persisted(config: SessionConfig, repository: Arc<dyn SessionRepository>) -> Result<Self> {
        Self::build(config, Backend::Persisted(repository), |key| {
            std::env::var(key).ok()
        })
    }

    fn build(
        config: SessionConfig,
        backend: Backend,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let secret = config.resolve_secret(env)?;
        if let Some(max_age) = config.max_age {
            validate_max_age(max_age)?;
        }
        Ok(Self {
            inner: Arc::new(Inner {
                name: config.name,
                secret,
                secure: config.production,
                max_age: config.max_age,
                backend,
            }),
        })
    }

    /// Cookie-backed storage with an explicit secret, for tests.
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self::cookie(SessionConfig::default().with_secret("test-secret"))
            .expect("explicit secret")
    }

    pub fn cookie_name(&self) -> &str {
        &self.inner.name
    }

    /// Load the session named by a `Cookie` header.
    ///
    /// A missing, tampered or unreadable cookie yields an empty session.
    pub async fn get_session(&self, cookie_header: Option<&str>) -> Session {
        let Some(value) = cookie_header.and_then(|header| self.find_cookie(header)) else {
            return Session::new();
        };

        let Some(unsigned) = unsign(&value, &self.inner.secret) else {
            tracing::debug!(cookie = %self.inner.name, "discarding session cookie with bad signature");
            return Session::new();
        };

        match &self.inner.backend {
            Backend::Cookie => decode_payload(&unsigned)
                .map(|values| Session::from_parts(None, values))
                .unwrap_or_default(),
            Backend::Persisted(repository) => {
                let id = SessionId::new(unsigned);
                match repository.read(&id).await {
                    Ok(Some(values)) => Session::from_parts(Some(id), values),
                    Ok(None) => Session::new(),
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to read session, starting a new one");
                        Session::new()
                    }
                }
            }
        }
    }

    /// Load the session from request headers.
    pub async fn session_from_headers(&self, headers: &HeaderMap) -> Session {
        self.get_session(cookie_header(headers).as_deref()).await
    }

    /// Persist `session` and return the `Set-Cookie` value for it.
    ///
    /// Persisted sessions without an ID are created, and the new ID is
    /// written back into `session`.
    pub async fn commit_session(&self, session: &mut Session) -> Result<String> {
        let expires_at = self.expires_at();

        let value = match &self.inner.backend {
            Backend::Cookie => encode_payload(session.values())?,
            Backend::Persisted(repository) => match session.id() {
                Some(id) => {
                    repository.update(id, session.values(), expires_at).await?;
                    id.as_str().to_string()
                }
                None => {
                    let id = repository.create(session.values(), expires_at).await?;
                    let value = id.as_str().to_string();
                    session.set_id(id);
                    value
                }
            },
        };

        let cookie = self.cookie_string(sign(&value, &self.inner.secret));
        if cookie.len() > MAX_COOKIE_SIZE {
            tracing::warn!(
                cookie = %self.inner.name,
                size = cookie.len(),
                "session cookie exceeds {MAX_COOKIE_SIZE} bytes and may be dropped by browsers"
            );
        }

        Ok(cookie)
    }

    /// Move `session` to a new ID on its next commit and delete the stored
    /// record under the old one. Values are kept.
    ///
    /// Cookie-backed sessions have no ID and are left as they are.
    ///
    /// # Errors
    ///
    /// Returns the repository error if the old record could not be deleted.
    /// The session is detached from it either way.
    pub async fn regenerate_id(&self, session: &mut Session) -> Result<()> {
        let Some(stale) = session.take_id() else {
            return Ok(());
        };
        if let Backend::Persisted(repository) = &self.inner.backend {
            repository.delete(&stale).await?;
        }
        Ok(())
    }

    /// Remove `session` and return a `Set-Cookie` value that expires it.
    ///
    /// # Errors
    ///
    /// Returns the repository error if a persisted session could not be
    /// deleted. [`SessionStorage::expired_cookie`] still clears the client.
    pub async fn destroy_session(&self, session: &Session) -> Result<String> {
        if let (Backend::Persisted(repository), Some(id)) = (&self.inner.backend, session.id()) {
            repository.delete(id).await?;
        }

        Ok(self.expired_cookie())
    }

    /// A `Set-Cookie` value that clears the session cookie.
    pub fn expired_cookie(&self) -> String {
        let mut cookie = self.base_cookie(String::new());
        cookie.set_max_age(time::Duration::ZERO);
        cookie.set_expires(time::OffsetDateTime::UNIX_EPOCH);
        cookie.to_string()
    }

    fn expires_at(&self) -> Option<DateTime<Utc>> {
        let max_age = chrono::Duration::from_std(self.inner.max_age?).ok()?;
        Utc::now().checked_add_signed(max_age)
    }

    fn find_cookie(&self, header: &str) -> Option<String> {
        Cookie::split_parse(header)
            .filter_map(|cookie| cookie.ok())
            .find(|cookie| cookie.name() == self.inner.name)
            .map(|cookie| cookie.value().to_string())
    }

    fn base_cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((self.inner.name.clone(), value))
            .path("/")
            .http_only(true)
            .secure(self.inner.secure)
            .same_site(SameSite::Lax)
            .build()
    }

    fn cookie_string(&self, value: String) -> String {
        let mut cookie = self.base_cookie(value);
        if let Some(seconds) = self
            .inner
            .max_age
            .and_then(|max_age| i64::try_from(max_age.as_secs()).ok())
        {
            cookie.set_max_age(time::Duration::seconds(seconds));
        }
        cookie.to_string()
    }
}

/// A lifetime must give a representable expiry date and `Max-Age`.
fn validate_max_age(max_age: Duration) -> Result<()> {
    let invalid = || SessionError::InvalidMaxAge(format!("{}s is out of range", max_age.as_secs()));

    let delta = chrono::Duration::from_std(max_age).map_err(|_| invalid())?;
    Utc::now().checked_add_signed(delta).ok_or_else(invalid)?;
    i64::try_from(max_age.as_secs()).map_err(|_| invalid())?;
    Ok(())
}

/// The `name=value` pair of a `Set-Cookie` value, usable as a `Cookie` header.
#[cfg(test)]
pub(crate) fn cookie_pair(set_cookie: &str) -> &str {
    set_cookie.split(';').next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::InMemorySessionRepository;
    use serde_json::json;

    fn config() -> SessionConfig {
        SessionConfig::default().with_secret("s3cr3t")
    }

    #[tokio::test]
    async fn no_cookie_is_an_empty_session() {
        let storage = SessionStorage::for_tests();
        assert!(storage.get_session(None).await.is_empty());
        assert!(storage.get_session(Some("other=1")).await.is_empty());
    }

    #[tokio::test]
    async fn committed_session_reads_back() {
        let storage = SessionStorage::cookie(config()).unwrap();
        let mut session = Session::new();
        session.set("user", json!({"name": "ada"}));

        let set_cookie = storage.commit_session(&mut session).await.unwrap();
        assert!(set_cookie.starts_with("_session="));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Lax"));
        assert!(set_cookie.contains("Path=/"));
        assert!(!set_cookie.contains("Secure"));

        let header = format!("theme=x; {}", cookie_pair(&set_cookie));
        let mut read = storage.get_session(Some(&header)).await;
        assert_eq!(read.get("user"), Some(json!({"name": "ada"})));
    }

    #[tokio::test]
    async fn tampered_cookie_is_ignored() {
        let storage = SessionStorage::cookie(config()).unwrap();
        let mut session = Session::new();
        session.set("user", json!("ada"));
        let set_cookie = storage.commit_session(&mut session).await.unwrap();

        let other = SessionStorage::cookie(SessionConfig::default().with_secret("other")).unwrap();
        assert!(other
            .get_session(Some(cookie_pair(&set_cookie)))
            .await
            .is_empty());

        assert!(storage
            .get_session(Some("_session=garbage.value"))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn production_sets_secure() {
        let storage = SessionStorage::cookie(SessionConfig {
            production: true,
            ..config()
        })
        .unwrap();

        let set_cookie = storage.commit_session(&mut Session::new()).await.unwrap();
        assert!(set_cookie.contains("Secure"));
    }

    #[tokio::test]
    async fn max_age_is_applied() {
        let storage = SessionStorage::cookie(SessionConfig {
            max_age: Some(Duration::from_secs(60)),
            ..config()
        })
        .unwrap();

        let set_cookie = storage.commit_session(&mut Session::new()).await.unwrap();
        assert!(set_cookie.contains("Max-Age=60"));
    }

    #[tokio::test]
    async fn out_of_range_max_age_is_refused() {
        for secs in [1_000_000_000_000_000, u64::MAX] {
            let result = SessionStorage::cookie(SessionConfig {
                max_age: Some(Duration::from_secs(secs)),
                ..config()
            });
            assert!(matches!(result, Err(SessionError::InvalidMaxAge(_))));
        }

        // Ten years is fine.
        let storage = SessionStorage::cookie(SessionConfig {
            max_age: Some(Duration::from_secs(315_360_000)),
            ..config()
        })
        .unwrap();
        let set_cookie = storage.commit_session(&mut Session::new()).await.unwrap();
        assert!(set_cookie.contains("Max-Age=315360000"));
    }

    #[tokio::test]
    async fn destroy_expires_cookie() {
        let storage = SessionStorage::cookie(config()).unwrap();

        let set_cookie = storage.destroy_session(&Session::new()).await.unwrap();
        assert!(set_cookie.starts_with("_session=;"));
        assert!(set_cookie.contains("Max-Age=0"));
        assert!(set_cookie.contains("1970"));
    }

    #[test]
    fn missing_secret_is_refused() {
        let result = SessionStorage::build(SessionConfig::default(), Backend::Cookie, |_| None);
        assert!(matches!(result, Err(SessionError::MissingSecret)));
    }

    #[test]
    fn env_secret_is_used() {
        let result = SessionStorage::build(SessionConfig::default(), Backend::Cookie, |_| {
            Some("from-env".into())
        });
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn persisted_sessions_keep_payload_server_side() {
        let repository = Arc::new(InMemorySessionRepository::new());
        let storage = SessionStorage::persisted(config(), repository.clone()).unwrap();

        let mut session = Session::new();
        session.set("user", json!("ada"));
        let set_cookie = storage.commit_session(&mut session).await.unwrap();
        let id = session.id().cloned().unwrap();

        assert!(set_cookie.contains(id.as_str()));
        assert!(!set_cookie.contains("ada"));
        assert_eq!(repository.len().await, 1);

        let mut read = storage.get_session(Some(cookie_pair(&set_cookie))).await;
        assert_eq!(read.id(), Some(&id));
        assert_eq!(read.get("user"), Some(json!("ada")));

        // A second commit updates in place.
        read.set("user", json!("grace"));
        storage.commit_session(&mut read).await.unwrap();
        assert_eq!(repository.len().await, 1);

        storage.destroy_session(&read).await.unwrap();
        assert!(repository.is_empty().await);
        assert!(storage
            .get_session(Some(cookie_pair(&set_cookie)))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn regenerate_id_moves_persisted_values() {
        let repository = Arc::new(InMemorySessionRepository::new());
        let storage = SessionStorage::persisted(config(), repository.clone()).unwrap();

        let mut session = Session::new();
        session.set("theme", json!("dark"));
        let before = storage.commit_session(&mut session).await.unwrap();
        let old_id = session.id().cloned().unwrap();

        let mut session = storage.get_session(Some(cookie_pair(&before))).await;
        storage.regenerate_id(&mut session).await.unwrap();
        assert_eq!(session.id(), None);
        let after = storage.commit_session(&mut session).await.unwrap();

        assert_ne!(cookie_pair(&before), cookie_pair(&after));
        assert_ne!(session.id(), Some(&old_id));
        assert_eq!(repository.len().await, 1);

        // The old cookie no longer resolves.
        assert!(storage
            .get_session(Some(cookie_pair(&before)))
            .await
            .is_empty());
        let mut read = storage.get_session(Some(cookie_pair(&after))).await;
        assert_eq!(read.get("theme"), Some(json!("dark")));
    }
}
