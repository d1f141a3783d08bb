use std::time::Duration;

use splatkit_core::{api::endpoint_prefix, session::SessionError};
use url::Url;

use crate::error::Error;

/// Environment variable holding the session signing secret.
pub const SECRET_ENV: &str = "COOKIE_AUTH_SECRET";

/// Route registry configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Public origin of the site. Required to build absolute URLs such as
    /// OAuth2 callbacks.
    pub website_url: Option<Url>,
    /// Version used in the default endpoint prefix (default: 1).
    pub api_version: u32,
    /// Overrides the endpoint prefix (default: `api/v{api_version}`).
    pub endpoint_format: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            website_url: None,
            api_version: 1,
            endpoint_format: None,
        }
    }
}

impl ApiConfig {
    pub fn new(website_url: Url) -> Self {
        Self {
            website_url: Some(website_url),
            ..Self::default()
        }
    }

    /// Load from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `WEBSITE_URL`: Public origin of the site (optional)
    /// - `API_VERSION`: API version for the endpoint prefix (default: 1)
    /// - `API_ENDPOINT_FORMAT`: Custom endpoint prefix (optional)
    ///
    /// # Errors
    ///
    /// Returns an error if `WEBSITE_URL` is set but is not a valid URL.
    pub fn from_env() -> Result<Self, Error> {
        let website_url = match std::env::var("WEBSITE_URL") {
            Ok(raw) => Some(
                raw.parse()
                    .map_err(|e| Error::Config(format!("WEBSITE_URL: {e}")))?,
            ),
            Err(_) => None,
        };

        let api_version = std::env::var("API_VERSION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);

        Ok(Self {
            website_url,
            api_version,
            endpoint_format: std::env::var("API_ENDPOINT_FORMAT").ok(),
        })
    }

    /// Endpoint prefix routes are mounted under.
    pub fn endpoint_prefix(&self) -> String {
        match &self.endpoint_format {
            Some(format) => format.clone(),
            None => endpoint_prefix(self.api_version),
        }
    }
}

/// Session cookie configuration.
///
/// Cookie attributes other than these are fixed: `SameSite=Lax`, `Path=/`,
/// `HttpOnly`.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Cookie name (default: `_session`).
    pub name: String,
    /// Signing secret. Falls back to `COOKIE_AUTH_SECRET` when `None`.
    pub secret: Option<String>,
    /// Production deployments set the `Secure` attribute.
    pub production: bool,
    /// Cookie lifetime. `None` makes a browser-session cookie.
    pub max_age: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "_session".to_string(),
            secret: None,
            production: false,
            max_age: None,
        }
    }
}

impl SessionConfig {
    /// Load from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `COOKIE_AUTH_SECRET`: Signing secret
    /// - `APP_ENV`: `production` enables the `Secure` cookie attribute
    /// - `SESSION_MAX_AGE_SECONDS`: Cookie lifetime (optional)
    pub fn from_env() -> Self {
        Self {
            name: "_session".to_string(),
            secret: std::env::var(SECRET_ENV).ok(),
            production: std::env::var("APP_ENV").is_ok_and(|v| v == "production"),
            max_age: std::env::var("SESSION_MAX_AGE_SECONDS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Resolve the signing secret, consulting `env` when none was given.
    ///
    /// # Errors
    ///
    /// Returns `MissingSecret` when neither source yields a non-empty value.
    pub fn resolve_secret(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<String, SessionError> {
        self.secret
            .clone()
            .or_else(|| env(SECRET_ENV))
            .filter(|secret| !secret.is_empty())
            .ok_or(SessionError::MissingSecret)
    }
}
