use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Routes derived for a registered provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRoute {
    /// Login initiation route.
    pub default: String,
    /// OAuth2 callback route.
    pub callback: String,
    /// Absolute callback URL including the site origin.
    pub full_callback: String,
}

/// A provider registered with an auth orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredProvider {
    /// Display label. Defaults to the provider id.
    pub name: String,
    /// Stable provider id.
    pub provider: String,
    pub route: ProviderRoute,
}

/// Provider-neutral profile produced by a strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Which provider issued this profile.
    pub provider: String,
    /// Provider's unique user identifier.
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    /// Unmodified profile document from the provider.
    #[serde(default)]
    pub raw: Value,
}

/// The parts of an HTTP request a strategy may inspect.
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    /// Request path and query.
    pub uri: String,
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
}

impl AuthRequest {
    /// Look up a parameter, query string first, then form body.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .chain(self.form.iter())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Which half of the two-phase login a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthPhase {
    /// Direct login attempt; the strategy redirects to the provider.
    Initiate,
    /// Re-entry from the provider's consent screen.
    Callback,
}

/// Context passed through to a strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthContext {
    pub phase: AuthPhase,
    /// Arbitrary caller-defined values.
    pub extra: serde_json::Map<String, Value>,
}

impl AuthContext {
    pub fn new(phase: AuthPhase) -> Self {
        Self {
            phase,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Options for a single authentication attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthenticateOptions {
    /// Where to send the user once the session is written.
    pub success_redirect: Option<String>,
    /// Where to send the user when the exchange fails.
    pub failure_redirect: Option<String>,
    /// When absent the phase is inferred from the presence of a `code`
    /// parameter.
    pub context: Option<AuthContext>,
}

/// A redirect target plus the headers to send with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirection {
    pub location: String,
    pub headers: Vec<(String, String)>,
}

impl Redirection {
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_set_cookie(self, cookie: impl Into<String>) -> Self {
        self.with_header("Set-Cookie", cookie)
    }

    /// All `Set-Cookie` values carried by this redirect.
    pub fn set_cookies(&self) -> impl Iterator<Item = &str> {
        self.headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("set-cookie"))
            .map(|(_, value)| value.as_str())
    }
}

/// Redirect target and headers produced by a logout.
pub type LogoutRedirect = Redirection;

/// How a logout route answers. Fixed per orchestrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogoutMode {
    /// Respond with the redirect.
    #[default]
    Redirect,
    /// Respond with the [`LogoutRedirect`] as JSON so the client can follow it.
    Return,
}

/// Outcome of an authentication check or attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome<U> {
    Authenticated(U),
    RedirectRequired(Redirection),
}

impl<U> AuthOutcome<U> {
    pub fn user(self) -> Option<U> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::RedirectRequired(_) => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn param_prefers_query() {
        let request = AuthRequest {
            uri: "/auth/callback/github?code=q".into(),
            query: vec![("code".into(), "q".into())],
            form: vec![("code".into(), "f".into()), ("return_to".into(), "/x".into())],
        };

        assert_eq!(request.param("code"), Some("q"));
        assert_eq!(request.param("return_to"), Some("/x"));
        assert_eq!(request.param("state"), None);
    }

    #[test]
    fn redirection_collects_set_cookies() {
        let redirect = Redirection::to("/")
            .with_header("X-Trace", "1")
            .with_set_cookie("_session=a")
            .with_header("set-cookie", "other=b");

        assert_eq!(redirect.location, "/");
        assert_eq!(
            redirect.set_cookies().collect::<Vec<_>>(),
            vec!["_session=a", "other=b"]
        );
    }

    #[test]
    fn outcome_user() {
        let ok: AuthOutcome<u32> = AuthOutcome::Authenticated(7);
        assert!(ok.is_authenticated());
        assert_eq!(ok.user(), Some(7));

        let redirect: AuthOutcome<u32> = AuthOutcome::RedirectRequired(Redirection::to("/login"));
        assert!(!redirect.is_authenticated());
        assert_eq!(redirect.user(), None);
    }

    #[test]
    fn provider_route_serializes_camel_case() {
        let route = ProviderRoute {
            default: "auth/provider/github".into(),
            callback: "auth/callback/github".into(),
            full_callback: "https://example.com/auth/callback/github".into(),
        };

        let value = serde_json::to_value(&route).unwrap();
        assert_eq!(value["fullCallback"], json!("https://example.com/auth/callback/github"));
    }
}
