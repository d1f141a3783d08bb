use async_trait::async_trait;
use oauth2::{
    basic::BasicClient, reqwest::async_http_client, AuthUrl, AuthorizationCode, ClientId,
    ClientSecret, CsrfToken, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope,
    TokenResponse, TokenUrl,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use splatkit_core::{
    auth::{
        generate_state, AuthContext, AuthError, AuthRequest, Profile, ProviderRoute, Result,
        Strategy,
    },
    session::Session,
};

use crate::auth::ProviderRegistration;

/// Keys to look up, in order, when mapping a provider's profile document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFields {
    pub id: Vec<String>,
    pub display_name: Vec<String>,
    pub email: Vec<String>,
    pub avatar_url: Vec<String>,
}

impl Default for ProfileFields {
    fn default() -> Self {
        fn keys(keys: &[&str]) -> Vec<String> {
            keys.iter().map(|k| k.to_string()).collect()
        }

        Self {
            id: keys(&["id", "sub"]),
            display_name: keys(&["name", "login", "preferred_username"]),
            email: keys(&["email"]),
            avatar_url: keys(&["avatar_url", "picture"]),
        }
    }
}

impl ProfileFields {
    /// Map a profile document into a [`Profile`].
    ///
    /// # Errors
    ///
    /// Returns a provider error when no id field is present.
    pub fn extract(&self, provider: &str, raw: Value) -> Result<Profile> {
        let id = first(&raw, &self.id).ok_or_else(|| {
            AuthError::Provider(format!("{provider} profile has no id field"))
        })?;

        Ok(Profile {
            provider: provider.to_string(),
            id,
            display_name: first(&raw, &self.display_name),
            email: first(&raw, &self.email),
            avatar_url: first(&raw, &self.avatar_url),
            raw,
        })
    }
}

/// First non-empty string or number among `keys`.
fn first(raw: &Value, keys: &[String]) -> Option<String> {
    keys.iter().find_map(|key| match raw.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// OAuth2 provider endpoints and credentials.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Stable provider id, e.g. `github`.
    pub provider: String,
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    /// Endpoint returning the user's profile for an access token.
    pub profile_url: String,
    pub scopes: Vec<String>,
    pub profile_fields: ProfileFields,
}

impl ProviderConfig {
    /// A registration that builds an [`OAuth2Provider`] for the derived
    /// callback URL.
    pub fn into_registration<U>(self) -> ProviderRegistration<U> {
        let provider = self.provider.clone();
        ProviderRegistration::new(provider, move |route: &ProviderRoute| {
            OAuth2Provider::new(self, &route.full_callback)
        })
    }
}

/// Authorization-code flow with PKCE against a configured provider.
///
/// The CSRF state and PKCE verifier are kept in the client's session between
/// the two phases.
pub struct OAuth2Provider {
    config: ProviderConfig,
    client: BasicClient,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for OAuth2Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Provider")
            .field("provider", &self.config.provider)
            .field("auth_url", &self.config.auth_url)
            .finish_non_exhaustive()
    }
}

impl OAuth2Provider {
    /// Build a provider that redirects back to `callback_url`.
    ///
    /// # Errors
    ///
    /// Returns a config error if any URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: ProviderConfig, callback_url: &str) -> Result<Self> {
        let invalid = |what: &str, e: oauth2::url::ParseError| {
            AuthError::Config(format!("{}: invalid {what}: {e}", config.provider))
        };

        let client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            AuthUrl::new(config.auth_url.clone()).map_err(|e| invalid("auth URL", e))?,
            Some(TokenUrl::new(config.token_url.clone()).map_err(|e| invalid("token URL", e))?),
        )
        .set_redirect_uri(
            RedirectUrl::new(callback_url.to_string()).map_err(|e| invalid("callback URL", e))?,
        );

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("splatkit/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            http_client,
        })
    }

    fn state_key(&self) -> String {
        format!("oauth2:{}:state", self.config.provider)
    }

    fn verifier_key(&self) -> String {
        format!("oauth2:{}:verifier", self.config.provider)
    }

    async fn fetch<T: DeserializeOwned>(&self, access_token: &str) -> Result<T> {
        self.http_client
            .get(&self.config.profile_url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AuthError::Provider(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))
    }
}

#[async_trait]
impl Strategy for OAuth2Provider {
    fn provider(&self) -> &str {
        &self.config.provider
    }

    async fn initiate(&self, _request: &AuthRequest, session: &mut Session) -> Result<String> {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let state = generate_state();

        let (url, csrf) = self
            .client
            .authorize_url(move || CsrfToken::new(state))
            .add_scopes(self.config.scopes.iter().cloned().map(Scope::new))
            .set_pkce_challenge(pkce_challenge)
            .url();

        session.set(self.state_key(), csrf.secret().as_str().into());
        session.set(self.verifier_key(), pkce_verifier.secret().as_str().into());

        Ok(url.to_string())
    }

    async fn exchange_callback(
        &self,
        request: &AuthRequest,
        session: &mut Session,
        _context: &AuthContext,
    ) -> Result<Profile> {
        let expected = session.unset(&self.state_key());
        let verifier = session.unset(&self.verifier_key());

        if let Some(error) = request.param("error") {
            let description = request.param("error_description").unwrap_or_default();
            return Err(AuthError::Provider(format!("{error} {description}").trim().to_string()));
        }

        let state = request
            .param("state")
            .ok_or_else(|| AuthError::MissingParameter("state".to_string()))?;
        if expected.as_ref().and_then(Value::as_str) != Some(state) {
            return Err(AuthError::InvalidState);
        }

        let code = request
            .param("code")
            .ok_or_else(|| AuthError::MissingParameter("code".to_string()))?;
        let verifier = verifier
            .as_ref()
            .and_then(Value::as_str)
            .ok_or(AuthError::InvalidState)?;

        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(verifier.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| AuthError::CodeExchange(e.to_string()))?;

        let raw: Value = self.fetch(token.access_token().secret()).await?;
        self.config.profile_fields.extract(&self.config.provider, raw)
    }
}
