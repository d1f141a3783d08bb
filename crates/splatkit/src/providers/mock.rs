//! Mock provider for development and testing.
//!
//! The consent redirect points straight back at the callback with a code that
//! embeds the user's profile, so a full login runs without any external
//! service.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::{json, Value};
use splatkit_core::{
    auth::{generate_state, AuthContext, AuthError, AuthRequest, Profile, Result, Strategy},
    session::Session,
};
use url::Url;

const STATE_KEY: &str = "mock:state";

/// Mock provider that signs anyone in.
///
/// The login form may post `email` and `name`; otherwise a default
/// development user is used.
#[derive(Debug, Clone)]
pub struct MockProvider {
    provider: String,
    callback_url: Url,
}

impl MockProvider {
    /// Create a new MockProvider.
    ///
    /// # Arguments
    /// * `provider` - The provider id to register under (e.g. `mock`)
    /// * `callback_url` - The provider's full callback URL
    ///
    /// # Errors
    ///
    /// Returns a config error if `callback_url` is not a valid URL.
    pub fn new(provider: impl Into<String>, callback_url: &str) -> Result<Self> {
        let callback_url =
            Url::parse(callback_url).map_err(|e| AuthError::Config(e.to_string()))?;
        Ok(Self {
            provider: provider.into(),
            callback_url,
        })
    }

    /// Encode a user the way the consent redirect does.
    pub fn encode_code(user: &Value) -> String {
        URL_SAFE_NO_PAD.encode(user.to_string())
    }
}

#[async_trait]
impl Strategy for MockProvider {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn initiate(&self, request: &AuthRequest, session: &mut Session) -> Result<String> {
        let email = request.param("email").unwrap_or("dev@example.com");
        let name = request.param("name").unwrap_or("Dev User");
        let user = json!({
            "sub": format!("mock-{email}"),
            "email": email,
            "name": name,
        });

        let state = generate_state();
        session.set(STATE_KEY, state.as_str().into());

        let mut url = self.callback_url.clone();
        url.query_pairs_mut()
            .append_pair("code", &Self::encode_code(&user))
            .append_pair("state", &state);

        Ok(url.to_string())
    }

    async fn exchange_callback(
        &self,
        request: &AuthRequest,
        session: &mut Session,
        _context: &AuthContext,
    ) -> Result<Profile> {
        let expected = session.unset(STATE_KEY);
        match (expected.as_ref().and_then(Value::as_str), request.param("state")) {
            (Some(expected), Some(state)) if expected == state => {}
            _ => return Err(AuthError::InvalidState),
        }

        let code = request
            .param("code")
            .ok_or_else(|| AuthError::MissingParameter("code".to_string()))?;

        // Decode the mock code (it contains the user info)
        let decoded = URL_SAFE_NO_PAD
            .decode(code)
            .map_err(|e| AuthError::CodeExchange(e.to_string()))?;
        let raw: Value =
            serde_json::from_slice(&decoded).map_err(|e| AuthError::CodeExchange(e.to_string()))?;

        Ok(Profile {
            provider: self.provider.clone(),
            id: raw["sub"].as_str().unwrap_or("mock-user").to_string(),
            display_name: raw["name"].as_str().map(String::from),
            email: raw["email"].as_str().map(String::from),
            avatar_url: None,
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splatkit_core::auth::AuthPhase;

    fn provider() -> MockProvider {
        MockProvider::new("mock", "http://localhost:3000/api/v1/auth/callback/mock").unwrap()
    }

    fn request(query: Vec<(String, String)>) -> AuthRequest {
        AuthRequest {
            uri: "/api/v1/auth/callback/mock".into(),
            query,
            form: Vec::new(),
        }
    }

    fn context() -> AuthContext {
        AuthContext::new(AuthPhase::Callback)
    }

    #[tokio::test]
    async fn test_initiate_points_at_callback() {
        let mut session = Session::new();
        let location = provider()
            .initiate(&AuthRequest::default(), &mut session)
            .await
            .unwrap();

        let url = Url::parse(&location).unwrap();
        assert_eq!(url.path(), "/api/v1/auth/callback/mock");
        assert!(url.query().unwrap().contains("code="));
        assert!(session.has(STATE_KEY));
    }

    #[tokio::test]
    async fn test_round_trip() {
        let provider = provider();
        let mut session = Session::new();
        let initiate = AuthRequest {
            form: vec![
                ("email".into(), "test@example.com".into()),
                ("name".into(), "Test User".into()),
            ],
            ..AuthRequest::default()
        };

        let location = provider.initiate(&initiate, &mut session).await.unwrap();
        let query = Url::parse(&location)
            .unwrap()
            .query_pairs()
            .into_owned()
            .collect();

        let profile = provider
            .exchange_callback(&request(query), &mut session, &context())
            .await
            .unwrap();

        assert_eq!(profile.provider, "mock");
        assert_eq!(profile.id, "mock-test@example.com");
        assert_eq!(profile.email, Some("test@example.com".to_string()));
        assert_eq!(profile.display_name, Some("Test User".to_string()));
    }

    #[tokio::test]
    async fn test_exchange_code_invalid() {
        let mut session = Session::new();
        session.set(STATE_KEY, "s".into());

        let result = provider()
            .exchange_callback(
                &request(vec![
                    ("code".into(), "invalid code!".into()),
                    ("state".into(), "s".into()),
                ]),
                &mut session,
                &context(),
            )
            .await;
        assert!(matches!(result, Err(AuthError::CodeExchange(_))));
    }

    #[tokio::test]
    async fn test_state_mismatch() {
        let code = MockProvider::encode_code(&json!({ "sub": "x" }));
        let result = provider()
            .exchange_callback(
                &request(vec![("code".into(), code), ("state".into(), "forged".into())]),
                &mut Session::new(),
                &context(),
            )
            .await;
        assert!(matches!(result, Err(AuthError::InvalidState)));
    }
}
