use super::{ProfileFields, ProviderConfig};

impl ProviderConfig {
    /// GitHub OAuth app endpoints.
    ///
    /// The callback URL configured on the GitHub app must be the provider's
    /// `full_callback`, e.g. `https://example.com/api/v1/auth/callback/github`.
    pub fn github(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            provider: "github".to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: "https://github.com/login/oauth/authorize".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            profile_url: "https://api.github.com/user".to_string(),
            scopes: vec!["read:user".to_string(), "user:email".to_string()],
            profile_fields: ProfileFields::default(),
        }
    }

    /// GitHub configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `GITHUB_CLIENT_ID`: OAuth app client ID (enables GitHub login)
    /// - `GITHUB_CLIENT_SECRET`: OAuth app client secret
    ///
    /// Returns `None` unless both are set.
    pub fn github_from_env() -> Option<Self> {
        let client_id = std::env::var("GITHUB_CLIENT_ID").ok()?;
        let client_secret = std::env::var("GITHUB_CLIENT_SECRET").ok()?;
        Some(Self::github(client_id, client_secret))
    }
}
