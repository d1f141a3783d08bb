use async_trait::async_trait;

use super::{AuthContext, AuthError, AuthRequest, Profile};
use crate::session::Session;

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// A provider-specific credential exchange.
///
/// Each OAuth2 provider is one implementation, constructed with its own
/// options and the full callback URL it was registered under. Any state the
/// exchange needs between the two phases (CSRF state, PKCE verifier) goes
/// into the client's session, never into process memory.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Stable provider id, e.g. `github`.
    fn provider(&self) -> &str;

    /// Start a login: return the provider's consent URL.
    async fn initiate(&self, request: &AuthRequest, session: &mut Session) -> Result<String>;

    /// Finish a login from the provider's callback request.
    async fn exchange_callback(
        &self,
        request: &AuthRequest,
        session: &mut Session,
        context: &AuthContext,
    ) -> Result<Profile>;
}
