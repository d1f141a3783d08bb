//! Credential-exchange strategies.
//!
//! - Generic OAuth2 authorization-code flow with PKCE ([`OAuth2Provider`])
//! - GitHub preset ([`ProviderConfig::github`])
//! - Mock provider for local development (with `mock` feature)

mod generic;
mod github;
#[cfg(feature = "mock")]
mod mock;

pub use generic::{OAuth2Provider, ProfileFields, ProviderConfig};
#[cfg(feature = "mock")]
pub use mock::MockProvider;
