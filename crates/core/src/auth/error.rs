use thiserror::Error;

use crate::session::SessionError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no strategy registered for provider: {0}")]
    UnknownProvider(String),

    #[error("provider already registered: {0}")]
    DuplicateProvider(String),

    #[error("invalid OAuth2 state parameter")]
    InvalidState,

    #[error("missing request parameter: {0}")]
    MissingParameter(String),

    #[error("failed to exchange authorization code: {0}")]
    CodeExchange(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("user verification failed: {0}")]
    Verify(String),

    #[error("invalid provider configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}
