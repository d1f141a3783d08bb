use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a session secret is required: pass one explicitly or set COOKIE_AUTH_SECRET")]
    MissingSecret,

    #[error("invalid session max age: {0}")]
    InvalidMaxAge(String),

    #[error("failed to serialize session payload: {0}")]
    Serialize(String),

    #[error("session storage error: {0}")]
    Storage(String),
}
