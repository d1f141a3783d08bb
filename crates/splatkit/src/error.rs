use std::path::PathBuf;

use splatkit_core::{api::ApiError, auth::AuthError, session::SessionError};
use thiserror::Error;

/// Errors for the splatkit crate.
///
/// These surface while an application is being assembled (missing secret,
/// missing website URL, unreadable icon asset, duplicate provider). Request
/// handling resolves every condition to a response instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_errors_convert() {
        let error = Error::from(SessionError::MissingSecret);
        assert!(matches!(error, Error::Session(SessionError::MissingSecret)));
        assert!(error.to_string().contains("COOKIE_AUTH_SECRET"));

        let error = Error::from(SessionError::InvalidMaxAge("1s".into()));
        assert!(error.to_string().contains("invalid session max age"));
    }

    #[test]
    fn io_error_names_the_path() {
        let error = Error::Io {
            path: PathBuf::from("/icons/star.svg"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(error.to_string().contains("/icons/star.svg"));
    }
}
