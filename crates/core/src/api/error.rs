use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("an origin was requested but no website URL is configured")]
    MissingWebsiteUrl,
}
