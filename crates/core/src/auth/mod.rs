mod error;
mod functions;
mod traits;
mod types;
mod validation;

pub use error::AuthError;
pub use functions::{derive_provider_route, generate_state, CALLBACK_SEGMENT, PROVIDER_SEGMENT};
pub use traits::{Result, Strategy};
pub use types::{
    AuthContext, AuthOutcome, AuthPhase, AuthRequest, AuthenticateOptions, LogoutMode, LogoutRedirect,
    Profile, ProviderRoute, Redirection, RegisteredProvider,
};
pub use validation::validate_return_to;
