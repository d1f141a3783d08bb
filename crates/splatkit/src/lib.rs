//! Dynamic route registration, OAuth2 login and cookie sessions for axum.
//!
//! This crate provides:
//! - A route registry dispatched from a single splat route ([`Api`])
//! - Signed cookie sessions, optionally persisted server-side ([`SessionStorage`])
//! - A multi-provider OAuth2 login/logout flow ([`Auth`], [`Authenticator`])
//! - A cookie-backed color scheme preference ([`Theme`])
//! - Axum extractors for the authenticated user

mod api;
mod auth;
mod authenticator;
mod config;
mod error;
mod extractors;
mod icons;
mod providers;
mod sessions;
mod theme;

pub use api::{Api, RouteCallback, RouteFuture, RouteRequest, RouteResponse};
pub use auth::{AccountDetails, AccountSummary, Auth, ProviderRegistration};
pub use authenticator::{
    Authenticator, LogoutOptions, VerifyFn, LOGIN_PATH, RETURN_TO_KEY, SESSION_KEY, STRATEGY_KEY,
};
pub use config::{ApiConfig, SessionConfig};
pub use error::Error;
pub use extractors::{CurrentUser, OptionalUser};
pub use icons::{scan_icon_dir, IconAsset};
#[cfg(feature = "mock")]
pub use providers::MockProvider;
pub use providers::{OAuth2Provider, ProfileFields, ProviderConfig};
#[cfg(feature = "sqlite")]
pub use sessions::SqliteSessionRepository;
pub use sessions::{InMemorySessionRepository, SessionStorage};
pub use theme::{OnChange, OnGet, Theme, ThemeConfig, ThemeState};

pub use splatkit_core::{
    api::VerbClass,
    auth::{
        AuthContext, AuthError, AuthOutcome, AuthPhase, AuthRequest, AuthenticateOptions, LogoutMode,
        LogoutRedirect, Profile, ProviderRoute, Redirection, RegisteredProvider, Strategy,
    },
    session::{Session, SessionError, SessionId, SessionRepository, SessionValues},
    theme::{ColorScheme, SetTheme, ValidationErrors},
};
