//! Multi-provider OAuth2 login on top of the route registry.
//!
//! For every provider, [`Auth::register`] adds:
//! - `auth/provider/<id>` loader: redirects to the login page
//! - `auth/provider/<id>` action: starts the login
//! - `auth/callback/<id>` loader: finishes the login
//!
//! One shared `auth/logout` action is added when the orchestrator is built.

use std::{future::Future, sync::Arc};

use axum::http::{HeaderMap, StatusCode};
use futures_util::future::FutureExt;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use splatkit_core::{
    api::{ApiError, VerbClass},
    auth::{
        derive_provider_route, AuthContext, AuthError, AuthOutcome, AuthPhase,
        AuthenticateOptions, LogoutMode, Profile, ProviderRoute, RegisteredProvider, Strategy,
    },
};

use crate::{
    api::{Api, RouteRequest, RouteResponse},
    authenticator::{Authenticator, LogoutOptions, VerifyFn, LOGIN_PATH},
    error::Error,
    sessions::SessionStorage,
};

type BuildFn = Box<dyn FnOnce(&ProviderRoute) -> Result<Arc<dyn Strategy>, AuthError> + Send>;

/// A provider waiting to be registered with [`Auth`].
pub struct ProviderRegistration<U> {
    provider: String,
    name: Option<String>,
    build: BuildFn,
    verify: Option<VerifyFn<U>>,
}

impl<U> ProviderRegistration<U> {
    /// Register `provider` with a strategy built from its derived routes.
    ///
    /// `build` receives the routes so the strategy can be configured with the
    /// public callback URL.
    pub fn new<S, F>(provider: impl Into<String>, build: F) -> Self
    where
        S: Strategy + 'static,
        F: FnOnce(&ProviderRoute) -> Result<S, AuthError> + Send + 'static,
    {
        Self {
            provider: provider.into(),
            name: None,
            build: Box::new(move |route| Ok(Arc::new(build(route)?) as Arc<dyn Strategy>)),
            verify: None,
        }
    }

    /// Register an already-built strategy under its own provider id.
    pub fn strategy<S: Strategy + 'static>(strategy: S) -> Self {
        Self {
            provider: strategy.provider().to_string(),
            name: None,
            build: Box::new(move |_| Ok(Arc::new(strategy) as Arc<dyn Strategy>)),
            verify: None,
        }
    }

    /// Display label (default: the provider id).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Map the strategy's profile into the application's user.
    pub fn verify<F, Fut>(mut self, verify: F) -> Self
    where
        F: Fn(Profile) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<U, AuthError>> + Send + 'static,
    {
        self.verify = Some(Arc::new(move |profile| verify(profile).boxed()));
        self
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }
}

/// Account fields shown by a signed-in UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDetails {
    pub username: String,
    pub profile_picture: String,
}

/// [`AccountDetails`] plus the route that logs the user out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    #[serde(flatten)]
    pub details: AccountDetails,
    pub logout_route: String,
}

/// Auth orchestrator.
///
/// Holds the registered providers in registration order. Route callbacks
/// capture their own handle on the authenticator, so the orchestrator can be
/// dropped or moved after the registry is mounted.
pub struct Auth<U> {
    authenticator: Authenticator<U>,
    providers: Vec<RegisteredProvider>,
    logout_route: String,
    logout_mode: LogoutMode,
}

impl<U> Auth<U>
where
    U: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Build an orchestrator whose logout route answers with a redirect.
    pub fn new(api: &mut Api, storage: SessionStorage) -> Self {
        Self::with_logout_mode(api, storage, LogoutMode::Redirect)
    }

    /// Build an orchestrator and register the shared logout route.
    pub fn with_logout_mode(api: &mut Api, storage: SessionStorage, mode: LogoutMode) -> Self {
        let authenticator = Authenticator::new(storage);

        let route = api.route(&["auth", "logout"]);
        let logout_route = api.format(false, &[route.as_str()]).unwrap_or_default();

        let logout = authenticator.clone();
        api.register(&route, VerbClass::Action, move |request: RouteRequest| {
            let logout = logout.clone();
            async move { logout_response(&logout, request.headers(), mode).await }
        });

        tracing::debug!(route = %logout_route, ?mode, "logout route registered");

        Self {
            authenticator,
            providers: Vec::new(),
            logout_route,
            logout_mode: mode,
        }
    }

    /// Build an orchestrator and register each provider in order.
    ///
    /// # Errors
    ///
    /// Fails on the first provider that cannot be registered.
    pub fn from_providers(
        api: &mut Api,
        storage: SessionStorage,
        providers: impl IntoIterator<Item = ProviderRegistration<U>>,
    ) -> Result<Self, Error> {
        let mut auth = Self::new(api, storage);
        for provider in providers {
            auth.register(api, provider)?;
        }
        Ok(auth)
    }

    /// Register a provider and its three routes.
    ///
    /// # Errors
    ///
    /// - `DuplicateProvider` if the id is already registered here
    /// - `MissingWebsiteUrl` if the registry has no site origin
    /// - `Config` if the built strategy reports a different provider id
    /// - Any error returned by the strategy builder
    pub fn register(
        &mut self,
        api: &mut Api,
        registration: ProviderRegistration<U>,
    ) -> Result<RegisteredProvider, Error> {
        let ProviderRegistration {
            provider,
            name,
            build,
            verify,
        } = registration;

        if self.authenticator.has_strategy(&provider) {
            return Err(AuthError::DuplicateProvider(provider).into());
        }

        let origin = api.website_url().ok_or(ApiError::MissingWebsiteUrl)?;
        let route = derive_provider_route(&provider, origin.as_str(), api.endpoint_prefix());

        let strategy = build(&route)?;
        if strategy.provider() != provider {
            return Err(AuthError::Config(format!(
                "strategy for '{provider}' reports provider '{}'",
                strategy.provider()
            ))
            .into());
        }
        self.authenticator.use_strategy(strategy, verify)?;

        api.register(&route.default, VerbClass::Loader, |_| async {
            RouteResponse::redirect(LOGIN_PATH)
        });

        let initiate = self.authenticator.clone();
        let id = provider.clone();
        api.register(&route.default, VerbClass::Action, move |request: RouteRequest| {
            let auth = initiate.clone();
            let id = id.clone();
            async move {
                let options = AuthenticateOptions {
                    context: Some(AuthContext::new(AuthPhase::Initiate)),
                    ..AuthenticateOptions::default()
                };
                into_response(&id, auth.authenticate(&id, &request, options).await)
            }
        });

        let callback = self.authenticator.clone();
        let id = provider.clone();
        api.register(&route.callback, VerbClass::Loader, move |request: RouteRequest| {
            let auth = callback.clone();
            let id = id.clone();
            async move {
                let options = AuthenticateOptions {
                    success_redirect: Some("/".to_string()),
                    failure_redirect: Some(LOGIN_PATH.to_string()),
                    context: Some(AuthContext::new(AuthPhase::Callback)),
                };
                into_response(&id, auth.authenticate(&id, &request, options).await)
            }
        });

        let registered = RegisteredProvider {
            name: name.unwrap_or_else(|| provider.clone()),
            provider,
            route,
        };
        tracing::info!(
            provider = %registered.provider,
            callback = %registered.route.full_callback,
            "provider registered"
        );

        self.providers.push(registered.clone());
        Ok(registered)
    }

    /// Providers in registration order.
    pub fn registered_providers(&self) -> &[RegisteredProvider] {
        &self.providers
    }

    /// Public path of the logout route.
    pub fn logout_route(&self) -> &str {
        &self.logout_route
    }

    pub fn logout_mode(&self) -> LogoutMode {
        self.logout_mode
    }

    /// Find a provider by id or display name.
    pub fn get_provider(&self, name: &str) -> Option<&RegisteredProvider> {
        self.providers
            .iter()
            .find(|p| p.provider == name || p.name == name)
    }

    pub fn authenticator(&self) -> &Authenticator<U> {
        &self.authenticator
    }

    pub async fn get_account(&self, headers: &HeaderMap) -> Option<U> {
        self.authenticator.is_authenticated(headers).await
    }

    /// The current account, or a redirect to the login page.
    pub async fn required_account(&self, headers: &HeaderMap) -> AuthOutcome<U> {
        self.authenticator.require_authenticated(headers).await
    }

    /// Authenticate a request with a registered provider.
    ///
    /// # Errors
    ///
    /// See [`Authenticator::authenticate`].
    pub async fn auth(
        &self,
        provider: &str,
        request: &RouteRequest,
        options: AuthenticateOptions,
    ) -> Result<AuthOutcome<U>, AuthError> {
        self.authenticator.authenticate(provider, request, options).await
    }

    /// Log out the way the logout route does.
    pub async fn logout(&self, headers: &HeaderMap) -> RouteResponse {
        logout_response(&self.authenticator, headers, self.logout_mode).await
    }

    /// The current account projected for display, or `None` when anonymous.
    pub async fn account_summary<F>(&self, headers: &HeaderMap, process: F) -> Option<AccountSummary>
    where
        F: FnOnce(&U) -> AccountDetails,
    {
        let user = self.get_account(headers).await?;
        Some(AccountSummary {
            details: process(&user),
            logout_route: self.logout_route.clone(),
        })
    }
}

async fn logout_response<U>(
    authenticator: &Authenticator<U>,
    headers: &HeaderMap,
    mode: LogoutMode,
) -> RouteResponse
where
    U: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    match mode {
        LogoutMode::Redirect => {
            authenticator
                .logout_response(headers, LogoutOptions::default())
                .await
        }
        LogoutMode::Return => {
            let redirect = authenticator.logout(headers, LogoutOptions::default()).await;
            let body = json!({ "location": redirect.location, "headers": redirect.headers });
            redirect
                .set_cookies()
                .fold(RouteResponse::json(StatusCode::OK, body), |response, cookie| {
                    response.with_set_cookie(cookie)
                })
        }
    }
}

fn into_response<U>(provider: &str, result: Result<AuthOutcome<U>, AuthError>) -> RouteResponse {
    match result {
        Ok(AuthOutcome::RedirectRequired(redirect)) => redirect.into(),
        Ok(AuthOutcome::Authenticated(_)) => RouteResponse::redirect("/"),
        Err(e) => {
            tracing::warn!(%provider, error = %e, "login failed, returning to login page");
            RouteResponse::redirect(LOGIN_PATH)
        }
    }
}
