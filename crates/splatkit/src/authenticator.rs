//! Session-aware wrapper around the registered credential-exchange strategies.

use std::sync::Arc;

use axum::http::HeaderMap;
use futures_util::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};
use splatkit_core::auth::{
    validate_return_to, AuthContext, AuthError, AuthOutcome, AuthPhase, AuthenticateOptions,
    LogoutRedirect, Profile, Redirection, Strategy,
};

use crate::{
    api::{RouteRequest, RouteResponse},
    sessions::SessionStorage,
};

/// Session key holding the authenticated user.
pub const SESSION_KEY: &str = "_auth";
/// Session key holding the provider id that authenticated the user.
pub const STRATEGY_KEY: &str = "_auth:strategy";
/// Session key holding a validated post-login destination.
pub const RETURN_TO_KEY: &str = "_auth:return_to";
/// Where anonymous users are sent when authentication is required.
pub const LOGIN_PATH: &str = "/login";

/// Maps a strategy's profile into the application's user type.
pub type VerifyFn<U> =
    Arc<dyn Fn(Profile) -> BoxFuture<'static, Result<U, AuthError>> + Send + Sync>;

/// Options for [`Authenticator::logout`].
#[derive(Debug, Clone)]
pub struct LogoutOptions {
    /// Destination once logged out (default: `/`).
    pub redirect_to: String,
    /// Extra headers added to the logout response.
    pub headers: Vec<(String, String)>,
}

impl Default for LogoutOptions {
    fn default() -> Self {
        Self {
            redirect_to: "/".to_string(),
            headers: Vec::new(),
        }
    }
}

impl LogoutOptions {
    pub fn redirect_to(mut self, location: impl Into<String>) -> Self {
        self.redirect_to = location.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

struct ProviderHandle<U> {
    strategy: Arc<dyn Strategy>,
    verify: Option<VerifyFn<U>>,
}

impl<U> Clone for ProviderHandle<U> {
    fn clone(&self) -> Self {
        Self {
            strategy: self.strategy.clone(),
            verify: self.verify.clone(),
        }
    }
}

impl<U> ProviderHandle<U>
where
    U: DeserializeOwned,
{
    async fn exchange(
        &self,
        request: &RouteRequest,
        session: &mut splatkit_core::session::Session,
        context: &AuthContext,
    ) -> Result<U, AuthError> {
        let profile = self
            .strategy
            .exchange_callback(&request.auth_request(), session, context)
            .await?;

        match &self.verify {
            Some(verify) => verify(profile).await,
            None => {
                let value =
                    serde_json::to_value(profile).map_err(|e| AuthError::Verify(e.to_string()))?;
                serde_json::from_value(value).map_err(|e| AuthError::Verify(e.to_string()))
            }
        }
    }
}

/// Tracks the registered strategies and the user stored in the session.
///
/// Strategies are added during startup; afterwards the authenticator is only
/// read. Cloning is cheap.
pub struct Authenticator<U> {
    storage: SessionStorage,
    strategies: Vec<(String, ProviderHandle<U>)>,
}

impl<U> Clone for Authenticator<U> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            strategies: self.strategies.clone(),
        }
    }
}

impl<U> std::fmt::Debug for Authenticator<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("storage", &self.storage)
            .field(
                "strategies",
                &self.strategies.iter().map(|(id, _)| id).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<U> Authenticator<U>
where
    U: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(storage: SessionStorage) -> Self {
        Self {
            storage,
            strategies: Vec::new(),
        }
    }

    pub fn storage(&self) -> &SessionStorage {
        &self.storage
    }

    /// Add a strategy under its provider id.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateProvider` if the id is already taken.
    pub fn use_strategy(
        &mut self,
        strategy: Arc<dyn Strategy>,
        verify: Option<VerifyFn<U>>,
    ) -> Result<(), AuthError> {
        let provider = strategy.provider().to_string();
        if self.has_strategy(&provider) {
            return Err(AuthError::DuplicateProvider(provider));
        }

        tracing::debug!(%provider, "strategy added");
        self.strategies
            .push((provider, ProviderHandle { strategy, verify }));
        Ok(())
    }

    pub fn has_strategy(&self, provider: &str) -> bool {
        self.strategies.iter().any(|(id, _)| id == provider)
    }

    /// Provider ids in registration order.
    pub fn strategies(&self) -> impl Iterator<Item = &str> {
        self.strategies.iter().map(|(id, _)| id.as_str())
    }

    /// The user stored in the session, if any.
    pub async fn is_authenticated(&self, headers: &HeaderMap) -> Option<U> {
        let mut session = self.storage.session_from_headers(headers).await;
        session.get_as(SESSION_KEY)
    }

    /// The user stored in the session, or a redirect to [`LOGIN_PATH`].
    pub async fn require_authenticated(&self, headers: &HeaderMap) -> AuthOutcome<U> {
        match self.is_authenticated(headers).await {
            Some(user) => AuthOutcome::Authenticated(user),
            None => AuthOutcome::RedirectRequired(Redirection::to(LOGIN_PATH)),
        }
    }

    /// Run one phase of a login through the named strategy.
    ///
    /// The phase comes from `options.context`, or is inferred from the
    /// presence of a `code` parameter.
    ///
    /// - Initiate: stores a validated `return_to` and whatever state the
    ///   strategy needs in the session, and redirects to the provider.
    /// - Callback success: stores the user and redirects to the stored
    ///   `return_to` or `success_redirect` with the new session cookie. With
    ///   neither, the user is returned and the session is left unwritten.
    /// - Callback failure: redirects to `failure_redirect` without touching
    ///   the session, or returns the error when no failure redirect is set.
    ///
    /// # Errors
    ///
    /// `UnknownProvider` for an unregistered provider id. Strategy and
    /// session errors propagate unless a failure redirect absorbs them.
    pub async fn authenticate(
        &self,
        provider: &str,
        request: &RouteRequest,
        options: AuthenticateOptions,
    ) -> Result<AuthOutcome<U>, AuthError> {
        let handle = self
            .strategies
            .iter()
            .find(|(id, _)| id == provider)
            .map(|(_, handle)| handle)
            .ok_or_else(|| AuthError::UnknownProvider(provider.to_string()))?;

        let auth_request = request.auth_request();
        let context = options.context.clone().unwrap_or_else(|| {
            let phase = if auth_request.param("code").is_some() {
                AuthPhase::Callback
            } else {
                AuthPhase::Initiate
            };
            AuthContext::new(phase)
        });

        let mut session = self.storage.session_from_headers(request.headers()).await;

        match context.phase {
            AuthPhase::Initiate => {
                if let Some(return_to) = auth_request.param("return_to").and_then(validate_return_to)
                {
                    session.set(RETURN_TO_KEY, return_to.into());
                }

                let location = handle.strategy.initiate(&auth_request, &mut session).await?;
                let cookie = self.storage.commit_session(&mut session).await?;

                tracing::debug!(%provider, "redirecting to provider");
                Ok(AuthOutcome::RedirectRequired(
                    Redirection::to(location).with_set_cookie(cookie),
                ))
            }
            AuthPhase::Callback => {
                let user = match handle.exchange(request, &mut session, &context).await {
                    Ok(user) => user,
                    Err(e) => {
                        tracing::warn!(%provider, error = %e, "authentication failed");
                        return match options.failure_redirect {
                            Some(location) => {
                                Ok(AuthOutcome::RedirectRequired(Redirection::to(location)))
                            }
                            None => Err(e),
                        };
                    }
                };

                let return_to = session
                    .unset(RETURN_TO_KEY)
                    .and_then(|value| value.as_str().map(str::to_string));
                let Some(location) = return_to.or(options.success_redirect) else {
                    return Ok(AuthOutcome::Authenticated(user));
                };

                let value = serde_json::to_value(&user)
                    .map_err(|e| AuthError::Verify(e.to_string()))?;
                // A session ID issued before login is never reused after it.
                if let Err(e) = self.storage.regenerate_id(&mut session).await {
                    tracing::warn!(%provider, error = %e, "failed to delete pre-login session");
                }
                session.set(SESSION_KEY, value);
                session.set(STRATEGY_KEY, provider.into());
                let cookie = self.storage.commit_session(&mut session).await?;

                tracing::info!(%provider, "user authenticated");
                Ok(AuthOutcome::RedirectRequired(
                    Redirection::to(location).with_set_cookie(cookie),
                ))
            }
        }
    }

    /// End the session and describe where to go next.
    ///
    /// Always carries an expiring session cookie, even when there was no
    /// session or the persisted copy could not be deleted.
    pub async fn logout(&self, headers: &HeaderMap, options: LogoutOptions) -> LogoutRedirect {
        let session = self.storage.session_from_headers(headers).await;

        let cookie = match self.storage.destroy_session(&session).await {
            Ok(cookie) => cookie,
            Err(e) => {
                tracing::warn!(error = %e, "failed to delete session, clearing cookie anyway");
                self.storage.expired_cookie()
            }
        };

        let mut redirect = Redirection::to(options.redirect_to).with_set_cookie(cookie);
        redirect.headers.extend(options.headers);
        redirect
    }

    /// [`Authenticator::logout`] as a redirect response.
    pub async fn logout_response(&self, headers: &HeaderMap, options: LogoutOptions) -> RouteResponse {
        self.logout(headers, options).await.into()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        config::SessionConfig,
        sessions::{cookie_pair, InMemorySessionRepository},
    };
    use async_trait::async_trait;
    use axum::{
        body::Bytes,
        http::{header::COOKIE, Request},
    };
    use serde::Deserialize;
    use splatkit_core::session::Session;

    /// A strategy that accepts the callback when `code=ok`.
    pub(crate) struct StubStrategy(pub &'static str);

    #[async_trait]
    impl Strategy for StubStrategy {
        fn provider(&self) -> &str {
            self.0
        }

        async fn initiate(
            &self,
            _request: &splatkit_core::auth::AuthRequest,
            session: &mut Session,
        ) -> splatkit_core::auth::Result<String> {
            session.set("stub:state", "s".into());
            Ok(format!("https://{}.example/authorize", self.0))
        }

        async fn exchange_callback(
            &self,
            request: &splatkit_core::auth::AuthRequest,
            session: &mut Session,
            _context: &AuthContext,
        ) -> splatkit_core::auth::Result<Profile> {
            session.unset("stub:state");
            match request.param("code") {
                Some("ok") => Ok(Profile {
                    provider: self.0.to_string(),
                    id: "42".into(),
                    display_name: Some("Ada".into()),
                    email: None,
                    avatar_url: Some("https://img.example/ada.png".into()),
                    raw: serde_json::Value::Null,
                }),
                _ => Err(AuthError::CodeExchange("denied".into())),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub(crate) struct User {
        pub id: String,
        pub display_name: Option<String>,
    }

    fn authenticator() -> Authenticator<Profile> {
        let mut auth = Authenticator::new(SessionStorage::for_tests());
        auth.use_strategy(Arc::new(StubStrategy("stub")), None).unwrap();
        auth
    }

    fn request(uri: &str, cookie: Option<&str>) -> RouteRequest {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        RouteRequest::new(builder.body(Bytes::new()).unwrap())
    }

    fn callback() -> AuthenticateOptions {
        AuthenticateOptions {
            success_redirect: Some("/".into()),
            failure_redirect: Some(LOGIN_PATH.into()),
            context: Some(AuthContext::new(AuthPhase::Callback)),
        }
    }

    fn redirect(outcome: AuthOutcome<Profile>) -> Redirection {
        match outcome {
            AuthOutcome::RedirectRequired(redirect) => redirect,
            AuthOutcome::Authenticated(user) => panic!("expected redirect, got {user:?}"),
        }
    }

    #[tokio::test]
    async fn duplicate_strategy_is_refused() {
        let mut auth = authenticator();
        let result = auth.use_strategy(Arc::new(StubStrategy("stub")), None);
        assert!(matches!(result, Err(AuthError::DuplicateProvider(p)) if p == "stub"));
    }

    #[tokio::test]
    async fn unknown_provider() {
        let result = authenticator()
            .authenticate("nope", &request("/", None), AuthenticateOptions::default())
            .await;
        assert!(matches!(result, Err(AuthError::UnknownProvider(_))));
    }

    #[tokio::test]
    async fn initiate_redirects_to_provider() {
        let outcome = authenticator()
            .authenticate("stub", &request("/auth/provider/stub", None), AuthenticateOptions::default())
            .await
            .unwrap();

        let redirect = redirect(outcome);
        assert_eq!(redirect.location, "https://stub.example/authorize");
        assert_eq!(redirect.set_cookies().count(), 1);
    }

    #[tokio::test]
    async fn callback_success_writes_session() {
        let auth = authenticator();
        let outcome = auth
            .authenticate("stub", &request("/auth/callback/stub?code=ok", None), callback())
            .await
            .unwrap();

        let redirect = redirect(outcome);
        assert_eq!(redirect.location, "/");
        let cookies: Vec<_> = redirect.set_cookies().collect();
        assert_eq!(cookies.len(), 1);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, cookie_pair(cookies[0]).parse().unwrap());
        let user = auth.is_authenticated(&headers).await.unwrap();
        assert_eq!(user.id, "42");

        let mut session = auth.storage().session_from_headers(&headers).await;
        assert_eq!(session.get(STRATEGY_KEY), Some("stub".into()));
    }

    #[tokio::test]
    async fn login_moves_persisted_session_to_a_fresh_id() {
        let repository = Arc::new(InMemorySessionRepository::new());
        let storage = SessionStorage::persisted(
            SessionConfig::default().with_secret("test-secret"),
            repository.clone(),
        )
        .unwrap();
        let mut auth = Authenticator::<Profile>::new(storage.clone());
        auth.use_strategy(Arc::new(StubStrategy("stub")), None).unwrap();

        // A validly signed ID issued before login.
        let mut session = Session::new();
        session.flash("colorScheme", "dark".into());
        let set_cookie = storage.commit_session(&mut session).await.unwrap();
        let before = cookie_pair(&set_cookie).to_string();

        let outcome = auth
            .authenticate(
                "stub",
                &request("/auth/callback/stub?code=ok", Some(&before)),
                callback(),
            )
            .await
            .unwrap();
        let redirect = redirect(outcome);
        let after = cookie_pair(redirect.set_cookies().next().unwrap()).to_string();

        assert_ne!(after, before);
        assert_eq!(repository.len().await, 1);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, before.parse().unwrap());
        assert!(auth.is_authenticated(&headers).await.is_none());

        headers.insert(COOKIE, after.parse().unwrap());
        assert_eq!(auth.is_authenticated(&headers).await.unwrap().id, "42");
    }

    #[tokio::test]
    async fn callback_failure_redirects_to_login_without_cookie() {
        let outcome = authenticator()
            .authenticate("stub", &request("/auth/callback/stub?code=bad", None), callback())
            .await
            .unwrap();

        let redirect = redirect(outcome);
        assert_eq!(redirect.location, LOGIN_PATH);
        assert_eq!(redirect.set_cookies().count(), 0);
    }

    #[tokio::test]
    async fn callback_failure_without_redirect_is_an_error() {
        let result = authenticator()
            .authenticate(
                "stub",
                &request("/auth/callback/stub?code=bad", None),
                AuthenticateOptions::default(),
            )
            .await;
        assert!(matches!(result, Err(AuthError::CodeExchange(_))));
    }

    #[tokio::test]
    async fn callback_without_redirects_returns_user() {
        let outcome = authenticator()
            .authenticate(
                "stub",
                &request("/auth/callback/stub?code=ok", None),
                AuthenticateOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.user().map(|p| p.id), Some("42".to_string()));
    }

    #[tokio::test]
    async fn return_to_survives_the_round_trip() {
        let auth = authenticator();
        let initiate = redirect(
            auth.authenticate(
                "stub",
                &request("/auth/provider/stub?return_to=/settings", None),
                AuthenticateOptions::default(),
            )
            .await
            .unwrap(),
        );
        let cookie = cookie_pair(initiate.set_cookies().next().unwrap()).to_string();

        let done = redirect(
            auth.authenticate(
                "stub",
                &request("/auth/callback/stub?code=ok", Some(&cookie)),
                callback(),
            )
            .await
            .unwrap(),
        );
        assert_eq!(done.location, "/settings");
    }

    #[tokio::test]
    async fn unsafe_return_to_is_ignored() {
        let auth = authenticator();
        let initiate = redirect(
            auth.authenticate(
                "stub",
                &request("/auth/provider/stub?return_to=//evil.example", None),
                AuthenticateOptions::default(),
            )
            .await
            .unwrap(),
        );
        let cookie = cookie_pair(initiate.set_cookies().next().unwrap()).to_string();

        let done = redirect(
            auth.authenticate(
                "stub",
                &request("/auth/callback/stub?code=ok", Some(&cookie)),
                callback(),
            )
            .await
            .unwrap(),
        );
        assert_eq!(done.location, "/");
    }

    #[tokio::test]
    async fn verify_hook_maps_profile() {
        let mut auth: Authenticator<User> = Authenticator::new(SessionStorage::for_tests());
        let verify: VerifyFn<User> = Arc::new(|profile: Profile| {
            Box::pin(async move {
                Ok(User {
                    id: format!("{}:{}", profile.provider, profile.id),
                    display_name: profile.display_name,
                })
            })
        });
        auth.use_strategy(Arc::new(StubStrategy("stub")), Some(verify))
            .unwrap();

        let outcome = auth
            .authenticate(
                "stub",
                &request("/auth/callback/stub?code=ok", None),
                AuthenticateOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.user().unwrap().id, "stub:42");
    }

    #[tokio::test]
    async fn require_authenticated_redirects_anonymous() {
        let outcome = authenticator().require_authenticated(&HeaderMap::new()).await;
        assert_eq!(
            outcome,
            AuthOutcome::RedirectRequired(Redirection::to(LOGIN_PATH))
        );
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let auth = authenticator();

        let redirect = auth
            .logout(
                &HeaderMap::new(),
                LogoutOptions::default().with_header("X-Logout", "1"),
            )
            .await;
        assert_eq!(redirect.location, "/");
        let cookie = redirect.set_cookies().next().unwrap();
        assert!(cookie.contains("Max-Age=0"));
        assert!(redirect.headers.contains(&("X-Logout".into(), "1".into())));

        let response = auth
            .logout_response(&HeaderMap::new(), LogoutOptions::default().redirect_to("/bye"))
            .await;
        assert_eq!(response.location(), Some("/bye"));
        assert_eq!(response.set_cookies().count(), 1);
    }
}
