//! Axum extractors for the user stored in the session.

use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use serde::{de::DeserializeOwned, Serialize};

use crate::authenticator::Authenticator;

/// Extractor for authenticated user. Returns 401 if not authenticated.
pub struct CurrentUser<U>(pub U);

impl<S, U> FromRequestParts<S> for CurrentUser<U>
where
    Authenticator<U>: FromRef<S>,
    U: Serialize + DeserializeOwned + Send + Sync + 'static,
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let authenticator = Authenticator::<U>::from_ref(state);

        authenticator
            .is_authenticated(&parts.headers)
            .await
            .map(CurrentUser)
            .ok_or((StatusCode::UNAUTHORIZED, "Not authenticated"))
    }
}

/// Extractor for optionally authenticated user. Returns None if not authenticated.
pub struct OptionalUser<U>(pub Option<U>);

impl<S, U> FromRequestParts<S> for OptionalUser<U>
where
    Authenticator<U>: FromRef<S>,
    U: Serialize + DeserializeOwned + Send + Sync + 'static,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let authenticator = Authenticator::<U>::from_ref(state);
        Ok(OptionalUser(
            authenticator.is_authenticated(&parts.headers).await,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        authenticator::{tests::StubStrategy, LogoutOptions},
        sessions::{cookie_pair, SessionStorage},
    };
    use axum::{
        body::{Body, Bytes},
        http::{header::COOKIE, Request},
        routing::get,
        Router,
    };
    use http_body_util::BodyExt;
    use splatkit_core::auth::{AuthContext, AuthPhase, AuthenticateOptions, Profile};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn authenticator() -> Authenticator<Profile> {
        let mut auth = Authenticator::new(SessionStorage::for_tests());
        auth.use_strategy(Arc::new(StubStrategy("stub")), None).unwrap();
        auth
    }

    fn app(auth: Authenticator<Profile>) -> Router {
        Router::new()
            .route(
                "/me",
                get(|CurrentUser(user): CurrentUser<Profile>| async move { user.id }),
            )
            .route(
                "/maybe",
                get(|OptionalUser(user): OptionalUser<Profile>| async move {
                    user.map(|u| u.id).unwrap_or_else(|| "anonymous".to_string())
                }),
            )
            .with_state(auth)
    }

    async fn login(auth: &Authenticator<Profile>) -> String {
        let request = crate::api::RouteRequest::new(
            Request::builder()
                .uri("/auth/callback/stub?code=ok")
                .body(Bytes::new())
                .unwrap(),
        );
        let options = AuthenticateOptions {
            success_redirect: Some("/".into()),
            failure_redirect: None,
            context: Some(AuthContext::new(AuthPhase::Callback)),
        };

        let outcome = auth.authenticate("stub", &request, options).await.unwrap();
        let splatkit_core::auth::AuthOutcome::RedirectRequired(redirect) = outcome else {
            panic!("expected redirect");
        };
        let cookie = cookie_pair(redirect.set_cookies().next().unwrap()).to_string();
        cookie
    }

    async fn body(app: Router, uri: &str, cookie: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn anonymous_requests() {
        let app = app(authenticator());

        let (status, _) = body(app.clone(), "/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, text) = body(app, "/maybe", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "anonymous");
    }

    #[tokio::test]
    async fn authenticated_requests() {
        let auth = authenticator();
        let cookie = login(&auth).await;
        let app = app(auth.clone());

        let (status, text) = body(app.clone(), "/me", Some(&cookie)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "42");

        let (_, text) = body(app.clone(), "/maybe", Some(&cookie)).await;
        assert_eq!(text, "42");

        let logout = auth.logout(&axum::http::HeaderMap::new(), LogoutOptions::default()).await;
        let cleared = cookie_pair(logout.set_cookies().next().unwrap()).to_string();
        let (status, _) = body(app, "/me", Some(&cleared)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
