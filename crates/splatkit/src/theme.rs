//! Cookie-backed color scheme preference.

use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::json;
use splatkit_core::{
    api::VerbClass,
    theme::{decode_form_data, ColorScheme, SetTheme, COLOR_SCHEME_KEY},
};

use crate::{
    api::{Api, RouteRequest, RouteResponse},
    sessions::SessionStorage,
};

/// Runs on every read and may override the resolved scheme.
pub type OnGet = Arc<dyn Fn(&HeaderMap, ColorScheme) -> ColorScheme + Send + Sync>;

/// Runs after a change is validated and before it is committed.
pub type OnChange = Arc<dyn Fn(&RouteRequest, SetTheme) -> BoxFuture<'static, ()> + Send + Sync>;

/// Preference store configuration.
#[derive(Clone, Default)]
pub struct ThemeConfig {
    /// Scheme used when the session has none (default: dark).
    pub color_scheme: ColorScheme,
    pub on_get: Option<OnGet>,
    pub on_change: Option<OnChange>,
}

impl ThemeConfig {
    pub fn color_scheme(mut self, color_scheme: ColorScheme) -> Self {
        self.color_scheme = color_scheme;
        self
    }

    pub fn on_get<F>(mut self, on_get: F) -> Self
    where
        F: Fn(&HeaderMap, ColorScheme) -> ColorScheme + Send + Sync + 'static,
    {
        self.on_get = Some(Arc::new(on_get));
        self
    }

    pub fn on_change<F>(mut self, on_change: F) -> Self
    where
        F: Fn(&RouteRequest, SetTheme) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.on_change = Some(Arc::new(on_change));
        self
    }
}

/// Result of [`Theme::get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeState {
    pub color_scheme: ColorScheme,
}

/// Reads the preference from the session and serves `theme/set`.
#[derive(Clone)]
pub struct Theme {
    storage: SessionStorage,
    color_scheme: ColorScheme,
    on_get: Option<OnGet>,
    set_route: String,
}

impl Theme {
    /// Build the store and register its `theme/set` action.
    pub fn new(api: &mut Api, storage: SessionStorage, config: ThemeConfig) -> Self {
        let route = api.route(&["theme", "set"]);
        let set_route = api.format(false, &[route.as_str()]).unwrap_or_default();

        let set_storage = storage.clone();
        let on_change = config.on_change.clone();
        api.register(&route, VerbClass::Action, move |request: RouteRequest| {
            let storage = set_storage.clone();
            let on_change = on_change.clone();
            async move { set_theme(&storage, on_change.as_ref(), request).await }
        });

        Self {
            storage,
            color_scheme: config.color_scheme,
            on_get: config.on_get,
            set_route,
        }
    }

    /// Public path of the set route.
    pub fn set_route(&self) -> &str {
        &self.set_route
    }

    /// Scheme used when the session has none.
    pub fn default_color_scheme(&self) -> ColorScheme {
        self.color_scheme
    }

    /// The request's color scheme.
    ///
    /// Values in the session that are not a known scheme fall back to the
    /// default.
    pub async fn get(&self, headers: &HeaderMap) -> ThemeState {
        let mut session = self.storage.session_from_headers(headers).await;
        let current = session
            .get_as::<ColorScheme>(COLOR_SCHEME_KEY)
            .unwrap_or(self.color_scheme);

        let color_scheme = match &self.on_get {
            Some(on_get) => on_get(headers, current),
            None => current,
        };

        ThemeState { color_scheme }
    }
}

async fn set_theme(
    storage: &SessionStorage,
    on_change: Option<&OnChange>,
    request: RouteRequest,
) -> RouteResponse {
    let data = decode_form_data(&request.form_pairs());
    let theme = match SetTheme::validate(&data) {
        Ok(theme) => theme,
        Err(errors) => {
            tracing::debug!(?errors, "rejecting color scheme change");
            return RouteResponse::json(StatusCode::BAD_REQUEST, json!({ "error": errors }));
        }
    };

    if let Some(on_change) = on_change {
        on_change(&request, theme).await;
    }

    let mut session = storage.session_from_headers(request.headers()).await;
    session.flash(COLOR_SCHEME_KEY, theme.color_scheme.as_str().into());

    match storage.commit_session(&mut session).await {
        Ok(cookie) => {
            tracing::debug!(color_scheme = %theme.color_scheme, "color scheme changed");
            RouteResponse::empty(StatusCode::OK).with_set_cookie(&cookie)
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to commit color scheme");
            RouteResponse::empty(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ApiConfig, sessions::cookie_pair};
    use axum::{
        body::Body,
        http::{
            header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
            Request,
        },
        Router,
    };
    use futures_util::FutureExt;
    use http_body_util::BodyExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn setup(config: ThemeConfig) -> (Theme, Router) {
        let mut api = Api::new(ApiConfig::default());
        let theme = Theme::new(&mut api, SessionStorage::for_tests(), config);
        (theme, api.into_router())
    }

    fn post(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/theme/set")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn headers_with(set_cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, cookie_pair(set_cookie).parse().unwrap());
        headers
    }

    #[tokio::test]
    async fn default_scheme_without_session() {
        let (theme, _) = setup(ThemeConfig::default());
        assert_eq!(theme.set_route(), "/api/v1/theme/set");
        assert_eq!(
            theme.get(&HeaderMap::new()).await.color_scheme,
            ColorScheme::Dark
        );

        let (light, _) = setup(ThemeConfig::default().color_scheme(ColorScheme::Light));
        assert_eq!(
            light.get(&HeaderMap::new()).await.color_scheme,
            ColorScheme::Light
        );
    }

    #[tokio::test]
    async fn invalid_scheme_is_rejected() {
        let (_, router) = setup(ThemeConfig::default());

        let response = router
            .oneshot(post("data=%7B%22colorScheme%22%3A%22purple%22%7D"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(SET_COOKIE).is_none());

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(body["error"]["fieldErrors"]["colorScheme"].is_array());
    }

    #[tokio::test]
    async fn valid_scheme_sets_cookie() {
        let (theme, router) = setup(ThemeConfig::default().color_scheme(ColorScheme::Light));

        let response = router
            .oneshot(post("data=%7B%22colorScheme%22%3A%22dark%22%7D"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap().to_string();
        assert!(set_cookie.contains("dark"));

        let state = theme.get(&headers_with(&set_cookie)).await;
        assert_eq!(state.color_scheme, ColorScheme::Dark);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn flat_form_fields_are_accepted() {
        let (theme, router) = setup(ThemeConfig::default());

        let response = router.oneshot(post("colorScheme=light")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        let state = theme.get(&headers_with(set_cookie)).await;
        assert_eq!(state.color_scheme, ColorScheme::Light);
    }

    #[tokio::test]
    async fn on_get_overrides_value() {
        let (theme, _) = setup(ThemeConfig::default().on_get(|_, current| current.toggled()));
        assert_eq!(
            theme.get(&HeaderMap::new()).await.color_scheme,
            ColorScheme::Light
        );
    }

    #[tokio::test]
    async fn on_change_runs_only_for_valid_input() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (_, router) = setup(ThemeConfig::default().on_change(move |_, theme| {
            assert_eq!(theme.color_scheme, ColorScheme::Light);
            counter.fetch_add(1, Ordering::SeqCst);
            async {}.boxed()
        }));

        router.clone().oneshot(post("colorScheme=purple")).await.unwrap();
        router.oneshot(post("colorScheme=light")).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn state_serializes_camel_case() {
        let state = ThemeState {
            color_scheme: ColorScheme::Light,
        };
        assert_eq!(
            serde_json::to_value(state).unwrap(),
            json!({ "colorScheme": "light" })
        );
    }
}
