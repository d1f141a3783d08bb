use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{http::StatusCode, routing::get, Router};
use futures_util::FutureExt;
use splatkit::{
    scan_icon_dir, Api, Auth, ProviderConfig, ProviderRegistration, SessionStorage, Theme,
    ThemeConfig,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{
    config::ServerConfig,
    handlers::{account::me, health::livez, pages},
    state::{AppState, AppUser, LoginLink},
};

/// Create the application router with all routes and middleware.
///
/// Providers are registered from the environment (GitHub) and the config
/// (mock). Icons are read once from `icon_dir` when it is set.
pub async fn create_app(config: &ServerConfig) -> Result<Router> {
    let mut api = Api::new(config.api_config());
    let storage = SessionStorage::cookie(config.session_config())
        .context("failed to configure session storage")?;

    let mut auth = Auth::<AppUser>::new(&mut api, storage.clone());
    for registration in registrations(config) {
        let provider = registration.provider().to_string();
        auth.register(&mut api, registration.verify(verify))
            .with_context(|| format!("failed to register provider '{provider}'"))?;
    }

    let login_links = auth
        .registered_providers()
        .iter()
        .map(|registered| -> Result<LoginLink> {
            Ok(LoginLink {
                name: registered.name.clone(),
                provider: registered.provider.clone(),
                action: api.format(false, &[registered.route.default.as_str()])?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if login_links.is_empty() {
        tracing::warn!("no login providers configured; set GITHUB_CLIENT_ID or MOCK_AUTH");
    }

    let theme = Theme::new(
        &mut api,
        storage,
        ThemeConfig::default().on_change(|_, change| {
            async move {
                tracing::info!(color_scheme = %change.color_scheme, "color scheme changed");
            }
            .boxed()
        }),
    );

    if let Some(dir) = &config.icon_dir {
        let icons = scan_icon_dir(dir)
            .await
            .with_context(|| format!("failed to scan icons in {}", dir.display()))?;
        api.register_icons(icons).await?;
    }

    let state = AppState {
        auth: Arc::new(auth),
        theme,
        login_links: login_links.into(),
    };

    // Application pages
    let pages = Router::new()
        .route("/", get(pages::index))
        .route("/login", get(pages::login))
        .route("/me", get(me))
        .route("/livez", get(livez))
        .with_state(state);

    // Main application router
    Ok(pages
        .merge(api.into_router())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(10),
        )))
}

fn registrations(config: &ServerConfig) -> Vec<ProviderRegistration<AppUser>> {
    let mut registrations = Vec::new();

    if let Some(github) = ProviderConfig::github_from_env() {
        registrations.push(github.into_registration().name("GitHub"));
    }

    #[cfg(feature = "mock")]
    if config.mock_auth {
        registrations.push(
            ProviderRegistration::new("mock", |route| {
                splatkit::MockProvider::new("mock", &route.full_callback)
            })
            .name("Mock"),
        );
    }
    #[cfg(not(feature = "mock"))]
    if config.mock_auth {
        tracing::warn!("MOCK_AUTH is set but the mock feature is disabled");
    }

    registrations
}

async fn verify(profile: splatkit::Profile) -> Result<AppUser, splatkit::AuthError> {
    Ok(AppUser::from(profile))
}
