//! Route registry.
//!
//! Handlers are registered at startup under a normalized route and a
//! [`VerbClass`], then dispatched from one splat route (see [`Api::into_router`]).
//! Registration is last-write-wins per `(route, verb-class)` and merges across
//! verb-classes, so feature modules can register in any order.

mod request;
mod response;
mod router;

use std::{collections::HashMap, future::Future, sync::Arc};

use axum::{body::Bytes, http::Request};
use futures_util::future::{BoxFuture, FutureExt};
use splatkit_core::api::{format_path, join_segments, normalize_route, ApiError, VerbClass};
use url::Url;

use crate::config::ApiConfig;

pub(crate) use request::cookie_header;
pub use request::RouteRequest;
pub use response::RouteResponse;

pub type RouteFuture = BoxFuture<'static, RouteResponse>;
pub type RouteCallback = Arc<dyn Fn(RouteRequest) -> RouteFuture + Send + Sync>;

#[derive(Clone, Default)]
struct RouteEntry {
    loader: Option<RouteCallback>,
    action: Option<RouteCallback>,
    default: Option<RouteCallback>,
}

impl RouteEntry {
    fn get(&self, verb: VerbClass) -> Option<&RouteCallback> {
        match verb {
            VerbClass::Loader => self.loader.as_ref(),
            VerbClass::Action => self.action.as_ref(),
            VerbClass::Default => self.default.as_ref(),
        }
    }

    fn set(&mut self, verb: VerbClass, callback: RouteCallback) {
        let slot = match verb {
            VerbClass::Loader => &mut self.loader,
            VerbClass::Action => &mut self.action,
            VerbClass::Default => &mut self.default,
        };
        *slot = Some(callback);
    }
}

/// Registry of dynamically registered routes.
///
/// Built once at startup and then moved into the HTTP boundary, after which
/// it is only read.
pub struct Api {
    config: ApiConfig,
    prefix: String,
    routes: HashMap<String, RouteEntry>,
}

impl Api {
    pub fn new(config: ApiConfig) -> Self {
        let prefix = normalize_route(&config.endpoint_prefix());
        Self {
            config,
            prefix,
            routes: HashMap::new(),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn website_url(&self) -> Option<&Url> {
        self.config.website_url.as_ref()
    }

    /// Normalized endpoint prefix, e.g. `api/v1`.
    pub fn endpoint_prefix(&self) -> &str {
        &self.prefix
    }

    /// Public path for `segments` under the endpoint prefix.
    ///
    /// # Errors
    ///
    /// Returns `MissingWebsiteUrl` when `include_origin` is set and no
    /// website URL is configured.
    pub fn format<S: AsRef<str>>(
        &self,
        include_origin: bool,
        segments: &[S],
    ) -> Result<String, ApiError> {
        let origin = if include_origin {
            Some(self.website_url().ok_or(ApiError::MissingWebsiteUrl)?.as_str())
        } else {
            None
        };

        Ok(format_path(origin, &self.prefix, segments))
    }

    /// Registry route for `segments`.
    pub fn route<S: AsRef<str>>(&self, segments: &[S]) -> String {
        join_segments(segments)
    }

    /// Register `callback` for `(route, verb)`.
    ///
    /// Replaces any callback already registered for the same pair and keeps
    /// the other verb-classes of `route`.
    pub fn register<F, Fut>(&mut self, route: &str, verb: VerbClass, callback: F)
    where
        F: Fn(RouteRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RouteResponse> + Send + 'static,
    {
        let key = normalize_route(route);
        let boxed: RouteCallback = Arc::new(move |request| callback(request).boxed());

        let entry = self.routes.entry(key.clone()).or_default();
        if entry.get(verb).is_some() {
            tracing::debug!(route = %key, %verb, "replacing registered callback");
        }
        entry.set(verb, boxed);
    }

    pub fn has_route(&self, route: &str, verb: VerbClass) -> bool {
        self.lookup(route)
            .is_some_and(|entry| entry.get(verb).is_some())
    }

    /// Registered routes, in no particular order.
    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Find the entry for a route, accepting both registry routes and
    /// public paths that still carry the endpoint prefix.
    fn lookup(&self, route: &str) -> Option<&RouteEntry> {
        let key = normalize_route(route);
        if let Some(entry) = self.routes.get(&key) {
            return Some(entry);
        }

        if self.prefix.is_empty() {
            return None;
        }
        key.strip_prefix(&self.prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .and_then(|rest| self.routes.get(rest))
    }

    /// Dispatch a request.
    ///
    /// - Unknown route: a redirect to the site root.
    /// - Known route without `verb`: `None`, for the caller to map to a status.
    /// - Otherwise the callback's response, unchanged.
    pub async fn handle(
        &self,
        route: &str,
        verb: VerbClass,
        request: Request<Bytes>,
    ) -> Option<RouteResponse> {
        let Some(entry) = self.lookup(route) else {
            tracing::debug!(%route, "unknown route, redirecting to site root");
            return Some(RouteResponse::redirect("/"));
        };

        let Some(callback) = entry.get(verb) else {
            tracing::debug!(%route, %verb, "verb-class not registered for route");
            return None;
        };

        Some(callback(RouteRequest::new(request)).await)
    }
}
