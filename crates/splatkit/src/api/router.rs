//! The splat route that feeds every request into the registry.

use std::sync::Arc;

use axum::{
    body::to_bytes,
    extract::{Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use splatkit_core::api::{format_path, VerbClass};

use super::Api;

/// Largest request body buffered for a route callback.
const BODY_LIMIT: usize = 2 * 1024 * 1024;

impl Api {
    /// Path the splat route is mounted under, e.g. `/api/v1`.
    pub fn mount_path(&self) -> String {
        let empty: [&str; 0] = [];
        format_path(None, self.endpoint_prefix(), &empty)
    }

    /// Consume the registry into a router with one catch-all route.
    ///
    /// Read requests dispatch to loaders and mutating requests to actions;
    /// other methods go to the default verb-class. The default callback also
    /// serves a method whose own verb-class is not registered on the route.
    /// A route with neither answers `404 Not Found`.
    pub fn into_router(self) -> Router {
        let mount = self.mount_path();
        let path = if mount == "/" {
            "/{*route}".to_string()
        } else {
            format!("{mount}/{{*route}}")
        };

        tracing::debug!(%path, routes = self.routes.len(), "mounting route registry");

        Router::new()
            .route(&path, any(dispatch))
            .with_state(Arc::new(self))
    }
}

async fn dispatch(
    State(api): State<Arc<Api>>,
    Path(route): Path<String>,
    request: Request,
) -> Response {
    let mut verb = VerbClass::from_method(request.method().as_str());
    if !api.has_route(&route, verb) && api.has_route(&route, VerbClass::Default) {
        verb = VerbClass::Default;
    }

    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, BODY_LIMIT).await {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(error = %e, "rejecting request body");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };
    let request = axum::http::Request::from_parts(parts, body);

    match api.handle(&route, verb, request).await {
        Some(response) => response.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
