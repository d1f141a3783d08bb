//! Values returned by registered route callbacks.

use axum::{
    body::{Body, Bytes},
    http::{
        header::{CONTENT_TYPE, LOCATION, SET_COOKIE},
        HeaderMap, HeaderName, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use serde_json::Value;
use splatkit_core::auth::Redirection;

/// Response produced by a route callback.
#[derive(Debug, Clone)]
pub enum RouteResponse {
    /// `302 Found` to `location`.
    Redirect { location: String, headers: HeaderMap },
    Json {
        status: StatusCode,
        body: Value,
        headers: HeaderMap,
    },
    Raw {
        status: StatusCode,
        body: Bytes,
        headers: HeaderMap,
    },
    /// Headers only, no body.
    Empty { status: StatusCode, headers: HeaderMap },
}

impl RouteResponse {
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect {
            location: location.into(),
            headers: HeaderMap::new(),
        }
    }

    pub fn json(status: StatusCode, body: Value) -> Self {
        Self::Json {
            status,
            body,
            headers: HeaderMap::new(),
        }
    }

    pub fn raw(body: impl Into<Bytes>) -> Self {
        Self::Raw {
            status: StatusCode::OK,
            body: body.into(),
            headers: HeaderMap::new(),
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self::Empty {
            status,
            headers: HeaderMap::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Redirect { .. } => StatusCode::FOUND,
            Self::Json { status, .. } | Self::Raw { status, .. } | Self::Empty { status, .. } => {
                *status
            }
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        match self {
            Self::Redirect { headers, .. }
            | Self::Json { headers, .. }
            | Self::Raw { headers, .. }
            | Self::Empty { headers, .. } => headers,
        }
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        match self {
            Self::Redirect { headers, .. }
            | Self::Json { headers, .. }
            | Self::Raw { headers, .. }
            | Self::Empty { headers, .. } => headers,
        }
    }

    /// Redirect target, if this is a redirect.
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Redirect { location, .. } => Some(location),
            _ => None,
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers_mut().append(name, value);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers_mut().extend(headers);
        self
    }

    /// Append a `Set-Cookie` header. Values that are not valid header text
    /// are dropped with a warning.
    pub fn with_set_cookie(self, cookie: &str) -> Self {
        match HeaderValue::from_str(cookie) {
            Ok(value) => self.with_header(SET_COOKIE, value),
            Err(e) => {
                tracing::warn!(error = %e, "dropping invalid Set-Cookie value");
                self
            }
        }
    }

    pub fn set_cookies(&self) -> impl Iterator<Item = &str> {
        self.headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
    }
}

impl From<Redirection> for RouteResponse {
    fn from(redirection: Redirection) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in redirection.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::warn!(header = %name, "dropping invalid redirect header"),
            }
        }

        Self::Redirect {
            location: redirection.location,
            headers,
        }
    }
}

impl IntoResponse for RouteResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Redirect { location, headers } => {
                let mut response = (StatusCode::FOUND, headers).into_response();
                match HeaderValue::from_str(&location) {
                    Ok(value) => {
                        response.headers_mut().insert(LOCATION, value);
                    }
                    Err(_) => {
                        tracing::error!(%location, "redirect target is not a valid header value");
                        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                    }
                }
                response
            }
            Self::Json {
                status,
                body,
                mut headers,
            } => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                (status, headers, body.to_string()).into_response()
            }
            Self::Raw {
                status,
                body,
                headers,
            } => (status, headers, Body::from(body)).into_response(),
            Self::Empty { status, headers } => (status, headers).into_response(),
        }
    }
}
