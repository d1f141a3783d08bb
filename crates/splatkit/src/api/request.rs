use axum::{
    body::Bytes,
    http::{
        header::{CONTENT_TYPE, COOKIE},
        HeaderMap, Request,
    },
};
use serde_json::Value;
use splatkit_core::{api::route_parameter, auth::AuthRequest};
use url::form_urlencoded;

/// A request as seen by a registered route callback.
#[derive(Debug)]
pub struct RouteRequest {
    pub request: Request<Bytes>,
    /// Last non-empty segment of the request path.
    pub param: String,
}

impl RouteRequest {
    pub fn new(request: Request<Bytes>) -> Self {
        let param = route_parameter(&request_uri(&request));
        Self { request, param }
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    /// Path and query of the request.
    pub fn uri(&self) -> String {
        request_uri(&self.request)
    }

    /// All `Cookie` headers joined into one header value.
    pub fn cookie_header(&self) -> Option<String> {
        cookie_header(self.headers())
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.request
            .uri()
            .query()
            .map(|query| form_urlencoded::parse(query.as_bytes()).into_owned().collect())
            .unwrap_or_default()
    }

    /// Submitted form fields.
    ///
    /// URL-encoded bodies are decoded as-is. JSON object bodies contribute
    /// their top-level string values, and other JSON values are serialized
    /// back to text. Anything else yields no fields.
    pub fn form_pairs(&self) -> Vec<(String, String)> {
        let body = self.request.body();
        if body.is_empty() {
            return Vec::new();
        }

        let content_type = self
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        if content_type.starts_with("application/json") {
            return match serde_json::from_slice::<Value>(body) {
                Ok(Value::Object(object)) => object
                    .into_iter()
                    .map(|(key, value)| match value {
                        Value::String(text) => (key, text),
                        other => (key, other.to_string()),
                    })
                    .collect(),
                _ => Vec::new(),
            };
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            return form_urlencoded::parse(body).into_owned().collect();
        }

        Vec::new()
    }

    /// The view of this request handed to credential-exchange strategies.
    pub fn auth_request(&self) -> AuthRequest {
        AuthRequest {
            uri: self.uri(),
            query: self.query_pairs(),
            form: self.form_pairs(),
        }
    }
}

fn request_uri<B>(request: &Request<B>) -> String {
    request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

pub(crate) fn cookie_header(headers: &HeaderMap) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();

    (!values.is_empty()).then(|| values.join("; "))
}
