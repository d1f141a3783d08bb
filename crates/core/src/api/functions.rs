/// Endpoint prefix for an API version, e.g. `api/v1`.
pub fn endpoint_prefix(version: u32) -> String {
    format!("api/v{version}")
}

/// Normalize a route into its registry key.
///
/// Surrounding slashes are dropped and empty segments collapsed, so
/// `/auth//logout/` and `auth/logout` resolve to the same entry.
pub fn normalize_route(route: &str) -> String {
    route
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Join path segments into a normalized route.
///
/// Segments may themselves contain slashes; each one is normalized.
pub fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|segment| normalize_route(segment.as_ref()))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Build a public path under `prefix`, optionally prefixed with `origin`.
///
/// The result always starts with `/` when no origin is given.
pub fn format_path<S: AsRef<str>>(origin: Option<&str>, prefix: &str, segments: &[S]) -> String {
    let route = join_segments(segments);
    let prefix = normalize_route(prefix);

    let path = match (prefix.is_empty(), route.is_empty()) {
        (true, _) => format!("/{route}"),
        (false, true) => format!("/{prefix}"),
        (false, false) => format!("/{prefix}/{route}"),
    };

    match origin {
        Some(origin) => format!("{}{}", origin.trim_end_matches('/'), path),
        None => path,
    }
}

/// Derive the route parameter from a request URI.
///
/// This is the last non-empty path segment with any query string or fragment
/// removed. A URI with no segments yields an empty string.
pub fn route_parameter(uri: &str) -> String {
    let path = uri.split(['?', '#']).next().unwrap_or_default();

    // Absolute URIs carry a scheme and authority ahead of the path.
    let path = match path.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, p)| p).unwrap_or_default(),
        None => path,
    };

    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or_default()
        .to_string()
}
