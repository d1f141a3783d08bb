use rand::{distr::Alphanumeric, Rng};

use super::ProviderRoute;
use crate::api::{format_path, join_segments};

/// Path segment under `auth/` for login initiation routes.
pub const PROVIDER_SEGMENT: &str = "provider";

/// Path segment under `auth/` for OAuth2 callback routes.
pub const CALLBACK_SEGMENT: &str = "callback";

/// Derive the routes for a provider id.
///
/// `default` and `callback` are registry routes (`auth/provider/<id>` and
/// `auth/callback/<id>`). `full_callback` is the public callback URL under
/// `origin` and the endpoint `prefix`; it is the value to configure with the
/// external OAuth2 service.
pub fn derive_provider_route(provider: &str, origin: &str, prefix: &str) -> ProviderRoute {
    let default = join_segments(&["auth", PROVIDER_SEGMENT, provider]);
    let callback = join_segments(&["auth", CALLBACK_SEGMENT, provider]);
    let full_callback = format_path(Some(origin), prefix, &[callback.as_str()]);

    ProviderRoute {
        default,
        callback,
        full_callback,
    }
}

/// Generate a random state parameter for CSRF protection.
pub fn generate_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn github_routes() {
        let route = derive_provider_route("github", "https://example.com", "api/v1");

        assert_eq!(route.default, "auth/provider/github");
        assert_eq!(route.callback, "auth/callback/github");
        assert_eq!(
            route.full_callback,
            "https://example.com/api/v1/auth/callback/github"
        );
    }

    #[test]
    fn full_callback_is_callback_under_origin_without_prefix() {
        let route = derive_provider_route("github", "https://example.com/", "");
        assert_eq!(
            route.full_callback,
            format!("https://example.com/{}", route.callback)
        );
    }

    #[test]
    fn full_callback_is_public_callback_path_under_origin() {
        for prefix in ["api/v1", "/api/v2/", "custom"] {
            let route = derive_provider_route("github", "https://example.com", prefix);
            let public = format_path(None, prefix, &[route.callback.as_str()]);

            assert!(public.starts_with("/api/") || public.starts_with("/custom/"));
            assert_eq!(route.full_callback, format!("https://example.com{public}"));
        }
    }

    #[test]
    fn generate_state_produces_32_char_string() {
        let state = generate_state();
        assert_eq!(state.len(), 32);
        assert_ne!(state, generate_state());
    }
}
