/// Validates a post-login `return_to` target to prevent open redirects.
///
/// Returns `Some(path)` if the value is a same-site relative path, `None`
/// otherwise. Accepted values:
/// - start with a single `/`
/// - are not protocol-relative (`//host` or `/\host`)
/// - contain no control characters
/// - contain no scheme separator (`://`)
///
/// # Examples
///
/// ```
/// use splatkit_core::auth::validate_return_to;
///
/// assert_eq!(validate_return_to("/settings"), Some("/settings"));
/// assert_eq!(validate_return_to("//evil.com"), None);
/// assert_eq!(validate_return_to("https://evil.com"), None);
/// ```
pub fn validate_return_to(url: &str) -> Option<&str> {
    if !url.starts_with('/') {
        return None;
    }

    // Browsers treat a backslash after the leading slash like a second slash.
    if url.starts_with("//") || url.starts_with("/\\") {
        return None;
    }

    if url.chars().any(|c| c.is_control()) {
        return None;
    }

    if url.contains("://") {
        return None;
    }

    Some(url)
}
