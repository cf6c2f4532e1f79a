use axum::http::{HeaderMap, header};
use subtle::ConstantTimeEq;

/// Constant-time string comparison for the bearer token. Length differences
/// short-circuit inside `subtle`, which is acceptable: token length is not a
/// secret.
pub(super) fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Whether the request carries `Authorization: Bearer <expected>`.
pub(super) fn bearer_token_matches(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| constant_time_eq(token, expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(auth: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        headers
    }

    #[test]
    fn matching_bearer_token_passes() {
        assert!(bearer_token_matches(&headers_with("Bearer tok-123"), "tok-123"));
    }

    #[test]
    fn wrong_token_scheme_or_absence_fails() {
        assert!(!bearer_token_matches(&headers_with("Bearer nope"), "tok-123"));
        assert!(!bearer_token_matches(&headers_with("Basic tok-123"), "tok-123"));
        assert!(!bearer_token_matches(&HeaderMap::new(), "tok-123"));
    }

    #[test]
    fn constant_time_eq_handles_unequal_lengths() {
        assert!(!constant_time_eq("short", "much-longer-token"));
        assert!(constant_time_eq("same", "same"));
    }
}
