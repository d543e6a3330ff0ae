//! Cookie parsing and Set-Cookie building for bearer tokens.

use axum::http::header;

/// Cookie name for the access token.
pub const ACCESS_COOKIE_NAME: &str = "access_token";

/// Cookie name for the refresh token.
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// The refresh token is only sent to the renew and logout routes.
pub const REFRESH_COOKIE_PATH: &str = "/api/v1/auth/token";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                let value = value.trim();
                if value.is_empty() {
                    return None;
                }
                return Some(value);
            }
        }
    }
    None
}

fn build_cookie(name: &str, value: &str, path: &str, max_age: u64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path={}; Max-Age={}{}",
        name, value, path, max_age, secure
    )
}

/// Set-Cookie value carrying an access token.
pub fn access_cookie(token: &str, max_age: u64, secure: bool) -> String {
    build_cookie(ACCESS_COOKIE_NAME, token, "/", max_age, secure)
}

/// Set-Cookie value carrying a refresh token.
pub fn refresh_cookie(token: &str, max_age: u64, secure: bool) -> String {
    build_cookie(REFRESH_COOKIE_NAME, token, REFRESH_COOKIE_PATH, max_age, secure)
}

/// Set-Cookie value that removes the access token.
pub fn clear_access_cookie(secure: bool) -> String {
    build_cookie(ACCESS_COOKIE_NAME, "", "/", 0, secure)
}

/// Set-Cookie value that removes the refresh token. The path must match the
/// one it was set with or the browser keeps it.
pub fn clear_refresh_cookie(secure: bool) -> String {
    build_cookie(REFRESH_COOKIE_NAME, "", REFRESH_COOKIE_PATH, 0, secure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_get_cookie_simple() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("access_token=abc123"),
        );

        assert_eq!(get_cookie(&headers, "access_token"), Some("abc123"));
    }

    #[test]
    fn test_get_cookie_multiple() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("foo=bar; access_token=abc123; refresh_token=xyz789"),
        );

        assert_eq!(get_cookie(&headers, "access_token"), Some("abc123"));
        assert_eq!(get_cookie(&headers, "refresh_token"), Some("xyz789"));
        assert_eq!(get_cookie(&headers, "foo"), Some("bar"));
    }

    #[test]
    fn test_get_cookie_not_found() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("foo=bar"));

        assert_eq!(get_cookie(&headers, "access_token"), None);
    }

    #[test]
    fn test_get_cookie_no_header() {
        let headers = axum::http::HeaderMap::new();
        assert_eq!(get_cookie(&headers, "access_token"), None);
    }

    #[test]
    fn test_get_cookie_empty_value() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("refresh_token="));

        assert_eq!(get_cookie(&headers, "refresh_token"), None);
    }

    #[test]
    fn test_get_cookie_with_spaces() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("  access_token = abc123  ; foo=bar"),
        );

        assert_eq!(get_cookie(&headers, "access_token"), Some("abc123"));
    }

    #[test]
    fn test_access_cookie_attributes() {
        assert_eq!(
            access_cookie("tok", 900, false),
            "access_token=tok; HttpOnly; SameSite=Strict; Path=/; Max-Age=900"
        );
        assert!(access_cookie("tok", 900, true).ends_with("; Secure"));
    }

    #[test]
    fn test_refresh_cookie_is_path_scoped() {
        let cookie = refresh_cookie("tok", 2592000, false);
        assert!(cookie.starts_with("refresh_token=tok;"));
        assert!(cookie.contains("Path=/api/v1/auth/token;"));
        assert!(cookie.contains("Max-Age=2592000"));
    }

    #[test]
    fn test_clear_cookies() {
        assert_eq!(
            clear_access_cookie(false),
            "access_token=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0"
        );
        assert_eq!(
            clear_refresh_cookie(true),
            "refresh_token=; HttpOnly; SameSite=Strict; Path=/api/v1/auth/token; Max-Age=0; Secure"
        );
    }
}
