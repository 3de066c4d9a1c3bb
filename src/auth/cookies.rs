//! Session cookie building and parsing.

use axum::http::{header, HeaderMap, HeaderValue};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";
pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// The refresh cookie is only ever sent to this path.
pub const REFRESH_PATH: &str = "/v1/auth/refresh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CookieSpec {
    pub name: &'static str,
    pub path: &'static str,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookieSpec {
    pub fn access(secure: bool) -> Self {
        Self {
            name: ACCESS_COOKIE,
            path: "/",
            http_only: true,
            secure,
            same_site: SameSite::Strict,
        }
    }

    pub fn refresh(secure: bool) -> Self {
        Self {
            name: REFRESH_COOKIE,
            path: REFRESH_PATH,
            http_only: true,
            secure,
            same_site: SameSite::Strict,
        }
    }

    /// HttpOnly as well; the value reaches client JS through the response body.
    pub fn csrf(secure: bool) -> Self {
        Self {
            name: CSRF_COOKIE,
            path: "/",
            http_only: true,
            secure,
            same_site: SameSite::Lax,
        }
    }

    pub fn build(&self, value: &str, max_age_secs: i64) -> String {
        let mut cookie = format!("{}={}", self.name, value);
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str(&format!("; SameSite={}", self.same_site.as_str()));
        cookie.push_str(&format!("; Path={}", self.path));
        cookie.push_str(&format!("; Max-Age={}", max_age_secs));
        cookie
    }

    /// Same attributes, empty value, already expired.
    pub fn build_expired(&self) -> String {
        let mut cookie = self.build("", 0);
        cookie.push_str("; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
        cookie
    }
}

/// Access, refresh and CSRF token values for one session.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub csrf_token: String,
}

pub fn session_cookies(
    tokens: &SessionTokens,
    secure: bool,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let cookies = [
        CookieSpec::access(secure).build(&tokens.access_token, access_ttl_secs),
        CookieSpec::refresh(secure).build(&tokens.refresh_token, refresh_ttl_secs),
        CookieSpec::csrf(secure).build(&tokens.csrf_token, refresh_ttl_secs),
    ];
    for c in cookies {
        if let Ok(v) = HeaderValue::from_str(&c) {
            headers.append(header::SET_COOKIE, v);
        }
    }
    headers
}

pub fn cleared_cookies(secure: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for spec in [
        CookieSpec::access(secure),
        CookieSpec::refresh(secure),
        CookieSpec::csrf(secure),
    ] {
        if let Ok(v) = HeaderValue::from_str(&spec.build_expired()) {
            headers.append(header::SET_COOKIE, v);
        }
    }
    headers
}

pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key == name && !value.is_empty()).then(|| value.to_string())
        })
}
