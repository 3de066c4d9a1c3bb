use std::{collections::HashSet, sync::Arc};

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    middleware::Next,
    response::Response,
};
use rand::RngCore;
use tracing::warn;

use crate::{
    auth::cookies::{extract_cookie, CSRF_COOKIE, CSRF_HEADER},
    error::AppError,
};

/// Paths that set the CSRF cookie themselves and so cannot require it.
pub const DEFAULT_EXEMPT_PATHS: &[&str] = &[
    "/v1/auth/login",
    "/v1/auth/register",
    "/v1/auth/refresh",
    "/v1/auth/forgot-password",
    "/v1/auth/reset-password",
];

#[derive(Debug, Clone)]
pub struct CsrfConfig {
    exempt: HashSet<String>,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self::with_exempt(DEFAULT_EXEMPT_PATHS.iter().copied())
    }
}

impl CsrfConfig {
    pub fn with_exempt<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            exempt: paths.into_iter().map(String::from).collect(),
        }
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt.contains(path)
    }
}

pub fn generate_csrf_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn tokens_match(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Double-submit check: header must equal cookie on every mutating,
/// non-exempt request.
pub async fn csrf_guard(
    State(cfg): State<Arc<CsrfConfig>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if is_safe_method(request.method()) || cfg.is_exempt(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let headers = request.headers();
    let header_token = headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());
    let cookie_token = extract_cookie(headers, CSRF_COOKIE);

    let valid = matches!(
        (header_token, cookie_token.as_deref()),
        (Some(h), Some(c)) if tokens_match(h, c)
    );
    if !valid {
        warn!(method = %request.method(), path = %request.uri().path(), "csrf check failed");
        return Err(AppError::CsrfInvalid);
    }
    Ok(next.run(request).await)
}
