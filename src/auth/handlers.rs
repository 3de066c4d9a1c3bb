use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        cookies::{cleared_cookies, extract_cookie, session_cookies, SessionTokens, REFRESH_COOKIE},
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, RegisterRequest,
            ResetPasswordRequest,
        },
        repo_types::User,
        services,
    },
    error::AppError,
    extract::ApiJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/refresh", post(refresh))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

fn session_response(
    state: &AppState,
    user: User,
    tokens: SessionTokens,
) -> (HeaderMap, Json<AuthResponse>) {
    let headers = session_cookies(
        &tokens,
        state.config.cookie_secure,
        state.jwt.access_ttl.as_secs() as i64,
        state.jwt.refresh_ttl.as_secs() as i64,
    );
    (
        headers,
        Json(AuthResponse {
            csrf_token: tokens.csrf_token,
            user: user.into(),
        }),
    )
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), AppError> {
    let (user, tokens) = services::register(&state, payload).await?;
    let (headers, body) = session_response(&state, user, tokens);
    Ok((StatusCode::CREATED, headers, body))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), AppError> {
    let (user, tokens) = services::login(&state, &payload.email, &payload.password).await?;
    Ok(session_response(&state, user, tokens))
}

#[instrument(skip(state, headers))]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(HeaderMap, Json<AuthResponse>), AppError> {
    let token = extract_cookie(&headers, REFRESH_COOKIE);
    let (user, tokens) = services::refresh(&state, token.as_deref()).await?;
    Ok(session_response(&state, user, tokens))
}

#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>) -> (HeaderMap, Json<MessageResponse>) {
    info!("session cookies cleared");
    (
        cleared_cookies(state.config.cookie_secure),
        Json(MessageResponse { message: "Logged out" }),
    )
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    services::forgot_password(&state, &payload.email).await?;
    Ok(Json(MessageResponse {
        message: "If the email is registered, a reset code has been sent",
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    services::reset_password(&state, payload).await?;
    Ok(Json(MessageResponse {
        message: "Password has been reset",
    }))
}
