use axum::{
    extract::State,
    http::HeaderMap,
    routing::{delete, get, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        cookies::cleared_cookies,
        dto::{ChangePasswordRequest, MessageResponse, PublicUser},
        jwt::AuthUser,
        services::change_password,
    },
    error::AppError,
    extract::{ApiJson, ApiPath, ApiQuery},
    logs::{
        dto::{LogListQuery, LogView},
        services::list_logs,
    },
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/info", get(get_info))
        .route("/users/password", put(update_password))
        .route("/users/me", delete(forget_me))
        .route("/users/:id/logs", get(user_logs))
}

#[instrument(skip(state))]
pub async fn get_info(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn user_logs(
    State(state): State<AppState>,
    AuthUser(_viewer): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(q): ApiQuery<LogListQuery>,
) -> Result<Json<Vec<LogView>>, AppError> {
    state
        .users
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(list_logs(&state, id, &q).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    change_password(&state, user_id, payload).await?;
    Ok(Json(MessageResponse {
        message: "Password updated",
    }))
}

/// Soft-deletes the account, anonymises it and ends the session.
#[instrument(skip(state))]
pub async fn forget_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<(HeaderMap, Json<MessageResponse>), AppError> {
    state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    state.users.forget(user_id).await?;
    info!(%user_id, "user forgotten");
    Ok((
        cleared_cookies(state.config.cookie_secure),
        Json(MessageResponse {
            message: "Account deleted",
        }),
    ))
}
