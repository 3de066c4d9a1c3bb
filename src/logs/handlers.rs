use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::AppError,
    extract::{ApiJson, ApiPath, ApiQuery},
    logs::{
        dto::{CreateLogRequest, LogListQuery, LogView, UpdateLogRequest},
        services,
    },
    state::AppState,
};

pub fn log_routes() -> Router<AppState> {
    Router::new()
        .route("/logs", get(list_logs).post(create_log))
        .route("/logs/", get(list_logs).post(create_log))
        .route("/logs/:id", get(get_log).put(update_log).delete(delete_log))
}

#[instrument(skip(state, payload))]
pub async fn create_log(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<CreateLogRequest>,
) -> Result<(StatusCode, Json<LogView>), AppError> {
    let view = services::create_log(&state, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[instrument(skip(state))]
pub async fn list_logs(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiQuery(q): ApiQuery<LogListQuery>,
) -> Result<Json<Vec<LogView>>, AppError> {
    Ok(Json(services::list_logs(&state, user_id, &q).await?))
}

#[instrument(skip(state))]
pub async fn get_log(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<LogView>, AppError> {
    Ok(Json(services::get_log(&state, user_id, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_log(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateLogRequest>,
) -> Result<Json<LogView>, AppError> {
    Ok(Json(services::update_log(&state, user_id, id, payload).await?))
}

#[instrument(skip(state))]
pub async fn delete_log(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete_log(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
