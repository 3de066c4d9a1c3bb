use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::jwt::AuthUser,
    error::AppError,
    extract::ApiQuery,
    state::AppState,
    stats::{
        dto::{StatsQuery, StatsResponse},
        services,
    },
};

pub fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/stats/me", get(my_stats))
        .route("/stats/me/pace", get(my_pace))
}

#[instrument(skip(state))]
pub async fn my_stats(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiQuery(q): ApiQuery<StatsQuery>,
) -> Result<Json<StatsResponse>, AppError> {
    Ok(Json(services::stats_for_user(&state, user_id, &q).await?))
}

#[instrument]
pub async fn my_pace(AuthUser(_user_id): AuthUser) -> Result<Json<StatsResponse>, AppError> {
    Err(AppError::NotImplemented("viewing pace statistics"))
}
