use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::jwt::AuthUser,
    error::AppError,
    extract::{ApiJson, ApiPath},
    ratings::{dto::RateMovieRequest, repo_types::MovieRating, services},
    state::AppState,
};

pub fn rating_routes() -> Router<AppState> {
    Router::new()
        .route("/movie-ratings", get(list_ratings).post(rate_movie))
        .route("/movie-ratings/", get(list_ratings).post(rate_movie))
        .route("/movie-ratings/:tmdb_id", get(get_rating))
}

#[instrument(skip(state, payload))]
pub async fn rate_movie(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<RateMovieRequest>,
) -> Result<(StatusCode, Json<MovieRating>), AppError> {
    let rating = services::rate_movie(&state, user_id, payload).await?;
    Ok((StatusCode::OK, Json(rating)))
}

#[instrument(skip(state))]
pub async fn get_rating(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(tmdb_id): ApiPath<i64>,
) -> Result<Json<MovieRating>, AppError> {
    Ok(Json(services::rating_for_movie(&state, user_id, tmdb_id).await?))
}

#[instrument(skip(state))]
pub async fn list_ratings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<MovieRating>>, AppError> {
    Ok(Json(services::list_ratings(&state, user_id).await?))
}
