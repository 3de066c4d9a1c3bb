use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use crate::{
    auth::jwt::AuthUser,
    error::AppError,
    extract::{ApiPath, ApiQuery},
    movies::{catalog::CatalogMovie, repo_types::Movie, services},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
}

pub fn movie_routes() -> Router<AppState> {
    Router::new()
        .route("/movies/search", get(search_movies))
        .route("/movies/:tmdb_id", get(get_movie))
}

#[instrument(skip(state))]
pub async fn search_movies(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    ApiQuery(q): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<CatalogMovie>>, AppError> {
    Ok(Json(services::search(&state, &q.query).await?))
}

#[instrument(skip(state))]
pub async fn get_movie(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    ApiPath(tmdb_id): ApiPath<i64>,
) -> Result<Json<Movie>, AppError> {
    Ok(Json(services::ensure_movie(&state, tmdb_id).await?))
}
