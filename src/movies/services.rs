use tracing::{error, info};

use crate::{
    error::{AppError, AppResult},
    movies::{catalog::CatalogMovie, repo_types::Movie},
    state::AppState,
};

/// Returns the cached movie for a catalog id, fetching and caching it on first use.
pub async fn ensure_movie(state: &AppState, tmdb_id: i64) -> AppResult<Movie> {
    if tmdb_id <= 0 {
        return Err(AppError::invalid("tmdb_id", "must be a positive catalog id"));
    }
    if let Some(movie) = state.movies.find_by_tmdb_id(tmdb_id).await? {
        return Ok(movie);
    }

    let fetched = state.catalog.movie(tmdb_id).await.map_err(|e| {
        error!(error = %e, tmdb_id, "catalog lookup failed");
        AppError::MovieCreation(e)
    })?;
    let movie = state
        .movies
        .upsert(Movie::from_catalog(fetched))
        .await
        .map_err(AppError::MovieCreation)?;
    info!(tmdb_id, movie_id = %movie.id, "movie cached");
    Ok(movie)
}

pub async fn search(state: &AppState, query: &str) -> AppResult<Vec<CatalogMovie>> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::invalid("query", "must not be empty"));
    }
    let results = state.catalog.search(query).await.map_err(|e| {
        error!(error = %e, %query, "catalog search failed");
        AppError::Internal(e)
    })?;
    Ok(results)
}
