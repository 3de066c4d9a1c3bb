use tracing::info;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, FieldError},
    movies::services::ensure_movie,
    ratings::{
        dto::RateMovieRequest,
        repo_types::{MovieRating, RatingUpsert, MAX_RATING, MIN_RATING},
    },
    state::AppState,
};

const MAX_COMMENT_LEN: usize = 2000;

fn validate(req: &RateMovieRequest) -> AppResult<()> {
    let mut errors = Vec::new();
    if !(MIN_RATING..=MAX_RATING).contains(&req.rating) {
        errors.push(FieldError::new(
            "rating",
            format!("must be between {MIN_RATING} and {MAX_RATING}"),
        ));
    }
    if req.comment.as_ref().is_some_and(|c| c.chars().count() > MAX_COMMENT_LEN) {
        errors.push(FieldError::new(
            "comment",
            format!("must be at most {MAX_COMMENT_LEN} characters"),
        ));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

pub async fn rate_movie(
    state: &AppState,
    user_id: Uuid,
    req: RateMovieRequest,
) -> AppResult<MovieRating> {
    validate(&req)?;
    let movie = ensure_movie(state, req.tmdb_id).await?;
    let rating = state
        .ratings
        .upsert(RatingUpsert {
            user_id,
            movie_id: movie.id,
            tmdb_id: movie.tmdb_id,
            rating: req.rating,
            comment: req
                .comment
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
        })
        .await?;
    info!(%user_id, tmdb_id = movie.tmdb_id, rating = rating.rating, "rating upserted");
    Ok(rating)
}

pub async fn rating_for_movie(
    state: &AppState,
    user_id: Uuid,
    tmdb_id: i64,
) -> AppResult<MovieRating> {
    let movie = state
        .movies
        .find_by_tmdb_id(tmdb_id)
        .await?
        .ok_or(AppError::NotFound)?;
    state
        .ratings
        .find_for_user_movie(user_id, movie.id)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn list_ratings(state: &AppState, user_id: Uuid) -> AppResult<Vec<MovieRating>> {
    Ok(state.ratings.list_for_user(user_id).await?)
}
