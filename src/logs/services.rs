use std::collections::{HashMap, HashSet};

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    logs::{
        dto::{CreateLogRequest, LogListQuery, LogView, UpdateLogRequest},
        repo_types::{day_start, Log, LogChanges, LogFilter, LogSort, NewLog},
    },
    movies::services::ensure_movie,
    state::AppState,
};

const MAX_NOTES_LEN: usize = 2000;

fn clean_notes(notes: Option<String>) -> AppResult<Option<String>> {
    let notes = notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
        return Err(AppError::invalid(
            "notes",
            format!("must be at most {MAX_NOTES_LEN} characters"),
        ));
    }
    Ok(notes)
}

pub async fn create_log(
    state: &AppState,
    user_id: Uuid,
    req: CreateLogRequest,
) -> AppResult<LogView> {
    let notes = clean_notes(req.notes)?;
    state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let movie = ensure_movie(state, req.tmdb_id).await?;

    let log = state
        .logs
        .create(NewLog {
            user_id,
            movie_id: movie.id,
            tmdb_id: movie.tmdb_id,
            date_watched: day_start(req.date_watched),
            notes,
            watched_where: req.watched_where,
        })
        .await?;
    info!(%user_id, log_id = %log.id, tmdb_id = log.tmdb_id, "log created");

    let rating = state.ratings.find_for_user_movie(user_id, movie.id).await?;
    Ok(LogView::new(log, Some(movie), rating))
}

pub async fn get_log(state: &AppState, user_id: Uuid, log_id: Uuid) -> AppResult<LogView> {
    let log = state
        .logs
        .find_by_id_for_owner(log_id, user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let mut rows = join_logs(state, user_id, vec![log]).await?;
    rows.pop().ok_or(AppError::NotFound)
}

pub async fn update_log(
    state: &AppState,
    user_id: Uuid,
    log_id: Uuid,
    req: UpdateLogRequest,
) -> AppResult<LogView> {
    let changes = LogChanges {
        date_watched: req.date_watched.map(day_start),
        notes: match req.notes {
            Some(n) => Some(clean_notes(Some(n))?),
            None => None,
        },
        watched_where: req.watched_where,
    };
    let log = state
        .logs
        .update(log_id, user_id, changes)
        .await?
        .ok_or_else(|| {
            warn!(%user_id, %log_id, "update on missing or foreign log");
            AppError::NotFound
        })?;
    info!(%user_id, %log_id, "log updated");
    let mut rows = join_logs(state, user_id, vec![log]).await?;
    rows.pop().ok_or(AppError::NotFound)
}

pub async fn delete_log(state: &AppState, user_id: Uuid, log_id: Uuid) -> AppResult<()> {
    if !state.logs.soft_delete(log_id, user_id).await? {
        return Err(AppError::NotFound);
    }
    info!(%user_id, %log_id, "log deleted");
    Ok(())
}

pub fn filter_and_sort(query: &LogListQuery) -> AppResult<(LogFilter, LogSort)> {
    if let (Some(from), Some(to)) = (query.date_watched_from, query.date_watched_to) {
        if from > to {
            return Err(AppError::invalid(
                "dateWatchedFrom",
                "must not be after dateWatchedTo",
            ));
        }
    }
    let mut filter = LogFilter::between_days(query.date_watched_from, query.date_watched_to);
    filter.watched_where = query.watched_where;
    let sort = LogSort {
        by: query.sort_by.unwrap_or_default(),
        order: query.sort_order.unwrap_or_default(),
    };
    Ok((filter, sort))
}

pub async fn list_logs(
    state: &AppState,
    user_id: Uuid,
    query: &LogListQuery,
) -> AppResult<Vec<LogView>> {
    let (filter, sort) = filter_and_sort(query)?;
    list_joined(state, user_id, &filter, sort).await
}

pub async fn list_joined(
    state: &AppState,
    user_id: Uuid,
    filter: &LogFilter,
    sort: LogSort,
) -> AppResult<Vec<LogView>> {
    let logs = state.logs.list_for_user(user_id, filter, sort).await?;
    join_logs(state, user_id, logs).await
}

/// Attaches movie and the owner's rating to each log, keeping input order.
pub async fn join_logs(state: &AppState, user_id: Uuid, logs: Vec<Log>) -> AppResult<Vec<LogView>> {
    if logs.is_empty() {
        return Ok(Vec::new());
    }
    let mut seen = HashSet::new();
    let movie_ids: Vec<Uuid> = logs
        .iter()
        .map(|l| l.movie_id)
        .filter(|id| seen.insert(*id))
        .collect();

    let movies: HashMap<Uuid, _> = state
        .movies
        .find_by_ids(&movie_ids)
        .await?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();
    let ratings: HashMap<Uuid, _> = state
        .ratings
        .find_for_user_movies(user_id, &movie_ids)
        .await?
        .into_iter()
        .map(|r| (r.movie_id, r))
        .collect();

    Ok(logs
        .into_iter()
        .map(|log| {
            let movie = movies.get(&log.movie_id).cloned();
            let rating = ratings.get(&log.movie_id).cloned();
            LogView::new(log, movie, rating)
        })
        .collect())
}
